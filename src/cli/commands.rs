use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::config::CompileOptions;
use crate::core::{DependencyGraph, Value};
use crate::error::{CompileError, CompileResult};
use crate::excel::ExcelImporter;
use crate::pipeline::{self, CompileOutput};
use crate::types::{CellContent, CellId, Workbook};

/// Arguments shared by `compile` and `watch`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CompileArgs {
    /// Workbook to compile (.xlsx, or an extracted .yaml)
    pub input: PathBuf,

    /// Where to write the C# source (default: input with .cs extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the raw → final identifier mapping as JSON
    #[arg(short, long)]
    pub map: Option<PathBuf>,

    /// YAML options file; command-line flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Name of the generated class (default: derived from the file name)
    #[arg(long)]
    pub class_name: Option<String>,

    /// Wrap the class in this namespace
    #[arg(long)]
    pub namespace: Option<String>,

    /// Cell to expose through an accessor, e.g. Summary!B7 (repeatable)
    #[arg(long = "output-cell", value_name = "CELL")]
    pub outputs: Vec<String>,

    /// Substitute value cells by their literals instead of fields
    #[arg(long)]
    pub inline_values: bool,

    /// Do not emit the XlRuntime support class
    #[arg(long)]
    pub no_runtime: bool,

    /// Evaluate this cell and print its value
    #[arg(long, value_name = "CELL")]
    pub cell: Option<String>,

    /// Show every compilation phase
    #[arg(short, long)]
    pub verbose: bool,
}

impl CompileArgs {
    /// Options file merged with command-line overrides.
    pub fn options(&self) -> CompileResult<CompileOptions> {
        let mut options = match &self.config {
            Some(path) => CompileOptions::from_file(path)?,
            None => CompileOptions::default(),
        };
        if self.class_name.is_some() {
            options.class_name = self.class_name.clone();
        }
        if self.namespace.is_some() {
            options.namespace = self.namespace.clone();
        }
        if !self.outputs.is_empty() {
            options.outputs = self.outputs.clone();
        }
        if self.inline_values {
            options.inline_values = true;
        }
        if self.no_runtime {
            options.include_runtime = false;
        }
        if self.cell.is_some() {
            options.cell = self.cell.clone();
        }
        Ok(options)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("cs"))
    }
}

/// Execute the compile command
pub fn compile(args: CompileArgs) -> CompileResult<()> {
    println!("{}", "🔥 CellForge - Compile".bold().green());
    println!("   Input:  {}", args.input.display());
    println!("   Output: {}\n", args.output_path().display());

    let output = compile_internal(&args, args.verbose)?;

    println!("{}", "✅ Compilation Complete!".bold().green());
    println!("   Class:      {}", output.class_name.bright_blue().bold());
    println!("   Formulas:   {}", output.order.len());
    println!("   Identifiers: {}", output.mapping.len());
    println!("   Accessors:  {}", output.outputs.len());
    if let Some(map) = &args.map {
        println!("   Mapping:    {}", map.display());
    }
    if let Some((cell, value)) = &output.evaluation {
        println!("   {} = {}", cell.to_string().cyan(), value.to_string().bold().green());
    }
    println!();

    Ok(())
}

/// Run every phase and write the artifacts. Nothing is written unless all phases succeed.
fn compile_internal(args: &CompileArgs, verbose: bool) -> CompileResult<CompileOutput> {
    let options = args.options()?;

    if verbose {
        println!("{}", "📖 Reading workbook...".cyan());
    }
    let workbook = pipeline::load_workbook(&args.input)?;
    if verbose {
        println!(
            "   {} sheets, {} cells, {} formulas\n",
            workbook.sheets.len(),
            workbook.cells.len(),
            workbook.formula_count()
        );
        println!("{}", "🧮 Compiling...".cyan());
    }

    let output = pipeline::compile(&workbook, &options)?;

    if verbose {
        println!("   Evaluation order:");
        for (i, id) in output.order.iter().enumerate() {
            println!("     {}. {}", i + 1, id);
        }
        println!();
        println!("{}", "🏷️  Identifiers:".cyan());
        for (raw, name) in output.mapping.iter() {
            println!("   {} → {}", raw, name.bright_blue());
        }
        println!();
    }

    fs::write(args.output_path(), &output.source)?;
    if let Some(map) = &args.map {
        fs::write(map, output.mapping.to_json()?)?;
    }

    Ok(output)
}

/// Execute the extract command: workbook → YAML cell set
pub fn extract(input: PathBuf, output: Option<PathBuf>, verbose: bool) -> CompileResult<()> {
    let output = output.unwrap_or_else(|| input.with_extension("yaml"));

    println!("{}", "🔥 CellForge - Extract".bold().green());
    println!("   Input:  {}", input.display());
    println!("   Output: {}\n", output.display());

    if verbose {
        println!("{}", "📖 Reading Excel file...".cyan());
    }
    let workbook = ExcelImporter::new(&input).import()?;

    if verbose {
        for sheet in &workbook.sheets {
            let cells = workbook.cells.keys().filter(|id| &id.sheet == sheet).count();
            println!("   {} ({} cells)", sheet.bright_blue(), cells);
        }
        println!();
    }

    fs::write(&output, workbook.to_yaml()?)?;

    println!("{}", "✅ Extraction Complete!".bold().green());
    println!("   Sheets:   {}", workbook.sheets.len());
    println!("   Cells:    {}", workbook.cells.len());
    println!("   Formulas: {}\n", workbook.formula_count());

    Ok(())
}

/// Execute the eval command: print one cell's computed value
pub fn eval(input: PathBuf, address: String) -> CompileResult<()> {
    let workbook = pipeline::load_workbook(&input)?;
    let (id, value) = pipeline::evaluate_address(&workbook, &address)?;
    println!("{} = {}", id.to_string().cyan(), value.to_string().bold().green());
    Ok(())
}

/// Execute the audit command: show a cell's dependency tree and check its cached value
pub fn audit(input: PathBuf, address: String) -> CompileResult<()> {
    println!("{}", "🔍 CellForge - Audit Trail".bold().green());
    println!("   File: {}", input.display());
    println!("   Cell: {}\n", address.bright_blue().bold());

    let workbook = pipeline::load_workbook(&input)?;
    let id = CellId::parse(&address, pipeline::default_sheet(&workbook))?;
    let cell = workbook.get(&id).ok_or_else(|| {
        CompileError::InvalidAddress(format!("{address} (no such cell in the workbook)"))
    })?;

    println!("{}", "📋 Cell Information:".bold().cyan());
    if let Some(label) = &cell.label {
        println!("   Label: {}", label.cyan());
    }
    match &cell.content {
        CellContent::Value(literal) => println!("   Value: {}", literal.to_string().bold()),
        CellContent::Formula { text, .. } => println!("   Formula: {}", text.bright_yellow()),
    }
    println!();

    if cell.is_formula() {
        println!("{}", "🌳 Dependency Tree:".bold().cyan());
        let graph = DependencyGraph::build(&workbook);
        let mut path = BTreeSet::from([id.clone()]);
        for dep in graph.dependencies(&id) {
            print_dependency(&workbook, &graph, &dep, 1, &mut path);
        }
        println!();
    }

    println!("{}", "🧮 Calculation:".bold().cyan());
    let (_, value) = pipeline::evaluate_address(&workbook, &address)?;
    println!("   Calculated: {}", value.to_string().bold().green());
    if let Some(cached) = &cell.cached {
        let cached = Value::from(cached);
        if same_value(&cached, &value) {
            println!("   {} Matches the value stored in the workbook", "✅".green());
        } else {
            println!("   {} Value mismatch!", "⚠️".yellow());
            println!("      Stored:     {}", cached.to_string().red());
            println!("      Calculated: {}", value.to_string().green());
        }
    }
    println!();

    Ok(())
}

fn print_dependency(
    workbook: &Workbook,
    graph: &DependencyGraph,
    id: &CellId,
    depth: usize,
    path: &mut BTreeSet<CellId>,
) {
    let indent = "   ".repeat(depth);
    let detail = match workbook.get(id).map(|c| &c.content) {
        Some(CellContent::Formula { text, .. }) => text.bright_yellow().to_string(),
        Some(CellContent::Value(literal)) => literal.to_string(),
        None => "(empty)".dimmed().to_string(),
    };
    let label = workbook
        .get(id)
        .and_then(|c| c.label.as_deref())
        .map(|l| format!(" [{l}]"))
        .unwrap_or_default();
    println!("{indent}└─ {}{} {}", id.to_string().cyan(), label, detail);

    if !path.insert(id.clone()) {
        println!("{indent}   {}", "↻ circular".red());
        return;
    }
    for dep in graph.dependencies(id) {
        print_dependency(workbook, graph, &dep, depth + 1, path);
    }
    path.remove(id);
}

fn same_value(stored: &Value, computed: &Value) -> bool {
    match (stored, computed) {
        (Value::Number(a), Value::Number(b)) => (a - b).abs() < 0.0001,
        _ => stored == computed,
    }
}

/// Execute the watch command: recompile whenever the workbook changes
pub fn watch(args: CompileArgs) -> CompileResult<()> {
    println!("{}", "👁️  CellForge - Watch Mode".bold().green());
    println!("   Input:  {}", args.input.display());
    println!("   Output: {}", args.output_path().display());
    println!("   {}\n", "Press Ctrl+C to stop".dimmed());

    if !args.input.exists() {
        return Err(CompileError::Watch(format!(
            "File not found: {}",
            args.input.display()
        )));
    }

    let path = fs::canonicalize(&args.input)
        .map_err(|e| CompileError::Watch(format!("Cannot resolve path: {e}")))?;
    let parent_dir = path
        .parent()
        .ok_or_else(|| CompileError::Watch("Cannot determine parent directory".to_string()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| CompileError::Watch("Cannot determine file name".to_string()))?
        .to_os_string();

    println!("{}", "🔄 Initial compile...".cyan());
    run_watch_action(&args);

    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(200), tx)
        .map_err(|e| CompileError::Watch(format!("Failed to create watcher: {e}")))?;
    debouncer
        .watcher()
        .watch(parent_dir, RecursiveMode::NonRecursive)
        .map_err(|e| CompileError::Watch(format!("Failed to watch directory: {e}")))?;

    println!("\n{}", "👀 Watching for changes...".cyan());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any && is_watched(&event.path, &file_name)
                });
                if relevant {
                    println!(
                        "\n{} {}",
                        format!("[{}]", chrono::Local::now().format("%H:%M:%S")).dimmed(),
                        "📝 Change detected, recompiling...".cyan()
                    );
                    run_watch_action(&args);
                }
            }
            Ok(Err(e)) => {
                eprintln!("{} Watch error: {}", "❌".red(), e);
            }
            Err(e) => {
                return Err(CompileError::Watch(format!("Channel error: {e}")));
            }
        }
    }
}

fn is_watched(path: &Path, file_name: &std::ffi::OsStr) -> bool {
    path.file_name() == Some(file_name)
}

fn run_watch_action(args: &CompileArgs) {
    match compile_internal(args, args.verbose) {
        Ok(output) => println!(
            "{} {} written ({} formulas)",
            "✅".green(),
            output.class_name.bold(),
            output.order.len()
        ),
        Err(e) => println!("{} {}", "❌".red(), e.to_string().red()),
    }
}
