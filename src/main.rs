use cellforge::cli::{self, CompileArgs};
use cellforge::error::CompileResult;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cellforge")]
#[command(about = "Compile spreadsheet workbooks into C# classes.")]
#[command(long_about = "CellForge - Spreadsheet workbook to C# compiler

Reads every sheet of an .xlsx workbook, orders its formulas by dependency,
translates them into typed C# statements, names them after the labels found
next to each cell, and emits one self-contained class.

COMMANDS:
  compile   - Workbook to C# source
  extract   - Workbook to YAML cell set (editable, recompilable)
  eval      - Compute one cell's value
  audit     - Show a cell's dependency tree
  watch     - Recompile on file changes

EXAMPLES:
  cellforge compile pricing.xlsx                       # writes pricing.cs
  cellforge compile pricing.xlsx -o Pricing.cs --namespace Acme.Models
  cellforge compile pricing.xlsx --output-cell Summary!B7 --map names.json
  cellforge eval pricing.xlsx Summary!B7

Use --verbose (or RUST_LOG=cellforge=debug) for phase-level logging.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Compile a workbook into a C# class.

PHASES:
  1. Read every sheet (values, formulas, labels)
  2. Build the dependency graph and order formulas
  3. Translate each formula into a typed C# expression
  4. Rename raw identifiers (Sheet1_B3) to readable ones (unitPrice)
  5. Lay out the class: constants, inputs, formulas, accessors

The first failing phase aborts the run and nothing is written.

OPTIONS FILE (--config):
  class_name: PricingModel
  namespace: Acme.Models
  outputs: [\"Summary!B7\"]
  inline_values: false
  include_runtime: true")]
    /// Compile a workbook into a C# class
    Compile(CompileArgs),

    /// Extract the workbook's cell set to YAML
    Extract {
        /// Input Excel file (.xlsx)
        input: PathBuf,

        /// Output YAML file (default: input with .yaml extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show per-sheet details
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compute one cell's value
    Eval {
        /// Workbook (.xlsx or extracted .yaml)
        input: PathBuf,

        /// Cell address, e.g. Summary!B7 or B7 for the first sheet
        cell: String,
    },

    #[command(long_about = "Show where a cell's value comes from.

Prints the cell's formula, every cell it depends on (recursively), and the
computed value. When the workbook stores a value for the cell, the two are
compared.")]
    /// Show a cell's dependency tree
    Audit {
        /// Workbook (.xlsx or extracted .yaml)
        input: PathBuf,

        /// Cell address, e.g. Summary!B7
        cell: String,
    },

    /// Recompile whenever the workbook changes
    Watch(CompileArgs),
}

fn main() -> CompileResult<()> {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Compile(args) | Commands::Watch(args) => args.verbose,
        Commands::Extract { verbose, .. } => *verbose,
        _ => false,
    };
    let filter = if verbose {
        EnvFilter::new("cellforge=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile(args) => cli::compile(args),

        Commands::Extract {
            input,
            output,
            verbose,
        } => cli::extract(input, output, verbose),

        Commands::Eval { input, cell } => cli::eval(input, cell),

        Commands::Audit { input, cell } => cli::audit(input, cell),

        Commands::Watch(args) => cli::watch(args),
    }
}
