//! End-to-end compilation: workbook → ordered statements → named class.
//!
//! Phases run strictly in sequence and the first failure aborts the run;
//! nothing is produced for a workbook that fails any phase.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::codegen::renamer::CSHARP_KEYWORDS;
use crate::codegen::structurer::pascal_case;
use crate::codegen::{ClassLayout, NameMapping, Renamer, Structurer, Translator};
use crate::config::CompileOptions;
use crate::core::{resolve_order, DependencyGraph, Evaluator, Value};
use crate::error::{CompileError, CompileResult};
use crate::excel::ExcelImporter;
use crate::types::{CellId, Workbook};

/// Everything a successful compilation produces.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// Complete C# source file.
    pub source: String,
    pub mapping: NameMapping,
    pub class_name: String,
    /// Formula cells in evaluation order.
    pub order: Vec<CellId>,
    /// Cells exposed through accessors.
    pub outputs: Vec<CellId>,
    /// Result of the optional ad-hoc evaluation.
    pub evaluation: Option<(CellId, Value)>,
}

/// Read a workbook from `.xlsx` or from a previously extracted `.yaml`/`.yml` IR.
pub fn load_workbook(path: &Path) -> CompileResult<Workbook> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "yaml" | "yml" => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CompileError::UnreadableWorkbook(format!("{}: {}", path.display(), e))
            })?;
            Workbook::from_yaml(&content)
        }
        _ => ExcelImporter::new(path).import(),
    }
}

/// Compile a workbook into a C# source file.
pub fn compile(workbook: &Workbook, options: &CompileOptions) -> CompileResult<CompileOutput> {
    let class_name = class_name(workbook, options)?;
    validate_namespace(options.namespace.as_deref())?;

    // Phase 1: dependencies and evaluation order
    let graph = DependencyGraph::build(workbook);
    let order = resolve_order(&graph)?;

    // Phase 2: statements with raw identifiers
    let translation = Translator::new(workbook, options.inline_values).translate(&order)?;

    // Phase 3: naming
    let renamer = Renamer::new([class_name.clone()])?;
    let mapping = renamer.rename(&translation.statements)?;

    // Phase 4: class layout
    let outputs = resolve_outputs(workbook, &graph, &order, options)?;
    let layout = ClassLayout {
        class_name: class_name.clone(),
        namespace: options.namespace.clone(),
        source: workbook.name.clone(),
        include_runtime: options.include_runtime,
    };
    let output_set: BTreeSet<CellId> = outputs.iter().cloned().collect();
    let source = Structurer::new(layout).structure(&translation.statements, &mapping, &output_set)?;

    let evaluation = match &options.cell {
        Some(address) => Some(evaluate_address(workbook, address)?),
        None => None,
    };

    info!(
        class = %class_name,
        statements = translation.statements.len(),
        outputs = outputs.len(),
        "workbook compiled"
    );

    Ok(CompileOutput {
        source,
        mapping,
        class_name,
        order,
        outputs,
        evaluation,
    })
}

/// Evaluate one cell, given as `Sheet!A1` or a bare `A1` on the first sheet.
pub fn evaluate_address(workbook: &Workbook, address: &str) -> CompileResult<(CellId, Value)> {
    let id = CellId::parse(address, default_sheet(workbook))?;
    let value = Evaluator::new(workbook).evaluate(&id)?;
    info!(cell = %id, value = %value, "cell evaluated");
    Ok((id, value))
}

/// Sheet that bare `A1` addresses refer to.
pub fn default_sheet(workbook: &Workbook) -> &str {
    workbook.sheets.first().map(String::as_str).unwrap_or("Sheet1")
}

/// Designated outputs, or every formula cell no other formula reads.
fn resolve_outputs(
    workbook: &Workbook,
    graph: &DependencyGraph,
    order: &[CellId],
    options: &CompileOptions,
) -> CompileResult<Vec<CellId>> {
    if options.outputs.is_empty() {
        let sinks: Vec<CellId> = order
            .iter()
            .filter(|id| graph.dependents(id).is_empty())
            .cloned()
            .collect();
        debug!(outputs = sinks.len(), "outputs defaulted to unreferenced formulas");
        return Ok(sinks);
    }

    let mut outputs = Vec::new();
    for address in &options.outputs {
        let id = CellId::parse(address, default_sheet(workbook))?;
        if workbook.get(&id).is_none() {
            return Err(CompileError::InvalidAddress(format!(
                "{address} (no such cell in the workbook)"
            )));
        }
        if !outputs.contains(&id) {
            outputs.push(id);
        }
    }
    Ok(outputs)
}

fn class_name(workbook: &Workbook, options: &CompileOptions) -> CompileResult<String> {
    let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")?;

    let name = match &options.class_name {
        Some(name) => name.clone(),
        None => {
            let base = pascal_case(&Renamer::new(Vec::<String>::new())?.sanitize(&workbook.name));
            if base.is_empty() {
                "WorkbookModel".to_string()
            } else {
                format!("{base}Model")
            }
        }
    };

    if !identifier.is_match(&name) || CSHARP_KEYWORDS.contains(&name.as_str()) {
        return Err(CompileError::Config(format!(
            "'{name}' is not a valid class name"
        )));
    }
    Ok(name)
}

/// `Acme.Models`: dot-separated identifiers, none of them a keyword.
fn validate_namespace(namespace: Option<&str>) -> CompileResult<()> {
    let Some(namespace) = namespace else {
        return Ok(());
    };
    let dotted = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")?;
    if !dotted.is_match(namespace)
        || namespace
            .split('.')
            .any(|part| CSHARP_KEYWORDS.contains(&part))
    {
        return Err(CompileError::Config(format!(
            "'{namespace}' is not a valid namespace"
        )));
    }
    Ok(())
}
