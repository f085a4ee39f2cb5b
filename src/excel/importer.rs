//! Excel importer - Excel (.xlsx) → Cell set

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{CompileError, CompileResult};
use crate::excel::labels::{assign_labels, MergedRegions};
use crate::formula::parse_formula;
use crate::types::{Cell, CellId, Literal, Workbook};

/// Reads every sheet of an .xlsx workbook into a [`Workbook`] cell set.
pub struct ExcelImporter {
    path: PathBuf,
}

impl ExcelImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Import the workbook at the configured path.
    pub fn import(&self) -> CompileResult<Workbook> {
        let mut xlsx: Xlsx<_> = open_workbook(&self.path).map_err(|e| {
            CompileError::UnreadableWorkbook(format!("{}: {}", self.path.display(), e))
        })?;
        let name = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Workbook".to_string());
        read_workbook(name, &mut xlsx)
    }

    /// Import an in-memory workbook (e.g. an uploaded file).
    pub fn import_bytes(name: impl Into<String>, bytes: Vec<u8>) -> CompileResult<Workbook> {
        let mut xlsx = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| CompileError::UnreadableWorkbook(e.to_string()))?;
        read_workbook(name.into(), &mut xlsx)
    }
}

fn read_workbook<RS: Read + Seek>(name: String, xlsx: &mut Xlsx<RS>) -> CompileResult<Workbook> {
    let mut workbook = Workbook::new(name);
    let mut merges = MergedRegions::new();

    for sheet_name in xlsx.sheet_names() {
        let values = xlsx.worksheet_range(&sheet_name).map_err(|e| {
            CompileError::UnreadableWorkbook(format!("sheet '{}': {}", sheet_name, e))
        })?;
        // Sheets without any formula report an error here on some files.
        let formulas = xlsx.worksheet_formula(&sheet_name).ok();

        match xlsx.worksheet_merge_cells(&sheet_name) {
            Some(Ok(regions)) if !regions.is_empty() => {
                merges.insert(sheet_name.clone(), regions);
            }
            Some(Err(e)) => warn!(sheet = %sheet_name, error = %e, "ignoring unreadable merged cells"),
            _ => {}
        }

        workbook.add_sheet(sheet_name.clone());
        read_sheet(&sheet_name, &values, formulas.as_ref(), &mut workbook)?;
    }

    assign_labels(&mut workbook, &merges);
    debug!(
        sheets = workbook.sheets.len(),
        cells = workbook.cells.len(),
        formulas = workbook.formula_count(),
        "workbook read"
    );
    Ok(workbook)
}

fn read_sheet(
    sheet: &str,
    values: &Range<Data>,
    formulas: Option<&Range<String>>,
    workbook: &mut Workbook,
) -> CompileResult<()> {
    // Ranges carry their own origin; convert everything to absolute positions.
    let mut cached: BTreeMap<(u32, u32), &Data> = BTreeMap::new();
    if let Some((row0, col0)) = values.start() {
        for (r, c, data) in values.used_cells() {
            cached.insert((row0 + r as u32, col0 + c as u32), data);
        }
    }

    let mut formula_text: BTreeMap<(u32, u32), &str> = BTreeMap::new();
    if let Some(formulas) = formulas {
        if let Some((row0, col0)) = formulas.start() {
            for (r, c, text) in formulas.used_cells() {
                if !text.trim().is_empty() {
                    formula_text.insert((row0 + r as u32, col0 + c as u32), text.as_str());
                }
            }
        }
    }

    for (&(row, col), &text) in &formula_text {
        let id = CellId::new(sheet, row, col);
        let expr = parse_formula(text, sheet).map_err(|e| CompileError::UnparsableFormula {
            cell: id.clone(),
            text: text.to_string(),
            message: e.message,
        })?;
        let mut cell = Cell::formula(format!("={}", text.trim_start_matches('=')), expr);
        cell.cached = cached.get(&(row, col)).and_then(|d| to_literal(d));
        workbook.insert(id, cell);
    }

    for (&(row, col), data) in &cached {
        if formula_text.contains_key(&(row, col)) {
            continue;
        }
        let id = CellId::new(sheet, row, col);
        match to_literal(data) {
            Some(literal) => workbook.insert(id, Cell::value(literal)),
            None => warn!(cell = %id, value = ?data, "skipping cell with unsupported literal"),
        }
    }

    Ok(())
}

/// Convert a calamine value to a literal; `None` for empty and error cells.
fn to_literal(data: &Data) -> Option<Literal> {
    match data {
        Data::Int(i) => Some(Literal::Integer(*i)),
        Data::Float(f) => Some(Literal::Number(*f)),
        Data::String(s) => Some(Literal::Text(s.clone())),
        Data::Bool(b) => Some(Literal::Boolean(*b)),
        Data::DateTime(dt) => Some(Literal::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Literal::Text(s.clone())),
        Data::Error(_) | Data::Empty => None,
    }
}
