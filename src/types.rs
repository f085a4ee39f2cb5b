use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::CompileError;
use crate::formula::address;
use crate::formula::Expr;

//==============================================================================
// Cell identity
//==============================================================================

/// Identity of a cell across all sheets of a workbook.
///
/// Rows and columns are 0-based. Ordering is `(sheet, row, col)`, which is the
/// deterministic tie-break used when resolving evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CellId {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
}

impl CellId {
    pub fn new(sheet: impl Into<String>, row: u32, col: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    /// Parse `Sheet1!B3`, `'My Sheet'!$B$3` or a bare `B3` resolved against `default_sheet`.
    pub fn parse(text: &str, default_sheet: &str) -> Result<Self, CompileError> {
        let (sheet, local) = match address::split_sheet(text) {
            Some((sheet, local)) => (sheet, local),
            None => (default_sheet.to_string(), text),
        };
        let (row, col) = address::parse_a1(local)
            .ok_or_else(|| CompileError::InvalidAddress(text.to_string()))?;
        Ok(Self::new(sheet, row, col))
    }

    /// `A1`-style address without the sheet.
    pub fn local_address(&self) -> String {
        format!("{}{}", address::column_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{}",
            address::quote_sheet(&self.sheet),
            self.local_address()
        )
    }
}

impl From<CellId> for String {
    fn from(id: CellId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for CellId {
    type Error = CompileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if address::split_sheet(&value).is_none() {
            return Err(CompileError::InvalidAddress(value));
        }
        CellId::parse(&value, "")
    }
}

//==============================================================================
// Literals and cells
//==============================================================================

/// A literal spreadsheet value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Literal {
    Integer(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl Literal {
    pub fn is_text(&self) -> bool {
        matches!(self, Literal::Text(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Text(s) => write!(f, "\"{s}\""),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// What a cell holds: exactly one of a literal or a parsed formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellContent {
    Value(Literal),
    Formula { text: String, expr: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub content: CellContent,
    /// Human-readable annotation taken from adjacent header text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Value last computed by the spreadsheet application, if stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<Literal>,
}

impl Cell {
    pub fn value(literal: Literal) -> Self {
        Self {
            content: CellContent::Value(literal),
            label: None,
            cached: None,
        }
    }

    pub fn formula(text: impl Into<String>, expr: Expr) -> Self {
        Self {
            content: CellContent::Formula {
                text: text.into(),
                expr,
            },
            label: None,
            cached: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn expr(&self) -> Option<&Expr> {
        match &self.content {
            CellContent::Formula { expr, .. } => Some(expr),
            CellContent::Value(_) => None,
        }
    }

    pub fn literal(&self) -> Option<&Literal> {
        match &self.content {
            CellContent::Value(lit) => Some(lit),
            CellContent::Formula { .. } => None,
        }
    }

    pub fn is_formula(&self) -> bool {
        self.expr().is_some()
    }
}

//==============================================================================
// Workbook (the Cell set)
//==============================================================================

/// The complete Cell set of one workbook, as produced by the reader.
///
/// Serializes losslessly to YAML/JSON; this is the intermediate representation
/// persisted between extraction and compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    /// Source name (file stem); used to derive the default class name.
    pub name: String,
    /// Sheet names in workbook order.
    pub sheets: Vec<String>,
    pub cells: BTreeMap<CellId, Cell>,
}

impl Workbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_sheet(&mut self, sheet: impl Into<String>) {
        let sheet = sheet.into();
        if !self.sheets.contains(&sheet) {
            self.sheets.push(sheet);
        }
    }

    pub fn insert(&mut self, id: CellId, cell: Cell) {
        self.add_sheet(id.sheet.clone());
        self.cells.insert(id, cell);
    }

    pub fn get(&self, id: &CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn formula_count(&self) -> usize {
        self.cells.values().filter(|c| c.is_formula()).count()
    }

    /// Load a previously extracted IR document.
    pub fn from_yaml(text: &str) -> Result<Self, CompileError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, CompileError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
