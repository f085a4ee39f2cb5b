//! Spreadsheet formula grammar: tokenizer, parser and expression tree.

pub mod address;
pub mod functions;
pub mod parser;
pub mod tokenizer;

pub use functions::Function;
pub use parser::{BinaryOperator, Expr, ParseError, UnaryOperator};
pub use tokenizer::{Token, TokenizeError};

use crate::types::CellId;

/// Tokenize and parse formula text owned by `sheet`.
pub fn parse_formula(text: &str, sheet: &str) -> Result<Expr, ParseError> {
    let tokens =
        tokenizer::tokenize(text).map_err(|e| ParseError::new(e.message, e.position))?;
    parser::parse(tokens, sheet)
}

/// Cells covered by a normalized range, in row-major order.
pub fn expand_range(start: &CellId, end: &CellId) -> Vec<CellId> {
    let mut cells = Vec::new();
    for row in start.row..=end.row {
        for col in start.col..=end.col {
            cells.push(CellId::new(start.sheet.clone(), row, col));
        }
    }
    cells
}

impl Expr {
    /// Every cell this expression reads, ranges expanded row-major.
    ///
    /// May contain duplicates; callers that need a set deduplicate.
    pub fn references(&self) -> Vec<CellId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<CellId>) {
        match self {
            Expr::Literal(_) => {}
            Expr::CellReference(id) => out.push(id.clone()),
            Expr::RangeReference { start, end } => out.extend(expand_range(start, end)),
            Expr::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_references(out),
            Expr::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_references(out);
                }
            }
        }
    }
}
