use thiserror::Error;

use crate::types::CellId;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Unreadable workbook: {0}")]
    UnreadableWorkbook(String),

    #[error("Cannot parse formula in {cell}: '{text}' ({message})")]
    UnparsableFormula {
        cell: CellId,
        text: String,
        message: String,
    },

    #[error("Circular dependency detected: {}", format_chain(.chain))]
    CyclicDependency { chain: Vec<CellId> },

    #[error("Unsupported function {function} in {cell}")]
    UnsupportedFunction { function: String, cell: CellId },

    #[error("Division by zero in {cell}: both operands are constants")]
    DivisionByZero { cell: CellId },

    #[error("No valid name candidates for {raw}")]
    NoValidNameCandidates { raw: String },

    #[error("Identifier {raw} has no entry in the name mapping")]
    UnmappedIdentifier { raw: String },

    #[error("Invalid arguments in {cell}: {message}")]
    InvalidArguments { cell: CellId, message: String },

    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("Evaluation error in {cell}: {message}")]
    Evaluation { cell: CellId, message: String },

    #[error("Invalid option: {0}")]
    Config(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render a cycle as `A1 → B1 → A1`.
///
/// The chain is stored open (`[A1, B1]`); the first cell is repeated at the end.
pub fn format_chain(chain: &[CellId]) -> String {
    let mut parts: Vec<String> = chain.iter().map(ToString::to_string).collect();
    if let Some(first) = chain.first() {
        parts.push(first.to_string());
    }
    parts.join(" → ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_chain() {
        let err = CompileError::CyclicDependency {
            chain: vec![CellId::new("Sheet1", 0, 0), CellId::new("Sheet1", 0, 1)],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: Sheet1!A1 → Sheet1!B1 → Sheet1!A1"
        );
    }

    #[test]
    fn test_self_reference_message() {
        let err = CompileError::CyclicDependency {
            chain: vec![CellId::new("Sheet1", 0, 0)],
        };
        assert!(err.to_string().contains("Sheet1!A1 → Sheet1!A1"));
    }

    #[test]
    fn test_unsupported_function_names_function_and_cell() {
        let err = CompileError::UnsupportedFunction {
            function: "XIRR".to_string(),
            cell: CellId::new("Data", 4, 2),
        };
        let msg = err.to_string();
        assert!(msg.contains("XIRR"));
        assert!(msg.contains("Data!C5"));
    }
}
