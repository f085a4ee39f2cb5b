//! Compile options, optionally loaded from a YAML file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CompileResult;

/// Options controlling the generated class.
///
/// Every field has a default, so a partial YAML file such as
///
/// ```yaml
/// class_name: PricingModel
/// outputs: ["Summary!B7"]
/// ```
///
/// is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Class name; derived from the workbook name when absent.
    pub class_name: Option<String>,
    pub namespace: Option<String>,
    /// Cells exposed through accessors (`Sheet!A1`). Empty means every formula
    /// cell that no other formula reads.
    pub outputs: Vec<String>,
    /// Replace references to value cells by their literals.
    pub inline_values: bool,
    /// Emit the `XlRuntime` support class into the same file.
    pub include_runtime: bool,
    /// Cell to evaluate and log alongside compilation.
    pub cell: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            class_name: None,
            namespace: None,
            outputs: Vec::new(),
            inline_values: false,
            include_runtime: true,
            cell: None,
        }
    }
}

impl CompileOptions {
    pub fn from_yaml(text: &str) -> CompileResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> CompileResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let options = CompileOptions::from_yaml("class_name: Pricing\noutputs: [\"Sheet1!B2\"]\n")
            .unwrap();
        assert_eq!(options.class_name.as_deref(), Some("Pricing"));
        assert_eq!(options.outputs, vec!["Sheet1!B2".to_string()]);
        assert!(options.include_runtime);
        assert!(!options.inline_values);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(CompileOptions::from_yaml("clas_name: Typo\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cellforge.yaml");
        std::fs::write(&path, "inline_values: true\nnamespace: Acme\n").unwrap();

        let options = CompileOptions::from_file(&path).unwrap();

        assert!(options.inline_values);
        assert_eq!(options.namespace.as_deref(), Some("Acme"));
    }
}
