//! Raw identifier → readable identifier mapping.
//!
//! Naming is a pure function of the statement list: a label such as
//! `Revenue Q1` becomes `revenueQ1`, an unlabelled cell falls back to a name
//! built from its sheet and address (`sheet1_B3`), and collisions with
//! reserved words or earlier names get a numeric suffix. Applying the mapping
//! to code is a separate step.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::translator::Statement;
use crate::error::{CompileError, CompileResult};

/// Words the target language reserves, plus names the generated file itself uses.
pub const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while", "value", "var", "dynamic", "yield", "async", "await",
    "nameof", "record", "Math", "System", "XlRuntime",
];

/// Total, injective mapping from raw identifiers to final identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameMapping {
    names: BTreeMap<String, String>,
}

impl NameMapping {
    pub fn get(&self, raw: &str) -> Option<&str> {
        self.names.get(raw).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> CompileResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct Renamer {
    reserved: BTreeSet<String>,
    strip: Regex,
    split: Regex,
}

impl Renamer {
    /// `extra_reserved` is added to the language keywords (e.g. the class name).
    pub fn new<I, S>(extra_reserved: I) -> CompileResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut reserved: BTreeSet<String> =
            CSHARP_KEYWORDS.iter().map(|k| k.to_string()).collect();
        reserved.extend(extra_reserved.into_iter().map(Into::into));
        Ok(Self {
            reserved,
            strip: Regex::new(r"[^A-Za-z0-9 _]")?,
            split: Regex::new(r"[\s_]+")?,
        })
    }

    /// Assign a final name to every statement's raw identifier, in statement order.
    pub fn rename(&self, statements: &[Statement]) -> CompileResult<NameMapping> {
        let mut names = BTreeMap::new();
        let mut used: BTreeSet<String> = BTreeSet::new();
        // Enough room for every statement to collide with every other name.
        let limit = statements.len() + self.reserved.len() + 2;

        for statement in statements {
            if names.contains_key(&statement.raw) {
                continue;
            }
            let base = statement
                .label
                .as_deref()
                .map(|label| self.sanitize(label))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| {
                    self.fallback(&statement.cell.sheet, &statement.cell.local_address())
                });

            let name = (1..=limit)
                .map(|n| match n {
                    1 => base.clone(),
                    n => format!("{base}{n}"),
                })
                .find(|candidate| !used.contains(candidate) && !self.reserved.contains(candidate))
                .ok_or_else(|| CompileError::NoValidNameCandidates {
                    raw: statement.raw.clone(),
                })?;

            used.insert(name.clone());
            names.insert(statement.raw.clone(), name);
        }

        debug!(names = names.len(), "identifiers renamed");
        Ok(NameMapping { names })
    }

    /// camelCase identifier from free text: `Revenue Q1 (net)` → `revenueQ1Net`.
    pub fn sanitize(&self, text: &str) -> String {
        let cleaned = self.strip.replace_all(text, "");
        let mut out = String::new();
        for (i, word) in self
            .split
            .split(cleaned.trim())
            .filter(|w| !w.is_empty())
            .enumerate()
        {
            if i == 0 {
                out.push_str(&word.to_lowercase());
            } else {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(&chars.as_str().to_lowercase());
                }
            }
        }
        if out.starts_with(|c: char| c.is_ascii_digit()) {
            out.insert(0, '_');
        }
        out
    }

    /// Name for an unlabelled cell: `sheet1_B3`.
    fn fallback(&self, sheet: &str, address: &str) -> String {
        let sheet = self.sanitize(sheet);
        let sheet = if sheet.is_empty() { "sheet".to_string() } else { sheet };
        format!("{sheet}_{address}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::csharp::{CsExpr, ValueType};
    use crate::codegen::translator::StatementKind;
    use crate::types::{CellId, Literal};
    use pretty_assertions::assert_eq;

    fn statement(raw: &str, row: u32, label: Option<&str>) -> Statement {
        Statement {
            cell: CellId::new("Sheet1", row, 0),
            raw: raw.to_string(),
            label: label.map(str::to_string),
            ty: ValueType::Integer,
            expr: CsExpr::Literal(Literal::Integer(0)),
            kind: StatementKind::Input,
        }
    }

    #[test]
    fn test_sanitize_camel_case() {
        let renamer = Renamer::new(Vec::<String>::new()).unwrap();
        assert_eq!(renamer.sanitize("Revenue Q1"), "revenueQ1");
        assert_eq!(renamer.sanitize("  unit_price (EUR) "), "unitPriceEur");
        assert_eq!(renamer.sanitize("2024 total"), "_2024Total");
        assert_eq!(renamer.sanitize("€€"), "");
    }

    #[test]
    fn test_labels_collisions_and_fallback() {
        let renamer = Renamer::new(["Model"]).unwrap();
        let statements = vec![
            statement("Sheet1_A1", 0, Some("Total")),
            statement("Sheet1_A2", 1, Some("total")),
            statement("Sheet1_A3", 2, None),
            statement("Sheet1_A4", 3, Some("class")),
            statement("Sheet1_A5", 4, Some("!!!")),
        ];

        let mapping = renamer.rename(&statements).unwrap();

        assert_eq!(mapping.get("Sheet1_A1"), Some("total"));
        assert_eq!(mapping.get("Sheet1_A2"), Some("total2"));
        assert_eq!(mapping.get("Sheet1_A3"), Some("sheet1_A3"));
        assert_eq!(mapping.get("Sheet1_A4"), Some("class2"));
        assert_eq!(mapping.get("Sheet1_A5"), Some("sheet1_A5"));
    }

    #[test]
    fn test_mapping_is_injective_and_stable() {
        let renamer = Renamer::new(Vec::<String>::new()).unwrap();
        let statements: Vec<Statement> = (0..20)
            .map(|i| statement(&format!("Sheet1_A{}", i + 1), i, Some("Same")))
            .collect();

        let first = renamer.rename(&statements).unwrap();
        let second = renamer.rename(&statements).unwrap();

        assert_eq!(first, second);
        let finals: BTreeSet<&str> = first.iter().map(|(_, v)| v).collect();
        assert_eq!(finals.len(), 20);
    }

    #[test]
    fn test_mapping_json() {
        let renamer = Renamer::new(Vec::<String>::new()).unwrap();
        let mapping = renamer
            .rename(&[statement("Sheet1_A1", 0, Some("Price"))])
            .unwrap();
        let json = mapping.to_json().unwrap();
        assert!(json.contains("\"Sheet1_A1\": \"price\""));
    }
}
