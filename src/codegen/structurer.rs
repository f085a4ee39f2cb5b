//! Class layout for the generated source file.
//!
//! ```text
//! constants    value cells no formula reads       private const
//! inputs       value cells formulas read          readonly field + optional ctor parameter
//! formulas     every formula cell, in order       readonly field assigned in the ctor
//! outputs      designated cells                   public accessor method
//! ```
//!
//! A formula that can raise a spreadsheet error is held in an `XlValue<T>`,
//! and readers go through `.Value`, so the error surfaces where the cell is
//! read (inside an `IfError` lambda, or an accessor) instead of in the ctor.
//!
//! The name mapping is applied here, before any text is produced: a raw
//! identifier without a mapping entry aborts generation.

use std::collections::BTreeSet;

use super::csharp::CsExpr;
use super::renamer::NameMapping;
use super::runtime::{RUNTIME_SOURCE, USINGS};
use super::translator::{Statement, StatementKind};
use crate::error::{CompileError, CompileResult};
use crate::types::CellId;

/// Settings for the emitted class.
#[derive(Debug, Clone)]
pub struct ClassLayout {
    pub class_name: String,
    pub namespace: Option<String>,
    /// Source workbook name, for the file header.
    pub source: String,
    pub include_runtime: bool,
}

/// A statement after renaming.
struct Declaration<'s> {
    statement: &'s Statement,
    name: String,
    expr: CsExpr,
    /// Held in an `XlValue<T>` and read through `.Value`.
    deferred: bool,
}

impl Declaration<'_> {
    fn comment(&self) -> String {
        let mut comment = format!("// {}", self.statement.cell);
        if let Some(label) = &self.statement.label {
            comment.push_str(&format!(" ({})", single_line(label)));
        }
        comment
    }

    fn cs_type(&self) -> &'static str {
        self.statement.ty.cs_name()
    }

    fn field_type(&self) -> String {
        if self.deferred {
            format!("XlValue<{}>", self.cs_type())
        } else {
            self.cs_type().to_string()
        }
    }

    fn read(&self) -> String {
        if self.deferred {
            format!("{}.Value", self.name)
        } else {
            self.name.clone()
        }
    }
}

pub struct Structurer {
    layout: ClassLayout,
}

impl Structurer {
    pub fn new(layout: ClassLayout) -> Self {
        Self { layout }
    }

    /// Render the complete source file.
    pub fn structure(
        &self,
        statements: &[Statement],
        mapping: &NameMapping,
        outputs: &BTreeSet<CellId>,
    ) -> CompileResult<String> {
        let mut deferred = BTreeSet::new();
        for statement in statements {
            if statement.kind == StatementKind::Formula && statement.expr.may_raise(&deferred) {
                deferred.insert(statement.raw.clone());
            }
        }
        let read_as = |raw: &str| {
            mapping.get(raw).map(|name| {
                if deferred.contains(raw) {
                    format!("{name}.Value")
                } else {
                    name.to_string()
                }
            })
        };

        let declarations = statements
            .iter()
            .map(|statement| {
                let name = mapping
                    .get(&statement.raw)
                    .ok_or_else(|| CompileError::UnmappedIdentifier {
                        raw: statement.raw.clone(),
                    })?
                    .to_string();
                let expr = statement.expr.rename(&read_as)?;
                Ok(Declaration {
                    statement,
                    name,
                    expr,
                    deferred: deferred.contains(&statement.raw),
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let read: BTreeSet<String> = statements
            .iter()
            .filter(|s| s.kind == StatementKind::Formula)
            .flat_map(|s| s.expr.identifiers())
            .collect();

        let (inputs, constants): (Vec<&Declaration>, Vec<&Declaration>) = declarations
            .iter()
            .filter(|d| d.statement.kind == StatementKind::Input)
            .partition(|d| read.contains(&d.statement.raw));
        let formulas: Vec<&Declaration> = declarations
            .iter()
            .filter(|d| d.statement.kind == StatementKind::Formula)
            .collect();

        let mut w = CodeWriter::default();
        w.line("// <auto-generated>");
        w.line(&format!(
            "//     Generated by cellforge from workbook \"{}\".",
            single_line(&self.layout.source)
        ));
        w.line("// </auto-generated>");
        for using in USINGS {
            w.line(&format!("using {using};"));
        }
        w.blank();

        if let Some(namespace) = &self.layout.namespace {
            w.line(&format!("namespace {namespace}"));
            w.open();
        }

        let class = &self.layout.class_name;
        w.line(&format!(
            "/// <summary>Computed model of workbook \"{}\".</summary>",
            xml_escape(&single_line(&self.layout.source))
        ));
        w.line(&format!("public sealed class {class}"));
        w.open();

        for d in &constants {
            w.line(&d.comment());
            w.line(&format!(
                "private const {} {} = {};",
                d.cs_type(),
                d.name,
                d.expr.render()
            ));
            w.blank();
        }
        for d in inputs.iter().chain(formulas.iter()) {
            w.line(&d.comment());
            w.line(&format!("private readonly {} {};", d.field_type(), d.name));
            w.blank();
        }

        self.constructor(&mut w, &inputs, &formulas);

        let mut accessors = BTreeSet::new();
        for d in declarations.iter().filter(|d| outputs.contains(&d.statement.cell)) {
            let base = format!("Get{}", pascal_case(&d.name));
            let mut accessor = base.clone();
            let mut n = 2;
            while !accessors.insert(accessor.clone()) {
                accessor = format!("{base}{n}");
                n += 1;
            }
            w.blank();
            w.line(&d.comment());
            w.line(&format!(
                "public {} {accessor}() => {};",
                d.cs_type(),
                d.read()
            ));
        }

        w.close();

        if self.layout.include_runtime {
            w.blank();
            for line in RUNTIME_SOURCE.lines() {
                w.line(line);
            }
        }

        if self.layout.namespace.is_some() {
            w.close();
        }

        Ok(w.finish())
    }

    fn constructor(&self, w: &mut CodeWriter, inputs: &[&Declaration], formulas: &[&Declaration]) {
        let class = &self.layout.class_name;
        if inputs.is_empty() {
            w.line(&format!("public {class}()"));
        } else {
            w.line(&format!("public {class}("));
            w.indent += 1;
            for (i, d) in inputs.iter().enumerate() {
                let end = if i + 1 == inputs.len() { ")" } else { "," };
                w.line(&format!(
                    "{} {} = {}{end}",
                    d.cs_type(),
                    d.name,
                    d.expr.render()
                ));
            }
            w.indent -= 1;
        }
        w.open();
        for d in inputs {
            w.line(&format!("this.{0} = {0};", d.name));
        }
        for (i, d) in formulas.iter().enumerate() {
            if i > 0 || !inputs.is_empty() {
                w.blank();
            }
            w.line(&d.comment());
            if d.deferred {
                w.line(&format!(
                    "{} = new {}(() => {});",
                    d.name,
                    d.field_type(),
                    d.expr.render()
                ));
            } else {
                w.line(&format!("{} = {};", d.name, d.expr.render()));
            }
        }
        w.close();
    }
}

/// Line-oriented writer with four-space indentation.
#[derive(Default)]
struct CodeWriter {
    out: String,
    indent: usize,
}

impl CodeWriter {
    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    fn close(&mut self) {
        // Drop a trailing blank line before the brace.
        if self.out.ends_with("\n\n") {
            self.out.pop();
        }
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}

/// `revenueQ1` → `RevenueQ1`.
pub fn pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
