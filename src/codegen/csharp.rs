//! C# expression tree and its rendering.
//!
//! Statements are built as [`CsExpr`] trees whose identifiers are still raw
//! cell names; the renaming phase rewrites them through a total mapping before
//! anything is rendered to text.

use std::collections::BTreeSet;

use super::runtime::RAISING_HELPERS;
use crate::error::{CompileError, CompileResult};
use crate::types::Literal;

/// Static type of a generated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Number,
    Text,
    Boolean,
}

impl ValueType {
    pub fn of(literal: &Literal) -> Self {
        match literal {
            Literal::Integer(_) => Self::Integer,
            Literal::Number(_) => Self::Number,
            Literal::Text(_) => Self::Text,
            Literal::Boolean(_) => Self::Boolean,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }

    /// C# keyword for the type.
    pub fn cs_name(self) -> &'static str {
        match self {
            Self::Integer => "long",
            Self::Number => "double",
            Self::Text => "string",
            Self::Boolean => "bool",
        }
    }

    /// Common type two branches can both be converted to.
    pub fn unify(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (a, b) if a.is_numeric() && b.is_numeric() => Self::Number,
            (Self::Text, _) | (_, Self::Text) => Self::Text,
            _ => Self::Number,
        }
    }

    /// Zero value used for blank cells inside typed arrays.
    pub fn default_literal(self) -> Literal {
        match self {
            Self::Integer => Literal::Integer(0),
            Self::Number => Literal::Number(0.0),
            Self::Text => Literal::Text(String::new()),
            Self::Boolean => Literal::Boolean(false),
        }
    }
}

/// Element type of an array literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayType {
    Of(ValueType),
    Object,
}

impl ArrayType {
    fn cs_name(self) -> &'static str {
        match self {
            Self::Of(ty) => ty.cs_name(),
            Self::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CsExpr {
    Literal(Literal),
    Null,
    /// Reference to a declared cell (raw name until renamed).
    Ident(String),
    Cast(ValueType, Box<CsExpr>),
    Unary(&'static str, Box<CsExpr>),
    Binary {
        op: &'static str,
        left: Box<CsExpr>,
        right: Box<CsExpr>,
    },
    Conditional {
        condition: Box<CsExpr>,
        then: Box<CsExpr>,
        otherwise: Box<CsExpr>,
    },
    /// Static call such as `XlRuntime.Sum` or `Math.Abs`.
    Call { target: String, args: Vec<CsExpr> },
    Array { element: ArrayType, items: Vec<CsExpr> },
    /// Deferred evaluation: `() => expr`.
    Lambda(Box<CsExpr>),
}

impl CsExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    pub fn call(target: impl Into<String>, args: Vec<CsExpr>) -> Self {
        Self::Call {
            target: target.into(),
            args,
        }
    }

    pub fn runtime(method: &str, args: Vec<CsExpr>) -> Self {
        Self::call(format!("XlRuntime.{method}"), args)
    }

    pub fn binary(op: &'static str, left: CsExpr, right: CsExpr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn cast(ty: ValueType, expr: CsExpr) -> Self {
        Self::Cast(ty, Box::new(expr))
    }

    pub fn lambda(body: CsExpr) -> Self {
        Self::Lambda(Box::new(body))
    }

    /// The literal this expression denotes, looking through unary minus.
    pub fn constant(&self) -> Option<f64> {
        match self {
            Self::Literal(Literal::Integer(i)) => Some(*i as f64),
            Self::Literal(Literal::Number(n)) => Some(*n),
            Self::Literal(Literal::Boolean(b)) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Unary("-", inner) => inner.constant().map(|n| -n),
            Self::Cast(_, inner) => inner.constant(),
            _ => None,
        }
    }

    /// Every identifier in the tree.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit(&mut |e| {
            if let CsExpr::Ident(name) = e {
                out.insert(name.clone());
            }
        });
        out
    }

    /// Whether evaluating this expression can raise a spreadsheet error:
    /// it calls a raising runtime helper or reads one of `deferred`.
    pub fn may_raise(&self, deferred: &BTreeSet<String>) -> bool {
        let mut raises = false;
        self.visit(&mut |e| match e {
            CsExpr::Ident(name) if deferred.contains(name) => raises = true,
            CsExpr::Call { target, .. } => {
                if let Some(method) = target.strip_prefix("XlRuntime.") {
                    raises |= RAISING_HELPERS.contains(&method);
                }
            }
            _ => {}
        });
        raises
    }

    fn visit(&self, f: &mut impl FnMut(&CsExpr)) {
        f(self);
        match self {
            Self::Literal(_) | Self::Null | Self::Ident(_) => {}
            Self::Cast(_, inner) | Self::Unary(_, inner) | Self::Lambda(inner) => inner.visit(f),
            Self::Binary { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Self::Conditional {
                condition,
                then,
                otherwise,
            } => {
                condition.visit(f);
                then.visit(f);
                otherwise.visit(f);
            }
            Self::Call { args: items, .. } | Self::Array { items, .. } => {
                for item in items {
                    item.visit(f);
                }
            }
        }
    }

    /// Rewrite every identifier through `rename`.
    ///
    /// Fails with [`CompileError::UnmappedIdentifier`] on the first identifier
    /// `rename` has no entry for; nothing is partially rewritten.
    pub fn rename(&self, rename: &impl Fn(&str) -> Option<String>) -> CompileResult<CsExpr> {
        let boxed = |e: &CsExpr| -> CompileResult<Box<CsExpr>> { Ok(Box::new(e.rename(rename)?)) };
        Ok(match self {
            Self::Literal(lit) => Self::Literal(lit.clone()),
            Self::Null => Self::Null,
            Self::Ident(raw) => Self::Ident(rename(raw).ok_or_else(|| {
                CompileError::UnmappedIdentifier { raw: raw.clone() }
            })?),
            Self::Cast(ty, inner) => Self::Cast(*ty, boxed(inner)?),
            Self::Unary(op, inner) => Self::Unary(*op, boxed(inner)?),
            Self::Lambda(inner) => Self::Lambda(boxed(inner)?),
            Self::Binary { op, left, right } => Self::Binary {
                op: *op,
                left: boxed(left)?,
                right: boxed(right)?,
            },
            Self::Conditional {
                condition,
                then,
                otherwise,
            } => Self::Conditional {
                condition: boxed(condition)?,
                then: boxed(then)?,
                otherwise: boxed(otherwise)?,
            },
            Self::Call { target, args } => Self::Call {
                target: target.clone(),
                args: args
                    .iter()
                    .map(|a| a.rename(rename))
                    .collect::<CompileResult<_>>()?,
            },
            Self::Array { element, items } => Self::Array {
                element: *element,
                items: items
                    .iter()
                    .map(|a| a.rename(rename))
                    .collect::<CompileResult<_>>()?,
            },
        })
    }

    /// C# source text.
    pub fn render(&self) -> String {
        match self {
            Self::Literal(lit) => render_literal(lit),
            Self::Null => "null".to_string(),
            Self::Ident(name) => name.clone(),
            Self::Cast(ty, inner) => format!("({}){}", ty.cs_name(), inner.render_operand()),
            Self::Unary(op, inner) => match inner.as_ref() {
                Self::Unary(..) => format!("{op}({})", inner.render()),
                _ => format!("{op}{}", inner.render_operand()),
            },
            Self::Binary { op, left, right } => format!(
                "{} {op} {}",
                left.render_operand(),
                right.render_operand()
            ),
            Self::Conditional {
                condition,
                then,
                otherwise,
            } => format!(
                "{} ? {} : {}",
                condition.render_operand(),
                then.render_operand(),
                otherwise.render_operand()
            ),
            Self::Call { target, args } => format!("{target}({})", render_list(args)),
            Self::Array { element, items } => {
                format!("new {}[] {{ {} }}", element.cs_name(), render_list(items))
            }
            Self::Lambda(body) => format!("() => {}", body.render()),
        }
    }

    /// Render for use inside a larger operator expression.
    fn render_operand(&self) -> String {
        match self {
            Self::Binary { .. } | Self::Conditional { .. } | Self::Lambda(_) => {
                format!("({})", self.render())
            }
            Self::Literal(Literal::Integer(i)) if *i < 0 => format!("({i})"),
            Self::Literal(Literal::Number(n)) if *n < 0.0 => format!("({})", render_number(*n)),
            _ => self.render(),
        }
    }
}

fn render_list(items: &[CsExpr]) -> String {
    items
        .iter()
        .map(CsExpr::render)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Integer(i) => i.to_string(),
        Literal::Number(n) => render_number(*n),
        Literal::Text(s) => render_string(s),
        Literal::Boolean(b) => b.to_string(),
    }
}

/// Double literal that always reads back as a double.
fn render_number(n: f64) -> String {
    let text = format!("{n:?}");
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

fn render_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
