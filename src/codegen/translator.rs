//! Formula translation: expression trees → typed C# statements.
//!
//! Every value cell becomes an input statement and every formula cell, in
//! evaluation order, becomes a formula statement. Each statement assigns one
//! raw identifier (`Sheet1_B3`) and only references identifiers declared
//! before it. Static types are tracked per cell so that every coercion the
//! spreadsheet performs implicitly is emitted explicitly.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::csharp::{ArrayType, CsExpr, ValueType};
use crate::core::evaluator::{format_number, parse_numeric_text};
use crate::error::{CompileError, CompileResult};
use crate::formula::{expand_range, BinaryOperator, Expr, Function, UnaryOperator};
use crate::types::{CellId, Literal, Workbook};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A literal from a value cell, or a blank cell some formula reads.
    Input,
    Formula,
}

/// One generated assignment: `raw = expr` of static type `ty`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub cell: CellId,
    pub raw: String,
    pub label: Option<String>,
    pub ty: ValueType,
    pub expr: CsExpr,
    pub kind: StatementKind,
}

/// Output of translation: statements in declaration order plus the
/// raw-identifier table.
#[derive(Debug, Clone)]
pub struct Translation {
    pub statements: Vec<Statement>,
    pub raw_names: BTreeMap<CellId, String>,
}

/// Expression with its static type.
#[derive(Debug, Clone)]
struct Typed {
    expr: CsExpr,
    ty: ValueType,
}

impl Typed {
    fn new(expr: CsExpr, ty: ValueType) -> Self {
        Self { expr, ty }
    }

    fn literal(literal: Literal) -> Self {
        let ty = ValueType::of(&literal);
        Self::new(CsExpr::Literal(literal), ty)
    }
}

pub struct Translator<'w> {
    workbook: &'w Workbook,
    inline_values: bool,
    prefixes: HashMap<String, String>,
    types: HashMap<CellId, ValueType>,
}

impl<'w> Translator<'w> {
    /// With `inline_values`, references to value cells are replaced by the
    /// cell's literal instead of its input identifier.
    pub fn new(workbook: &'w Workbook, inline_values: bool) -> Self {
        Self {
            workbook,
            inline_values,
            prefixes: HashMap::new(),
            types: HashMap::new(),
        }
    }

    /// Translate all cells; `order` must be the resolved evaluation order.
    pub fn translate(mut self, order: &[CellId]) -> CompileResult<Translation> {
        let workbook = self.workbook;
        let direct = self.direct_references();
        self.assign_prefixes(&direct);

        let mut statements = Vec::new();
        let mut raw_names = BTreeMap::new();

        for (id, cell) in &workbook.cells {
            let Some(literal) = cell.literal() else {
                continue;
            };
            statements.push(self.input(id, cell.label.clone(), literal.clone()));
        }
        for id in direct.iter().filter(|id| workbook.get(id).is_none()) {
            debug!(cell = %id, "blank cell referenced; treating as external input");
            statements.push(self.input(id, None, Literal::Integer(0)));
        }

        for id in order {
            let Some(cell) = workbook.get(id) else {
                continue;
            };
            let Some(expr) = cell.expr() else {
                continue;
            };
            let typed = self.expr(expr, id)?;
            self.types.insert(id.clone(), typed.ty);
            statements.push(Statement {
                cell: id.clone(),
                raw: self.raw_name(id),
                label: cell.label.clone(),
                ty: typed.ty,
                expr: typed.expr,
                kind: StatementKind::Formula,
            });
        }

        for statement in &statements {
            raw_names.insert(statement.cell.clone(), statement.raw.clone());
        }

        debug!(statements = statements.len(), "formulas translated");
        Ok(Translation {
            statements,
            raw_names,
        })
    }

    fn input(&mut self, id: &CellId, label: Option<String>, literal: Literal) -> Statement {
        let ty = ValueType::of(&literal);
        self.types.insert(id.clone(), ty);
        Statement {
            cell: id.clone(),
            raw: self.raw_name(id),
            label,
            ty,
            expr: CsExpr::Literal(literal),
            kind: StatementKind::Input,
        }
    }

    /// Cells read as single references (not through ranges) by any formula.
    fn direct_references(&self) -> BTreeSet<CellId> {
        fn walk(expr: &Expr, out: &mut BTreeSet<CellId>) {
            match expr {
                Expr::CellReference(id) => {
                    out.insert(id.clone());
                }
                Expr::BinaryOp { left, right, .. } => {
                    walk(left, out);
                    walk(right, out);
                }
                Expr::UnaryOp { operand, .. } => walk(operand, out),
                Expr::FunctionCall { args, .. } => args.iter().for_each(|a| walk(a, out)),
                Expr::Literal(_) | Expr::RangeReference { .. } => {}
            }
        }

        let mut out = BTreeSet::new();
        for cell in self.workbook.cells.values() {
            if let Some(expr) = cell.expr() {
                walk(expr, &mut out);
            }
        }
        out
    }

    /// One identifier-safe prefix per sheet, unique across sheets.
    fn assign_prefixes(&mut self, direct: &BTreeSet<CellId>) {
        let mut sheets: Vec<String> = self.workbook.sheets.clone();
        let extra: BTreeSet<&String> = direct
            .iter()
            .map(|id| &id.sheet)
            .chain(self.workbook.cells.keys().map(|id| &id.sheet))
            .filter(|s| !self.workbook.sheets.contains(*s))
            .collect();
        sheets.extend(extra.into_iter().cloned());

        let mut taken = BTreeSet::new();
        for sheet in sheets {
            let base = sanitize_sheet(&sheet);
            let mut prefix = base.clone();
            let mut n = 2;
            while !taken.insert(prefix.clone()) {
                prefix = format!("{base}_{n}");
                n += 1;
            }
            self.prefixes.insert(sheet, prefix);
        }
    }

    fn raw_name(&self, id: &CellId) -> String {
        let prefix = self
            .prefixes
            .get(&id.sheet)
            .cloned()
            .unwrap_or_else(|| sanitize_sheet(&id.sheet));
        format!("{prefix}_{}", id.local_address())
    }

    //--------------------------------------------------------------------------
    // Expressions
    //--------------------------------------------------------------------------

    fn expr(&self, expr: &Expr, cell: &CellId) -> CompileResult<Typed> {
        match expr {
            Expr::Literal(literal) => Ok(Typed::literal(literal.clone())),
            Expr::CellReference(id) => self.reference(id, cell),
            Expr::RangeReference { .. } => Err(invalid(
                cell,
                "range used where a single value is expected",
            )),
            Expr::UnaryOp { op, operand } => {
                let operand = self.expr(operand, cell)?;
                Ok(match op {
                    UnaryOperator::Plus => operand,
                    UnaryOperator::Neg if operand.ty == ValueType::Integer => {
                        Typed::new(CsExpr::Unary("-", Box::new(operand.expr)), ValueType::Integer)
                    }
                    UnaryOperator::Neg => number(CsExpr::Unary("-", Box::new(to_number(operand)))),
                    UnaryOperator::Percent => number(CsExpr::binary(
                        "/",
                        to_number(operand),
                        CsExpr::Literal(Literal::Number(100.0)),
                    )),
                })
            }
            Expr::BinaryOp { op, left, right } => {
                let left = self.expr(left, cell)?;
                let right = self.expr(right, cell)?;
                self.binary(*op, left, right, cell)
            }
            Expr::FunctionCall { name, args } => {
                let function =
                    Function::lookup(name).ok_or_else(|| CompileError::UnsupportedFunction {
                        function: name.clone(),
                        cell: cell.clone(),
                    })?;
                function
                    .check_arity(name, args.len())
                    .map_err(|message| invalid(cell, message))?;
                self.call(function, args, cell)
            }
        }
    }

    fn reference(&self, id: &CellId, cell: &CellId) -> CompileResult<Typed> {
        if let Some(literal) = self.workbook.get(id).and_then(|c| c.literal()) {
            if self.inline_values {
                return Ok(Typed::literal(literal.clone()));
            }
            return Ok(Typed::new(
                CsExpr::ident(self.raw_name(id)),
                ValueType::of(literal),
            ));
        }
        let ty = match self.types.get(id) {
            Some(ty) => *ty,
            None if self.workbook.get(id).is_none() => {
                if self.inline_values {
                    return Ok(Typed::literal(Literal::Integer(0)));
                }
                ValueType::Integer
            }
            None => {
                return Err(invalid(
                    cell,
                    format!("{id} is referenced before it is computed"),
                ))
            }
        };
        Ok(Typed::new(CsExpr::ident(self.raw_name(id)), ty))
    }

    fn binary(
        &self,
        op: BinaryOperator,
        left: Typed,
        right: Typed,
        cell: &CellId,
    ) -> CompileResult<Typed> {
        use BinaryOperator as B;

        if op == B::Concat {
            return Ok(text(CsExpr::binary("+", to_text(left), to_text(right))));
        }

        if op.is_comparison() {
            let symbol = comparison_symbol(op);
            if left.ty.is_numeric() && right.ty.is_numeric() {
                return Ok(boolean(CsExpr::binary(symbol, left.expr, right.expr)));
            }
            let compare = CsExpr::runtime("Compare", vec![left.expr, right.expr]);
            return Ok(boolean(CsExpr::binary(
                symbol,
                compare,
                CsExpr::Literal(Literal::Integer(0)),
            )));
        }

        let l = to_number(left);
        let r = to_number(right);

        Ok(number(match op {
            B::Div => match (l.constant(), r.constant()) {
                (Some(_), Some(d)) if d == 0.0 => {
                    return Err(CompileError::DivisionByZero { cell: cell.clone() })
                }
                (_, Some(d)) if d != 0.0 => CsExpr::binary("/", l, r),
                _ => CsExpr::runtime("Divide", vec![l, r]),
            },
            B::Pow => CsExpr::runtime("Power", vec![l, r]),
            _ => {
                let symbol = match op {
                    B::Add => "+",
                    B::Sub => "-",
                    _ => "*",
                };
                CsExpr::binary(symbol, l, r)
            }
        }))
    }

    //--------------------------------------------------------------------------
    // Functions
    //--------------------------------------------------------------------------

    fn call(&self, function: Function, args: &[Expr], cell: &CellId) -> CompileResult<Typed> {
        use Function as F;

        let scalar = |i: usize| self.expr(&args[i], cell);
        let optional = |i: usize| args.get(i).map(|a| self.expr(a, cell)).transpose();

        Ok(match function {
            F::Sum | F::Average | F::Min | F::Max | F::Product => {
                let method = match function {
                    F::Sum => "Sum",
                    F::Average => "Average",
                    F::Min => "Min",
                    F::Max => "Max",
                    _ => "Product",
                };
                number(CsExpr::runtime(method, self.numbers(args, cell)?))
            }
            F::Npv => {
                let mut call_args = vec![to_number(scalar(0)?)];
                call_args.extend(self.numbers(&args[1..], cell)?);
                number(CsExpr::runtime("Npv", call_args))
            }
            F::Count => self.count(args, cell)?,
            F::And | F::Or => {
                let method = if function == F::And { "And" } else { "Or" };
                boolean(CsExpr::runtime(method, self.booleans(args, cell)?))
            }
            F::Not => boolean(CsExpr::Unary("!", Box::new(to_bool(scalar(0)?)))),
            F::If => {
                let condition = to_bool(scalar(0)?);
                let then = scalar(1)?;
                let otherwise =
                    optional(2)?.unwrap_or_else(|| Typed::literal(Literal::Boolean(false)));
                let ty = then.ty.unify(otherwise.ty);
                Typed::new(
                    CsExpr::Conditional {
                        condition: Box::new(condition),
                        then: Box::new(convert(then, ty)),
                        otherwise: Box::new(convert(otherwise, ty)),
                    },
                    ty,
                )
            }
            F::IfError => {
                let value = scalar(0)?;
                let fallback = scalar(1)?;
                let ty = value.ty.unify(fallback.ty);
                Typed::new(
                    CsExpr::runtime(
                        "IfError",
                        vec![
                            CsExpr::lambda(convert(value, ty)),
                            CsExpr::lambda(convert(fallback, ty)),
                        ],
                    ),
                    ty,
                )
            }
            F::Choose => {
                let index = to_number(scalar(0)?);
                let options = (1..args.len())
                    .map(scalar)
                    .collect::<CompileResult<Vec<_>>>()?;
                let ty = options
                    .iter()
                    .map(|o| o.ty)
                    .reduce(ValueType::unify)
                    .unwrap_or(ValueType::Number);
                let mut call_args = vec![index];
                call_args.extend(
                    options
                        .into_iter()
                        .map(|o| CsExpr::lambda(convert(o, ty))),
                );
                Typed::new(CsExpr::runtime("Choose", call_args), ty)
            }
            F::Abs => number(CsExpr::call("Math.Abs", vec![to_number(scalar(0)?)])),
            F::Int => number(CsExpr::call("Math.Floor", vec![to_number(scalar(0)?)])),
            F::Sqrt => number(CsExpr::runtime("Sqrt", vec![to_number(scalar(0)?)])),
            F::Power | F::Mod | F::Round | F::RoundUp | F::RoundDown => {
                let method = match function {
                    F::Power => "Power",
                    F::Mod => "Mod",
                    F::Round => "Round",
                    F::RoundUp => "RoundUp",
                    _ => "RoundDown",
                };
                number(CsExpr::runtime(
                    method,
                    vec![to_number(scalar(0)?), to_number(scalar(1)?)],
                ))
            }
            F::Concatenate => {
                let mut parts = (0..args.len())
                    .map(|i| scalar(i).map(to_text))
                    .collect::<CompileResult<Vec<_>>>()?
                    .into_iter();
                let first = parts
                    .next()
                    .unwrap_or_else(|| CsExpr::Literal(Literal::Text(String::new())));
                text(parts.fold(first, |acc, part| CsExpr::binary("+", acc, part)))
            }
            F::Len => Typed::new(
                CsExpr::runtime("Len", vec![to_text(scalar(0)?)]),
                ValueType::Integer,
            ),
            F::Upper | F::Lower | F::Trim => {
                let method = match function {
                    F::Upper => "Upper",
                    F::Lower => "Lower",
                    _ => "Trim",
                };
                text(CsExpr::runtime(method, vec![to_text(scalar(0)?)]))
            }
            F::Index => {
                let block = self.block(&args[0], cell)?;
                let ty = block.element_type(0);
                let items = block
                    .cells
                    .iter()
                    .map(|c| match c {
                        Some(t) => convert(t.clone(), ty),
                        None => CsExpr::Literal(ty.default_literal()),
                    })
                    .collect();
                let column = match optional(2)? {
                    Some(col) => to_number(col),
                    None => CsExpr::Literal(Literal::Number(0.0)),
                };
                Typed::new(
                    CsExpr::runtime(
                        "Index",
                        vec![
                            CsExpr::Array {
                                element: ArrayType::Of(ty),
                                items,
                            },
                            CsExpr::Literal(Literal::Integer(block.width as i64)),
                            to_number(scalar(1)?),
                            column,
                        ],
                    ),
                    ty,
                )
            }
            F::Match => {
                let key = scalar(0)?.expr;
                let block = self.block(&args[1], cell)?;
                let match_type = match optional(2)? {
                    Some(t) => to_number(t),
                    None => CsExpr::Literal(Literal::Number(1.0)),
                };
                Typed::new(
                    CsExpr::runtime("Match", vec![key, block.objects(), match_type]),
                    ValueType::Integer,
                )
            }
            F::VLookup => {
                let key = scalar(0)?.expr;
                let block = self.block(&args[1], cell)?;
                let ty = match block.element_type(1) {
                    ValueType::Integer => ValueType::Number,
                    other => other,
                };
                let approximate = match optional(3)? {
                    Some(flag) => to_bool(flag),
                    None => CsExpr::Literal(Literal::Boolean(true)),
                };
                let lookup = CsExpr::runtime(
                    "VLookup",
                    vec![
                        key,
                        block.objects(),
                        CsExpr::Literal(Literal::Integer(block.width as i64)),
                        to_number(scalar(2)?),
                        approximate,
                    ],
                );
                let method = match ty {
                    ValueType::Text => "ToText",
                    ValueType::Boolean => "ToBool",
                    _ => "ToNumber",
                };
                Typed::new(CsExpr::runtime(method, vec![lookup]), ty)
            }
        })
    }

    /// Flatten numeric arguments. Inside ranges, text, booleans and blanks
    /// are skipped; direct arguments are coerced.
    fn numbers(&self, args: &[Expr], cell: &CellId) -> CompileResult<Vec<CsExpr>> {
        let mut out = Vec::new();
        for arg in args {
            match arg {
                Expr::RangeReference { start, end } => {
                    for t in self.range_cells(start, end, cell)?.into_iter().flatten() {
                        if t.ty.is_numeric() {
                            out.push(to_number(t));
                        }
                    }
                }
                _ => out.push(to_number(self.expr(arg, cell)?)),
            }
        }
        Ok(out)
    }

    /// Flatten logical arguments; text and blanks inside ranges are skipped.
    fn booleans(&self, args: &[Expr], cell: &CellId) -> CompileResult<Vec<CsExpr>> {
        let mut out = Vec::new();
        for arg in args {
            match arg {
                Expr::RangeReference { start, end } => {
                    for t in self.range_cells(start, end, cell)?.into_iter().flatten() {
                        if t.ty != ValueType::Text {
                            out.push(to_bool(t));
                        }
                    }
                }
                _ => out.push(to_bool(self.expr(arg, cell)?)),
            }
        }
        Ok(out)
    }

    /// COUNT is static for typed cells; only text arguments need a runtime check.
    fn count(&self, args: &[Expr], cell: &CellId) -> CompileResult<Typed> {
        let mut known = 0i64;
        let mut dynamic = Vec::new();
        for arg in args {
            match arg {
                Expr::RangeReference { start, end } => {
                    known += self
                        .range_cells(start, end, cell)?
                        .iter()
                        .flatten()
                        .filter(|t| t.ty.is_numeric())
                        .count() as i64;
                }
                _ => {
                    let t = self.expr(arg, cell)?;
                    if t.ty == ValueType::Text {
                        dynamic.push(CsExpr::runtime("CountNumeric", vec![t.expr]));
                    } else {
                        known += 1;
                    }
                }
            }
        }
        let total = dynamic
            .into_iter()
            .fold(CsExpr::Literal(Literal::Integer(known)), |acc, part| {
                CsExpr::binary("+", acc, part)
            });
        Ok(Typed::new(total, ValueType::Integer))
    }

    /// Typed references for every cell of a range; `None` for blank cells.
    fn range_cells(
        &self,
        start: &CellId,
        end: &CellId,
        cell: &CellId,
    ) -> CompileResult<Vec<Option<Typed>>> {
        expand_range(start, end)
            .iter()
            .map(|id| match self.workbook.get(id) {
                Some(_) => self.reference(id, cell).map(Some),
                None => Ok(None),
            })
            .collect()
    }

    fn block(&self, arg: &Expr, cell: &CellId) -> CompileResult<Block> {
        let (start, end) = match arg {
            Expr::RangeReference { start, end } => (start, end),
            Expr::CellReference(id) => (id, id),
            _ => return Err(invalid(cell, "lookup functions need a range argument")),
        };
        Ok(Block {
            width: (end.col - start.col + 1) as usize,
            cells: self.range_cells(start, end, cell)?,
        })
    }
}

/// A rectangular lookup range, row-major.
struct Block {
    width: usize,
    cells: Vec<Option<Typed>>,
}

impl Block {
    /// Unified type of the cells at or right of column `skip` (0-based).
    fn element_type(&self, skip: usize) -> ValueType {
        let skip = if skip >= self.width { 0 } else { skip };
        self.cells
            .iter()
            .enumerate()
            .filter(|(i, _)| i % self.width >= skip)
            .filter_map(|(_, c)| c.as_ref().map(|t| t.ty))
            .reduce(ValueType::unify)
            .unwrap_or(ValueType::Number)
    }

    fn objects(&self) -> CsExpr {
        CsExpr::Array {
            element: ArrayType::Object,
            items: self
                .cells
                .iter()
                .map(|c| c.as_ref().map_or(CsExpr::Null, |t| t.expr.clone()))
                .collect(),
        }
    }
}

//------------------------------------------------------------------------------
// Coercions
//------------------------------------------------------------------------------

fn number(expr: CsExpr) -> Typed {
    Typed::new(expr, ValueType::Number)
}

fn text(expr: CsExpr) -> Typed {
    Typed::new(expr, ValueType::Text)
}

fn boolean(expr: CsExpr) -> Typed {
    Typed::new(expr, ValueType::Boolean)
}

fn to_number(t: Typed) -> CsExpr {
    match (t.ty, t.expr) {
        (ValueType::Number, expr) => expr,
        (_, CsExpr::Literal(Literal::Integer(i))) => CsExpr::Literal(Literal::Number(i as f64)),
        (_, CsExpr::Literal(Literal::Boolean(b))) => {
            CsExpr::Literal(Literal::Number(if b { 1.0 } else { 0.0 }))
        }
        (_, CsExpr::Literal(Literal::Text(s))) => match parse_numeric_text(&s) {
            Some(n) => CsExpr::Literal(Literal::Number(n)),
            None => CsExpr::runtime("ToNumber", vec![CsExpr::Literal(Literal::Text(s))]),
        },
        (ValueType::Integer, expr) => CsExpr::cast(ValueType::Number, expr),
        (_, expr) => CsExpr::runtime("ToNumber", vec![expr]),
    }
}

fn to_text(t: Typed) -> CsExpr {
    let literal = |s: String| CsExpr::Literal(Literal::Text(s));
    match (t.ty, t.expr) {
        (ValueType::Text, expr) => expr,
        (_, CsExpr::Literal(Literal::Integer(i))) => literal(i.to_string()),
        (_, CsExpr::Literal(Literal::Number(n))) => literal(format_number(n)),
        (_, CsExpr::Literal(Literal::Boolean(b))) => {
            literal(if b { "TRUE" } else { "FALSE" }.to_string())
        }
        (_, expr) => CsExpr::runtime("ToText", vec![expr]),
    }
}

fn to_bool(t: Typed) -> CsExpr {
    let literal = |b: bool| CsExpr::Literal(Literal::Boolean(b));
    match (t.ty, t.expr) {
        (ValueType::Boolean, expr) => expr,
        (_, CsExpr::Literal(Literal::Integer(i))) => literal(i != 0),
        (_, CsExpr::Literal(Literal::Number(n))) => literal(n != 0.0),
        (_, CsExpr::Literal(Literal::Text(s))) if s.eq_ignore_ascii_case("TRUE") => literal(true),
        (_, CsExpr::Literal(Literal::Text(s))) if s.eq_ignore_ascii_case("FALSE") => literal(false),
        (_, expr) => CsExpr::runtime("ToBool", vec![expr]),
    }
}

fn convert(t: Typed, target: ValueType) -> CsExpr {
    match target {
        _ if t.ty == target => t.expr,
        ValueType::Number | ValueType::Integer => to_number(t),
        ValueType::Text => to_text(t),
        ValueType::Boolean => to_bool(t),
    }
}

fn comparison_symbol(op: BinaryOperator) -> &'static str {
    match op {
        BinaryOperator::Eq => "==",
        BinaryOperator::Ne => "!=",
        BinaryOperator::Lt => "<",
        BinaryOperator::Le => "<=",
        BinaryOperator::Gt => ">",
        _ => ">=",
    }
}

fn invalid(cell: &CellId, message: impl Into<String>) -> CompileError {
    CompileError::InvalidArguments {
        cell: cell.clone(),
        message: message.into(),
    }
}

/// Identifier-safe form of a sheet name: `Q1 Plan` → `Q1_Plan`.
pub fn sanitize_sheet(sheet: &str) -> String {
    let mut out: String = sheet
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push_str("Sheet");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{resolve_order, DependencyGraph};
    use crate::formula::parse_formula;
    use crate::types::Cell;
    use pretty_assertions::assert_eq;

    fn id(a1: &str) -> CellId {
        CellId::parse(a1, "Sheet1").unwrap()
    }

    fn book(cells: &[(&str, Literal)], formulas: &[(&str, &str)]) -> Workbook {
        let mut wb = Workbook::new("book");
        for (a1, lit) in cells {
            wb.insert(id(a1), Cell::value(lit.clone()));
        }
        for (a1, text) in formulas {
            wb.insert(
                id(a1),
                Cell::formula(*text, parse_formula(text, "Sheet1").unwrap()),
            );
        }
        wb
    }

    fn translate(wb: &Workbook) -> CompileResult<Translation> {
        let order = resolve_order(&DependencyGraph::build(wb))?;
        Translator::new(wb, false).translate(&order)
    }

    fn rendered(translation: &Translation, a1: &str) -> String {
        translation
            .statements
            .iter()
            .find(|s| s.cell == id(a1))
            .map(|s| s.expr.render())
            .unwrap()
    }

    #[test]
    fn test_inputs_then_formulas_in_order() {
        let wb = book(
            &[("A1", Literal::Integer(2)), ("A2", Literal::Number(3.5))],
            &[("A3", "=A1+A2")],
        );
        let t = translate(&wb).unwrap();

        let raws: Vec<&str> = t.statements.iter().map(|s| s.raw.as_str()).collect();
        assert_eq!(raws, vec!["Sheet1_A1", "Sheet1_A2", "Sheet1_A3"]);
        assert_eq!(t.statements[2].kind, StatementKind::Formula);
        assert_eq!(t.statements[2].ty, ValueType::Number);
        assert_eq!(rendered(&t, "A3"), "(double)Sheet1_A1 + Sheet1_A2");
    }

    #[test]
    fn test_constant_division_by_zero_rejected() {
        let wb = book(&[], &[("A1", "=1/0")]);
        let err = translate(&wb).unwrap_err();
        assert!(matches!(err, CompileError::DivisionByZero { cell } if cell == id("A1")));
    }

    #[test]
    fn test_division_runtime_check_unless_divisor_constant() {
        let wb = book(
            &[("A1", Literal::Number(4.0))],
            &[("B1", "=A1/0"), ("B2", "=A1/2"), ("B3", "=2/A1")],
        );
        let t = translate(&wb).unwrap();
        assert_eq!(rendered(&t, "B1"), "XlRuntime.Divide(Sheet1_A1, 0.0)");
        assert_eq!(rendered(&t, "B2"), "Sheet1_A1 / 2.0");
        assert_eq!(rendered(&t, "B3"), "XlRuntime.Divide(2.0, Sheet1_A1)");
    }

    #[test]
    fn test_unsupported_function_named() {
        let wb = book(&[], &[("A1", "=XIRR(1, 2)")]);
        let err = translate(&wb).unwrap_err();
        match err {
            CompileError::UnsupportedFunction { function, cell } => {
                assert_eq!(function, "XIRR");
                assert_eq!(cell, id("A1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sum_skips_text_cells_in_range() {
        let wb = book(
            &[
                ("A1", Literal::Integer(1)),
                ("A2", Literal::Text("n/a".to_string())),
                ("A3", Literal::Number(2.5)),
            ],
            &[("B1", "=SUM(A1:A4)")],
        );
        let t = translate(&wb).unwrap();
        assert_eq!(
            rendered(&t, "B1"),
            "XlRuntime.Sum((double)Sheet1_A1, Sheet1_A3)"
        );
    }

    #[test]
    fn test_explicit_coercions() {
        let wb = book(
            &[
                ("A1", Literal::Text("7".to_string())),
                ("A2", Literal::Boolean(true)),
            ],
            &[("B1", "=A1*2"), ("B2", "=A2&\"!\""), ("B3", "=IF(A2, 1, \"no\")")],
        );
        let t = translate(&wb).unwrap();
        assert_eq!(rendered(&t, "B1"), "XlRuntime.ToNumber(Sheet1_A1) * 2.0");
        assert_eq!(rendered(&t, "B2"), "XlRuntime.ToText(Sheet1_A2) + \"!\"");
        assert_eq!(rendered(&t, "B3"), "Sheet1_A2 ? \"1\" : \"no\"");
    }

    #[test]
    fn test_non_finite_text_is_not_folded() {
        let wb = book(&[], &[("A1", "=\"nan\"+1"), ("A2", "=\"inf\"*2"), ("A3", "=\" 4 \"*2")]);
        let t = translate(&wb).unwrap();
        assert_eq!(rendered(&t, "A1"), "XlRuntime.ToNumber(\"nan\") + 1.0");
        assert_eq!(rendered(&t, "A2"), "XlRuntime.ToNumber(\"inf\") * 2.0");
        assert_eq!(rendered(&t, "A3"), "4.0 * 2.0");
    }

    #[test]
    fn test_mixed_comparison_uses_runtime_compare() {
        let wb = book(
            &[("A1", Literal::Text("x".to_string()))],
            &[("B1", "=A1>1"), ("B2", "=3>=2")],
        );
        let t = translate(&wb).unwrap();
        assert_eq!(rendered(&t, "B1"), "XlRuntime.Compare(Sheet1_A1, 1) > 0");
        assert_eq!(rendered(&t, "B2"), "3 >= 2");
    }

    #[test]
    fn test_missing_cell_becomes_input() {
        let wb = book(&[], &[("A1", "=Z9+1")]);
        let t = translate(&wb).unwrap();
        let input = &t.statements[0];
        assert_eq!(input.raw, "Sheet1_Z9");
        assert_eq!(input.kind, StatementKind::Input);
        assert_eq!(input.expr, CsExpr::Literal(Literal::Integer(0)));
    }

    #[test]
    fn test_inline_values() {
        let wb = book(&[("A1", Literal::Integer(2))], &[("A2", "=A1*3")]);
        let order = resolve_order(&DependencyGraph::build(&wb)).unwrap();
        let t = Translator::new(&wb, true).translate(&order).unwrap();
        assert_eq!(rendered(&t, "A2"), "2.0 * 3.0");
    }

    #[test]
    fn test_sheet_prefixes_unique() {
        let mut wb = Workbook::new("book");
        wb.insert(CellId::new("Q1 Plan", 0, 0), Cell::value(Literal::Integer(1)));
        wb.insert(CellId::new("Q1_Plan", 0, 0), Cell::value(Literal::Integer(2)));
        let t = Translator::new(&wb, false).translate(&[]).unwrap();
        let raws: BTreeSet<&str> = t.raw_names.values().map(String::as_str).collect();
        assert_eq!(raws, BTreeSet::from(["Q1_Plan_A1", "Q1_Plan_2_A1"]));
    }

    #[test]
    fn test_sanitize_sheet() {
        assert_eq!(sanitize_sheet("Sheet1"), "Sheet1");
        assert_eq!(sanitize_sheet("2024 Data"), "_2024_Data");
        assert_eq!(sanitize_sheet(""), "Sheet");
    }
}
