//! Ad-hoc formula evaluation.
//!
//! Walks expression trees directly against the workbook, with the same value
//! rules the generated runtime applies: text and booleans inside ranges are
//! skipped by aggregates, blanks count as zero (or empty text), and spreadsheet
//! errors such as `#DIV/0!` travel as values until `IFERROR` catches them.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::formula::{expand_range, BinaryOperator, Expr, Function, UnaryOperator};
use crate::types::{CellContent, CellId, Literal, Workbook};

/// Spreadsheet error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XlError {
    DivZero,
    Value,
    NotAvailable,
    Num,
    Ref,
}

impl fmt::Display for XlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            XlError::DivZero => "#DIV/0!",
            XlError::Value => "#VALUE!",
            XlError::NotAvailable => "#N/A",
            XlError::Num => "#NUM!",
            XlError::Ref => "#REF!",
        };
        f.write_str(code)
    }
}

/// Result of evaluating a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(XlError),
    /// A cell that does not exist in the workbook.
    Blank,
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Integer(i) => Value::Number(*i as f64),
            Literal::Number(n) => Value::Number(*n),
            Literal::Text(s) => Value::Text(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Error(e) => write!(f, "{e}"),
            Value::Blank => Ok(()),
        }
    }
}

/// General number format: at most 15 significant digits, no trailing zeros.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let rounded: f64 = format!("{:.14e}", n).parse().unwrap_or(n);
    format!("{rounded}")
}

type Xl<T> = Result<T, XlError>;

/// Unwrap a spreadsheet-level result, turning errors into error values.
macro_rules! xl {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => return Ok(Value::Error(e)),
        }
    };
}

/// Numeric reading of text the way a spreadsheet coerces it. Spellings that
/// only a float parser accepts (`nan`, `inf`) and overflow are not numbers.
pub fn parse_numeric_text(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn to_number(value: &Value) -> Xl<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => parse_numeric_text(s).ok_or(XlError::Value),
        Value::Blank => Ok(0.0),
        Value::Error(e) => Err(*e),
    }
}

fn to_text(value: &Value) -> Xl<String> {
    match value {
        Value::Error(e) => Err(*e),
        other => Ok(other.to_string()),
    }
}

fn to_bool(value: &Value) -> Xl<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        Value::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
        Value::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
        Value::Text(_) => Err(XlError::Value),
        Value::Blank => Ok(false),
        Value::Error(e) => Err(*e),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) | Value::Blank => 0,
        Value::Text(_) => 1,
        Value::Boolean(_) => 2,
        Value::Error(_) => 3,
    }
}

/// Spreadsheet ordering: numbers < text < booleans, text case-insensitive.
/// A blank takes the type of the value it is compared with.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Blank, Value::Text(s)) => "".cmp(s.to_lowercase().as_str()),
        (Value::Text(s), Value::Blank) => s.to_lowercase().as_str().cmp(""),
        (Value::Blank, Value::Boolean(b)) => false.cmp(b),
        (Value::Boolean(a), Value::Blank) => a.cmp(&false),
        (Value::Blank, Value::Blank) => Ordering::Equal,
        (Value::Blank, Value::Number(n)) => 0.0_f64.partial_cmp(n).unwrap_or(Ordering::Equal),
        (Value::Number(n), Value::Blank) => n.partial_cmp(&0.0).unwrap_or(Ordering::Equal),
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Text(x), Value::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Argument value tagged with whether it came from inside a range.
struct SeqItem {
    value: Value,
    from_range: bool,
}

/// Evaluates cells on demand, memoizing every cell it visits.
pub struct Evaluator<'w> {
    workbook: &'w Workbook,
    cache: HashMap<CellId, Value>,
    in_progress: Vec<CellId>,
}

impl<'w> Evaluator<'w> {
    pub fn new(workbook: &'w Workbook) -> Self {
        Self {
            workbook,
            cache: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Value of `id`. A formula that evaluates to a blank reports zero.
    pub fn evaluate(&mut self, id: &CellId) -> CompileResult<Value> {
        match self.value_of(id)? {
            Value::Blank if self.workbook.get(id).is_some_and(|c| c.is_formula()) => {
                Ok(Value::Number(0.0))
            }
            other => Ok(other),
        }
    }

    fn value_of(&mut self, id: &CellId) -> CompileResult<Value> {
        if let Some(value) = self.cache.get(id) {
            return Ok(value.clone());
        }
        let workbook = self.workbook;
        let Some(cell) = workbook.get(id) else {
            return Ok(Value::Blank);
        };

        let value = match &cell.content {
            CellContent::Value(literal) => Value::from(literal),
            CellContent::Formula { expr, .. } => {
                if let Some(pos) = self.in_progress.iter().position(|c| c == id) {
                    return Err(CompileError::CyclicDependency {
                        chain: self.in_progress[pos..].to_vec(),
                    });
                }
                self.in_progress.push(id.clone());
                let result = self.eval(expr, id);
                self.in_progress.pop();
                result?
            }
        };

        self.cache.insert(id.clone(), value.clone());
        Ok(value)
    }

    fn eval(&mut self, expr: &Expr, cell: &CellId) -> CompileResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),
            Expr::CellReference(id) => self.value_of(id),
            Expr::RangeReference { .. } => Err(CompileError::InvalidArguments {
                cell: cell.clone(),
                message: "range used where a single value is expected".to_string(),
            }),
            Expr::UnaryOp { op, operand } => {
                let value = self.eval(operand, cell)?;
                Ok(match op {
                    UnaryOperator::Plus => value,
                    UnaryOperator::Neg => Value::Number(-xl!(to_number(&value))),
                    UnaryOperator::Percent => Value::Number(xl!(to_number(&value)) / 100.0),
                })
            }
            Expr::BinaryOp { op, left, right } => {
                let left = self.eval(left, cell)?;
                let right = self.eval(right, cell)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::FunctionCall { name, args } => {
                let function =
                    Function::lookup(name).ok_or_else(|| CompileError::UnsupportedFunction {
                        function: name.clone(),
                        cell: cell.clone(),
                    })?;
                function
                    .check_arity(name, args.len())
                    .map_err(|message| CompileError::InvalidArguments {
                        cell: cell.clone(),
                        message,
                    })?;
                self.call(function, args, cell)
            }
        }
    }

    fn call(&mut self, function: Function, args: &[Expr], cell: &CellId) -> CompileResult<Value> {
        use Function as F;

        match function {
            F::Sum => {
                let items = self.sequence(args, cell)?;
                Ok(Value::Number(xl!(numbers(&items)).iter().sum()))
            }
            F::Average => {
                let items = self.sequence(args, cell)?;
                let values = xl!(numbers(&items));
                if values.is_empty() {
                    return Ok(Value::Error(XlError::DivZero));
                }
                Ok(Value::Number(values.iter().sum::<f64>() / values.len() as f64))
            }
            F::Min | F::Max => {
                let items = self.sequence(args, cell)?;
                let values = xl!(numbers(&items));
                let pick: fn(f64, f64) -> f64 = if function == F::Min { f64::min } else { f64::max };
                Ok(Value::Number(values.into_iter().reduce(pick).unwrap_or(0.0)))
            }
            F::Product => {
                let items = self.sequence(args, cell)?;
                let values = xl!(numbers(&items));
                if values.is_empty() {
                    return Ok(Value::Number(0.0));
                }
                Ok(Value::Number(values.iter().product()))
            }
            F::Count => {
                let items = self.sequence(args, cell)?;
                let count = items
                    .iter()
                    .filter(|item| match &item.value {
                        Value::Number(_) => true,
                        Value::Boolean(_) => !item.from_range,
                        Value::Text(s) => !item.from_range && parse_numeric_text(s).is_some(),
                        Value::Error(_) | Value::Blank => false,
                    })
                    .count();
                Ok(Value::Number(count as f64))
            }
            F::Npv => {
                let rate = xl!(to_number(&self.eval(&args[0], cell)?));
                let items = self.sequence(&args[1..], cell)?;
                let values = xl!(numbers(&items));
                let npv = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v / (1.0 + rate).powi(i as i32 + 1))
                    .sum();
                Ok(Value::Number(npv))
            }
            F::If => {
                let condition = xl!(to_bool(&self.eval(&args[0], cell)?));
                match (condition, args.get(2)) {
                    (true, _) => self.eval(&args[1], cell),
                    (false, Some(otherwise)) => self.eval(otherwise, cell),
                    (false, None) => Ok(Value::Boolean(false)),
                }
            }
            F::IfError => match self.eval(&args[0], cell)? {
                Value::Error(_) => self.eval(&args[1], cell),
                value => Ok(value),
            },
            F::And | F::Or => {
                let items = self.sequence(args, cell)?;
                let mut flags = Vec::new();
                for item in &items {
                    match (&item.value, item.from_range) {
                        (Value::Error(e), _) => return Ok(Value::Error(*e)),
                        (Value::Text(_) | Value::Blank, true) => {}
                        (value, _) => flags.push(xl!(to_bool(value))),
                    }
                }
                if flags.is_empty() {
                    return Ok(Value::Error(XlError::Value));
                }
                let result = if function == F::And {
                    flags.iter().all(|f| *f)
                } else {
                    flags.iter().any(|f| *f)
                };
                Ok(Value::Boolean(result))
            }
            F::Not => {
                let value = self.eval(&args[0], cell)?;
                Ok(Value::Boolean(!xl!(to_bool(&value))))
            }
            F::Abs | F::Int | F::Sqrt => {
                let n = xl!(to_number(&self.eval(&args[0], cell)?));
                Ok(match function {
                    F::Abs => Value::Number(n.abs()),
                    F::Int => Value::Number(n.floor()),
                    _ if n < 0.0 => Value::Error(XlError::Num),
                    _ => Value::Number(n.sqrt()),
                })
            }
            F::Power | F::Mod | F::Round | F::RoundUp | F::RoundDown => {
                let a = xl!(to_number(&self.eval(&args[0], cell)?));
                let b = xl!(to_number(&self.eval(&args[1], cell)?));
                Ok(numeric_pair(function, a, b))
            }
            F::Concatenate => {
                let mut out = String::new();
                for arg in args {
                    out.push_str(&xl!(to_text(&self.eval(arg, cell)?)));
                }
                Ok(Value::Text(out))
            }
            F::Len | F::Upper | F::Lower | F::Trim => {
                let s = xl!(to_text(&self.eval(&args[0], cell)?));
                Ok(match function {
                    F::Len => Value::Number(s.chars().count() as f64),
                    F::Upper => Value::Text(s.to_uppercase()),
                    F::Lower => Value::Text(s.to_lowercase()),
                    _ => Value::Text(
                        s.split(' ')
                            .filter(|w| !w.is_empty())
                            .collect::<Vec<_>>()
                            .join(" "),
                    ),
                })
            }
            F::Index => {
                let (values, width) = self.block(&args[0], cell)?;
                let row = xl!(to_number(&self.eval(&args[1], cell)?));
                let col = match args.get(2) {
                    Some(arg) => xl!(to_number(&self.eval(arg, cell)?)),
                    None => 0.0,
                };
                Ok(xl!(index(&values, width, row, col)).clone())
            }
            F::Match => {
                let key = self.eval(&args[0], cell)?;
                if let Value::Error(e) = key {
                    return Ok(Value::Error(e));
                }
                let (values, _) = self.block(&args[1], cell)?;
                let match_type = match args.get(2) {
                    Some(arg) => xl!(to_number(&self.eval(arg, cell)?)),
                    None => 1.0,
                };
                let position = xl!(match_position(&key, &values, match_type));
                Ok(Value::Number(position as f64))
            }
            F::VLookup => {
                let key = self.eval(&args[0], cell)?;
                if let Value::Error(e) = key {
                    return Ok(Value::Error(e));
                }
                let (values, width) = self.block(&args[1], cell)?;
                let col = xl!(to_number(&self.eval(&args[2], cell)?));
                let approximate = match args.get(3) {
                    Some(arg) => xl!(to_bool(&self.eval(arg, cell)?)),
                    None => true,
                };
                Ok(xl!(vlookup(&key, &values, width, col, approximate)).clone())
            }
            F::Choose => {
                let index = xl!(to_number(&self.eval(&args[0], cell)?)).trunc();
                let options = &args[1..];
                if index < 1.0 || index > options.len() as f64 {
                    return Ok(Value::Error(XlError::Value));
                }
                self.eval(&options[index as usize - 1], cell)
            }
        }
    }

    /// Flatten arguments, expanding ranges row-major.
    fn sequence(&mut self, args: &[Expr], cell: &CellId) -> CompileResult<Vec<SeqItem>> {
        let mut items = Vec::new();
        for arg in args {
            if let Expr::RangeReference { start, end } = arg {
                for id in expand_range(start, end) {
                    items.push(SeqItem {
                        value: self.value_of(&id)?,
                        from_range: true,
                    });
                }
            } else {
                items.push(SeqItem {
                    value: self.eval(arg, cell)?,
                    from_range: false,
                });
            }
        }
        Ok(items)
    }

    /// Values of a rectangular block, row-major, with its width.
    fn block(&mut self, arg: &Expr, cell: &CellId) -> CompileResult<(Vec<Value>, usize)> {
        let (start, end) = match arg {
            Expr::RangeReference { start, end } => (start, end),
            Expr::CellReference(id) => (id, id),
            _ => {
                return Err(CompileError::InvalidArguments {
                    cell: cell.clone(),
                    message: "lookup functions need a range argument".to_string(),
                })
            }
        };
        let width = (end.col - start.col + 1) as usize;
        let values = expand_range(start, end)
            .iter()
            .map(|id| self.value_of(id))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok((values, width))
    }
}

fn numbers(items: &[SeqItem]) -> Xl<Vec<f64>> {
    let mut out = Vec::new();
    for item in items {
        match (&item.value, item.from_range) {
            (Value::Error(e), _) => return Err(*e),
            (Value::Number(n), _) => out.push(*n),
            (_, true) => {}
            (value, false) => out.push(to_number(value)?),
        }
    }
    Ok(out)
}

fn binary(op: BinaryOperator, left: &Value, right: &Value) -> Value {
    use BinaryOperator as B;

    for side in [left, right] {
        if let Value::Error(e) = side {
            return Value::Error(*e);
        }
    }

    if op == B::Concat {
        return match (to_text(left), to_text(right)) {
            (Ok(l), Ok(r)) => Value::Text(l + &r),
            (Err(e), _) | (_, Err(e)) => Value::Error(e),
        };
    }

    if op.is_comparison() {
        let ordering = compare_values(left, right);
        return Value::Boolean(match op {
            B::Eq => ordering == Ordering::Equal,
            B::Ne => ordering != Ordering::Equal,
            B::Lt => ordering == Ordering::Less,
            B::Le => ordering != Ordering::Greater,
            B::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        });
    }

    let (l, r) = match (to_number(left), to_number(right)) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => return Value::Error(e),
    };
    match op {
        B::Add => Value::Number(l + r),
        B::Sub => Value::Number(l - r),
        B::Mul => Value::Number(l * r),
        B::Div if r == 0.0 => Value::Error(XlError::DivZero),
        B::Div => Value::Number(l / r),
        _ => finite(l.powf(r)),
    }
}

fn finite(n: f64) -> Value {
    if n.is_finite() {
        Value::Number(n)
    } else {
        Value::Error(XlError::Num)
    }
}

fn numeric_pair(function: Function, a: f64, b: f64) -> Value {
    let scale = 10f64.powf(b.trunc());
    match function {
        Function::Power => finite(a.powf(b)),
        Function::Mod if b == 0.0 => Value::Error(XlError::DivZero),
        Function::Mod => Value::Number(a - b * (a / b).floor()),
        Function::Round => Value::Number((a * scale).round() / scale),
        Function::RoundUp => Value::Number(a.signum() * (a.abs() * scale).ceil() / scale),
        _ => Value::Number(a.signum() * (a.abs() * scale).floor() / scale),
    }
}

fn index(values: &[Value], width: usize, row: f64, col: f64) -> Xl<&Value> {
    let height = values.len() / width.max(1);
    let (row, col) = match (row.trunc() as i64, col.trunc() as i64) {
        (r, 0) if width == 1 => (r, 1),
        (c, 0) if height == 1 => (1, c),
        (_, 0) => return Err(XlError::Ref),
        (r, c) => (r, c),
    };
    if row < 1 || col < 1 || row as usize > height || col as usize > width {
        return Err(XlError::Ref);
    }
    Ok(&values[(row as usize - 1) * width + col as usize - 1])
}

/// 1-based position of `key`; match type 0 exact, 1 largest ≤ key, -1 smallest ≥ key.
fn match_position(key: &Value, values: &[Value], match_type: f64) -> Xl<usize> {
    if match_type == 0.0 {
        return values
            .iter()
            .position(|v| compare_values(v, key) == Ordering::Equal)
            .map(|i| i + 1)
            .ok_or(XlError::NotAvailable);
    }
    let mut found = None;
    for (i, v) in values.iter().enumerate() {
        let ordering = compare_values(v, key);
        let fits = if match_type > 0.0 {
            ordering != Ordering::Greater
        } else {
            ordering != Ordering::Less
        };
        if !fits {
            break;
        }
        found = Some(i + 1);
    }
    found.ok_or(XlError::NotAvailable)
}

fn vlookup<'v>(
    key: &Value,
    values: &'v [Value],
    width: usize,
    col: f64,
    approximate: bool,
) -> Xl<&'v Value> {
    let col = col.trunc();
    if col < 1.0 || col > width as f64 {
        return Err(XlError::Ref);
    }
    let first_column: Vec<Value> = values.chunks(width).map(|row| row[0].clone()).collect();
    let match_type = if approximate { 1.0 } else { 0.0 };
    let row = match_position(key, &first_column, match_type)?;
    Ok(&values[(row - 1) * width + col as usize - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parse_formula;
    use crate::types::Cell;

    fn id(a1: &str) -> CellId {
        CellId::parse(a1, "S").unwrap()
    }

    fn book(cells: &[(&str, &str)]) -> Workbook {
        let mut wb = Workbook::new("book");
        for (a1, content) in cells {
            let cell = if content.starts_with('=') {
                Cell::formula(*content, parse_formula(content, "S").unwrap())
            } else if let Ok(i) = content.parse::<i64>() {
                Cell::value(Literal::Integer(i))
            } else {
                Cell::value(Literal::Text(content.to_string()))
            };
            wb.insert(id(a1), cell);
        }
        wb
    }

    fn eval(wb: &Workbook, a1: &str) -> Value {
        Evaluator::new(wb).evaluate(&id(a1)).unwrap()
    }

    #[test]
    fn test_arithmetic_chain() {
        let wb = book(&[("A1", "2"), ("A2", "3"), ("A3", "=A1+A2*2")]);
        assert_eq!(eval(&wb, "A3"), Value::Number(8.0));
    }

    #[test]
    fn test_sum_skips_text_in_ranges() {
        let wb = book(&[("A1", "1"), ("A2", "label"), ("A3", "4"), ("B1", "=SUM(A1:A4)")]);
        assert_eq!(eval(&wb, "B1"), Value::Number(5.0));
    }

    #[test]
    fn test_division_by_zero_caught_by_iferror() {
        let wb = book(&[("A1", "0"), ("B1", "=10/A1"), ("C1", "=IFERROR(B1, -1)")]);
        assert_eq!(eval(&wb, "B1"), Value::Error(XlError::DivZero));
        assert_eq!(eval(&wb, "C1"), Value::Number(-1.0));
    }

    #[test]
    fn test_non_finite_text_is_a_value_error() {
        let wb = book(&[("A1", "nan"), ("A2", "inf"), ("B1", "=A1+1"), ("B2", "=A2*2"), ("B3", "=\" 7\"+1")]);
        assert_eq!(eval(&wb, "B1"), Value::Error(XlError::Value));
        assert_eq!(eval(&wb, "B2"), Value::Error(XlError::Value));
        assert_eq!(eval(&wb, "B3"), Value::Number(8.0));
        assert_eq!(parse_numeric_text("1e999"), None);
    }

    #[test]
    fn test_text_comparison_is_case_insensitive() {
        let wb = book(&[("A1", "Apple"), ("B1", "=A1=\"APPLE\""), ("C1", "=IF(B1, \"yes\")")]);
        assert_eq!(eval(&wb, "B1"), Value::Boolean(true));
        assert_eq!(eval(&wb, "C1"), Value::Text("yes".to_string()));
    }

    #[test]
    fn test_lookups() {
        let wb = book(&[
            ("A1", "1"),
            ("B1", "one"),
            ("A2", "5"),
            ("B2", "five"),
            ("A3", "9"),
            ("B3", "nine"),
            ("C1", "=VLOOKUP(6, A1:B3, 2)"),
            ("C2", "=MATCH(9, A1:A3, 0)"),
            ("C3", "=INDEX(A1:B3, 3, 2)"),
            ("C4", "=VLOOKUP(4, A1:B3, 2, FALSE)"),
        ]);
        assert_eq!(eval(&wb, "C1"), Value::Text("five".to_string()));
        assert_eq!(eval(&wb, "C2"), Value::Number(3.0));
        assert_eq!(eval(&wb, "C3"), Value::Text("nine".to_string()));
        assert_eq!(eval(&wb, "C4"), Value::Error(XlError::NotAvailable));
    }

    #[test]
    fn test_missing_cell_is_zero() {
        let wb = book(&[("A1", "=Z99"), ("A2", "=Z99+1")]);
        assert_eq!(eval(&wb, "A1"), Value::Number(0.0));
        assert_eq!(eval(&wb, "A2"), Value::Number(1.0));
    }

    #[test]
    fn test_cycle_is_reported() {
        let wb = book(&[("A1", "=B1"), ("B1", "=A1")]);
        let err = Evaluator::new(&wb).evaluate(&id("A1")).unwrap_err();
        assert!(matches!(err, CompileError::CyclicDependency { .. }));
    }

    #[test]
    fn test_unsupported_function() {
        let wb = book(&[("A1", "=XIRR(1, 2)")]);
        let err = Evaluator::new(&wb).evaluate(&id("A1")).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedFunction { .. }));
    }

    #[test]
    fn test_rounding_and_mod() {
        let wb = book(&[
            ("A1", "=ROUND(2.5, 0)"),
            ("A2", "=ROUNDDOWN(-2.57, 1)"),
            ("A3", "=ROUNDUP(2.01, 0)"),
            ("A4", "=MOD(-3, 2)"),
        ]);
        assert_eq!(eval(&wb, "A1"), Value::Number(3.0));
        assert_eq!(eval(&wb, "A2"), Value::Number(-2.5));
        assert_eq!(eval(&wb, "A3"), Value::Number(3.0));
        assert_eq!(eval(&wb, "A4"), Value::Number(1.0));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-2.5), "-2.5");
    }
}
