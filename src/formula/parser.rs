//! Formula parser
//!
//! Converts a sequence of tokens into an expression tree. Uses recursive
//! descent with spreadsheet operator precedence (lowest first):
//!
//! ```text
//! comparison  = <> < > <= >=
//! concat      &
//! additive    + -
//! term        * /
//! power       ^          (left-associative, as in Excel)
//! unary       - +        (binds tighter than ^: -2^2 = 4)
//! percent     postfix %
//! ```
//!
//! Bare references are resolved against the sheet that owns the formula, so
//! every reference in the resulting tree carries a full [`CellId`].

use serde::{Deserialize, Serialize};

use super::address;
use super::tokenizer::Token;
use crate::types::{CellId, Literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "^")]
    Pow,
    #[serde(rename = "&")]
    Concat,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl BinaryOperator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "^" => Self::Pow,
            "&" => Self::Concat,
            "=" => Self::Eq,
            "<>" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "%")]
    Percent,
}

/// Expression tree node for a parsed formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Literal),
    CellReference(CellId),
    /// Rectangular block; corners are normalized so `start` is top-left.
    RangeReference { start: CellId, end: CellId },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// Function names are stored upper-case.
    FunctionCall { name: String, args: Vec<Expr> },
}

/// Error during parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at token {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Parser for formula tokens
pub struct Parser<'s> {
    tokens: Vec<Token>,
    position: usize,
    sheet: &'s str,
}

impl<'s> Parser<'s> {
    /// Create a parser; `sheet` is the sheet owning the formula.
    pub fn new(tokens: Vec<Token>, sheet: &'s str) -> Self {
        Self {
            tokens,
            position: 0,
            sheet,
        }
    }

    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new("Empty expression", 0));
        }
        let expr = self.comparison()?;

        if !self.is_at_end() {
            return Err(ParseError::new(
                format!("Unexpected token after expression: {:?}", self.peek()),
                self.position,
            ));
        }

        Ok(expr)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any_operator(&mut self, ops: &[&str]) -> Option<BinaryOperator> {
        if let Some(Token::Operator(s)) = self.peek() {
            if ops.contains(&s.as_str()) {
                let op = BinaryOperator::from_symbol(s);
                self.advance();
                return op;
            }
        }
        None
    }

    fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.concat()?;
        while let Some(op) = self.match_any_operator(&["=", "<>", "<", ">", "<=", ">="]) {
            let right = self.concat()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive()?;
        while let Some(op) = self.match_any_operator(&["&"]) {
            let right = self.additive()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;
        while let Some(op) = self.match_any_operator(&["+", "-"]) {
            let right = self.term()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.power()?;
        while let Some(op) = self.match_any_operator(&["*", "/"]) {
            let right = self.power()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        while let Some(op) = self.match_any_operator(&["^"]) {
            let right = self.unary()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Operator(s)) if s == "-" => Some(UnaryOperator::Neg),
            Some(Token::Operator(s)) if s == "+" => Some(UnaryOperator::Plus),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
            });
        }
        self.percent()
    }

    fn percent(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while self.match_token(&Token::Operator("%".to_string())) {
            expr = Expr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }
        Ok(expr)
    }

    /// Arguments: ( expr ( "," expr )* )?
    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if let Some(Token::CloseParen) = self.peek() {
            return Ok(args);
        }

        args.push(self.comparison()?);
        while self.match_token(&Token::Comma) {
            args.push(self.comparison()?);
        }

        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.position;
        match self.advance() {
            Some(Token::Integer(i)) => Ok(Expr::Literal(Literal::Integer(i))),
            Some(Token::Number(n)) => Ok(Expr::Literal(Literal::Number(n))),
            Some(Token::Text(s)) => Ok(Expr::Literal(Literal::Text(s))),
            Some(Token::Sheet(sheet)) => {
                let Some(Token::Identifier(local)) = self.advance() else {
                    return Err(ParseError::new(
                        format!("Expected cell address after '{}!'", sheet),
                        self.position,
                    ));
                };
                self.reference(sheet, &local, position)
            }
            Some(Token::Identifier(name)) => {
                if self.match_token(&Token::OpenParen) {
                    let args = self.arguments()?;
                    if !self.match_token(&Token::CloseParen) {
                        return Err(ParseError::new(
                            "Expected ')' after function arguments",
                            self.position,
                        ));
                    }
                    return Ok(Expr::FunctionCall {
                        name: name.to_uppercase(),
                        args,
                    });
                }
                match name.to_uppercase().as_str() {
                    "TRUE" => return Ok(Expr::Literal(Literal::Boolean(true))),
                    "FALSE" => return Ok(Expr::Literal(Literal::Boolean(false))),
                    _ => {}
                }
                self.reference(self.sheet.to_string(), &name, position)
            }
            Some(Token::OpenParen) => {
                let expr = self.comparison()?;
                if !self.match_token(&Token::CloseParen) {
                    return Err(ParseError::new(
                        "Expected ')' after expression",
                        self.position,
                    ));
                }
                Ok(expr)
            }
            Some(token) => Err(ParseError::new(
                format!("Unexpected token: {:?}", token),
                position,
            )),
            None => Err(ParseError::new("Unexpected end of expression", position)),
        }
    }

    /// A cell reference, or a range if followed by `:`.
    fn reference(&mut self, sheet: String, local: &str, position: usize) -> Result<Expr, ParseError> {
        let (row, col) = address::parse_a1(local).ok_or_else(|| {
            ParseError::new(format!("Unknown name or invalid reference: {}", local), position)
        })?;
        let start = CellId::new(sheet.clone(), row, col);

        if !self.match_token(&Token::Colon) {
            return Ok(Expr::CellReference(start));
        }

        let end_position = self.position;
        let (end_sheet, end_local) = match self.advance() {
            Some(Token::Identifier(local)) => (sheet, local),
            Some(Token::Sheet(other)) => match self.advance() {
                Some(Token::Identifier(local)) => (other, local),
                _ => {
                    return Err(ParseError::new(
                        "Expected cell address after sheet in range",
                        self.position,
                    ))
                }
            },
            _ => {
                return Err(ParseError::new(
                    "Expected cell address after ':'",
                    end_position,
                ))
            }
        };
        if end_sheet != start.sheet {
            return Err(ParseError::new(
                "Range corners must be on the same sheet",
                end_position,
            ));
        }
        let (end_row, end_col) = address::parse_a1(&end_local).ok_or_else(|| {
            ParseError::new(format!("Invalid range end: {}", end_local), end_position)
        })?;

        Ok(Expr::RangeReference {
            start: CellId::new(start.sheet.clone(), row.min(end_row), col.min(end_col)),
            end: CellId::new(start.sheet, row.max(end_row), col.max(end_col)),
        })
    }
}

/// Parse tokens into an expression tree for a formula owned by `sheet`.
pub fn parse(tokens: Vec<Token>, sheet: &str) -> Result<Expr, ParseError> {
    Parser::new(tokens, sheet).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::tokenizer::tokenize;

    fn parse_formula(formula: &str) -> Result<Expr, ParseError> {
        let tokens = tokenize(formula).map_err(|e| ParseError::new(e.message, e.position))?;
        parse(tokens, "Sheet1")
    }

    fn cell(row: u32, col: u32) -> Expr {
        Expr::CellReference(CellId::new("Sheet1", row, col))
    }

    fn int(i: i64) -> Expr {
        Expr::Literal(Literal::Integer(i))
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_formula("42").unwrap(), int(42));
        assert_eq!(
            parse_formula("2.5").unwrap(),
            Expr::Literal(Literal::Number(2.5))
        );
        assert_eq!(
            parse_formula("\"hi\"").unwrap(),
            Expr::Literal(Literal::Text("hi".to_string()))
        );
        assert_eq!(
            parse_formula("true").unwrap(),
            Expr::Literal(Literal::Boolean(true))
        );
    }

    #[test]
    fn test_parse_simple_addition() {
        let expr = parse_formula("=A1+A2").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                left: Box::new(cell(0, 0)),
                right: Box::new(cell(1, 0)),
            }
        );
    }

    #[test]
    fn test_parse_precedence_mul_over_add() {
        let expr = parse_formula("A1 + B1 * 2").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                left: Box::new(cell(0, 0)),
                right: Box::new(Expr::BinaryOp {
                    op: BinaryOperator::Mul,
                    left: Box::new(cell(0, 1)),
                    right: Box::new(int(2)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_negation_binds_tighter_than_power() {
        let expr = parse_formula("-2^2").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: BinaryOperator::Pow,
                left: Box::new(Expr::UnaryOp {
                    op: UnaryOperator::Neg,
                    operand: Box::new(int(2)),
                }),
                right: Box::new(int(2)),
            }
        );
    }

    #[test]
    fn test_parse_concat_below_additive() {
        let expr = parse_formula("\"n=\" & A1 + 1").unwrap();
        let Expr::BinaryOp { op, right, .. } = expr else {
            panic!("expected binary op");
        };
        assert_eq!(op, BinaryOperator::Concat);
        assert!(matches!(
            *right,
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_percent_postfix() {
        let expr = parse_formula("50%").unwrap();
        assert_eq!(
            expr,
            Expr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(int(50)),
            }
        );
    }

    #[test]
    fn test_parse_cross_sheet_reference() {
        let expr = parse_formula("'Q1 Plan'!$B$2").unwrap();
        assert_eq!(expr, Expr::CellReference(CellId::new("Q1 Plan", 1, 1)));
    }

    #[test]
    fn test_parse_range_is_normalized() {
        let expr = parse_formula("SUM(B3:A1)").unwrap();
        assert_eq!(
            expr,
            Expr::FunctionCall {
                name: "SUM".to_string(),
                args: vec![Expr::RangeReference {
                    start: CellId::new("Sheet1", 0, 0),
                    end: CellId::new("Sheet1", 2, 1),
                }],
            }
        );
    }

    #[test]
    fn test_parse_sheet_range() {
        let expr = parse_formula("Data!A1:A3").unwrap();
        assert_eq!(
            expr,
            Expr::RangeReference {
                start: CellId::new("Data", 0, 0),
                end: CellId::new("Data", 2, 0),
            }
        );
    }

    #[test]
    fn test_parse_function_name_uppercased() {
        let expr = parse_formula("if(A1>0, 1, 0)").unwrap();
        let Expr::FunctionCall { name, args } = expr else {
            panic!("expected function call");
        };
        assert_eq!(name, "IF");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_formula("").is_err());
        assert!(parse_formula("SUM(A1, A2")
            .unwrap_err()
            .message
            .contains("')'"));
        assert!(parse_formula("revenue * 2")
            .unwrap_err()
            .message
            .contains("Unknown name"));
        assert!(parse_formula("A1:Other!B2")
            .unwrap_err()
            .message
            .contains("same sheet"));
        assert!(parse_formula("1 2").is_err());
    }
}
