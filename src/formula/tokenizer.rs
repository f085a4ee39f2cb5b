//! Formula tokenizer
//!
//! Converts spreadsheet formula text like `=SUM(A1:A3) * 'Rates'!B2` into a
//! sequence of tokens that can be parsed into an expression tree.

use std::iter::Peekable;
use std::str::Chars;

/// A token in a formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// An integer literal (no decimal point or exponent), e.g. `42`
    Integer(i64),
    /// A floating point literal, e.g. `45.67` or `1.5e10`
    Number(f64),
    /// A double-quoted text literal
    Text(String),
    /// A function name, boolean, or A1 address (possibly `$`-anchored)
    Identifier(String),
    /// A sheet qualifier: `Sheet2!` or `'My Sheet'!`
    Sheet(String),
    /// Binary/comparison/postfix operators: + - * / ^ & % = <> >= <= < >
    Operator(String),
    OpenParen,
    CloseParen,
    Comma,
    /// Colon for ranges (A1:B2)
    Colon,
}

/// Error during tokenization
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizeError {
    pub message: String,
    pub position: usize,
}

impl TokenizeError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tokenize error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for TokenizeError {}

/// Tokenizer for formula expressions
pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given formula string
    pub fn new(formula: &'a str) -> Self {
        // Formulas start with '='; calamine strips it, users often don't.
        let formula = formula.strip_prefix('=').unwrap_or(formula);
        Self {
            chars: formula.chars().peekable(),
            position: 0,
        }
    }

    /// Tokenize the entire formula into a vector of tokens
    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token, or None if at end of input
    fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '"' => self.read_string()?,
            '\'' => self.read_quoted_sheet()?,

            '(' => {
                self.advance();
                Token::OpenParen
            }
            ')' => {
                self.advance();
                Token::CloseParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            ':' => {
                self.advance();
                Token::Colon
            }

            '+' | '-' | '*' | '/' | '^' | '&' | '%' => {
                self.advance();
                Token::Operator(c.to_string())
            }

            '<' => self.read_less_than_operator(),
            '>' => self.read_greater_than_operator(),
            '=' => {
                self.advance();
                Token::Operator("=".to_string())
            }

            c if c.is_ascii_digit() || c == '.' => self.read_number()?,

            c if c.is_alphabetic() || c == '_' || c == '$' => self.read_identifier(),

            c => {
                return Err(TokenizeError::new(
                    format!("Unexpected character: '{}'", c),
                    self.position,
                ));
            }
        };
        Ok(Some(token))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a double-quoted text literal; `""` is an escaped quote.
    fn read_string(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(TokenizeError::new("Unterminated string literal", start_pos));
                }
                Some('"') => {
                    if self.peek() == Some('"') {
                        value.push('"');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => value.push(c),
            }
        }

        Ok(Token::Text(value))
    }

    /// Read `'Sheet name'!`; single quotes only ever delimit sheet names.
    fn read_quoted_sheet(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        self.advance();
        let mut name = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(TokenizeError::new("Unterminated sheet name", start_pos));
                }
                Some('\'') => {
                    if self.peek() == Some('\'') {
                        name.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => name.push(c),
            }
        }

        if self.peek() != Some('!') {
            return Err(TokenizeError::new(
                "Expected '!' after quoted sheet name",
                self.position,
            ));
        }
        self.advance();
        Ok(Token::Sheet(name))
    }

    /// Read a number; integers stay integers so literal types survive translation.
    fn read_number(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        let mut num_str = String::new();
        let mut is_float = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                num_str.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if self.peek() == Some('.') {
            is_float = true;
            num_str.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    num_str.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if let Some(c @ ('e' | 'E')) = self.peek() {
            is_float = true;
            num_str.push(c);
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                num_str.push(sign);
                self.advance();
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    num_str.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let invalid = || TokenizeError::new(format!("Invalid number: {}", num_str), start_pos);
        let float = || match num_str.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Token::Number(value)),
            _ => Err(invalid()),
        };
        if is_float {
            float()
        } else {
            match num_str.parse::<i64>() {
                Ok(i) => Ok(Token::Integer(i)),
                // Too large for i64: keep the value as a float.
                Err(_) => float(),
            }
        }
    }

    /// Read an identifier; a trailing `!` turns it into a sheet qualifier.
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if self.peek() == Some('!') {
            self.advance();
            return Token::Sheet(ident);
        }

        Token::Identifier(ident)
    }

    fn read_less_than_operator(&mut self) -> Token {
        self.advance();

        match self.peek() {
            Some('=') => {
                self.advance();
                Token::Operator("<=".to_string())
            }
            Some('>') => {
                self.advance();
                Token::Operator("<>".to_string())
            }
            _ => Token::Operator("<".to_string()),
        }
    }

    fn read_greater_than_operator(&mut self) -> Token {
        self.advance();

        match self.peek() {
            Some('=') => {
                self.advance();
                Token::Operator(">=".to_string())
            }
            _ => Token::Operator(">".to_string()),
        }
    }
}

/// Convenience function to tokenize a formula string
pub fn tokenize(formula: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(formula).tokenize()
}
