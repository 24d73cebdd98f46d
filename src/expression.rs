//! Restricted arithmetic for numeric cells of descriptor matrices.
//!
//! Descriptor files may come from anywhere, so cells are never handed to a general
//! evaluator. The grammar is exactly:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | "pi" | '(' expr ')'
//! ```

use std::f64::consts::PI;

use crate::descriptor_error::DescriptorError;

/// Deepest nesting of parentheses and unary signs in one cell.
const MAX_NESTING: usize = 64;

/// Evaluate a single matrix cell like `-pi/2`, `0.5*(1+2)` or `1e-3`.
pub fn evaluate(source: &str) -> Result<f64, DescriptorError> {
    let mut parser = ExprParser { source, bytes: source.as_bytes(), position: 0, depth: 0 };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if parser.position != parser.bytes.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    if !value.is_finite() {
        return Err(DescriptorError::NotFinite(source.to_string()));
    }
    Ok(value)
}

struct ExprParser<'src> {
    source: &'src str,
    bytes: &'src [u8],
    position: usize,
    depth: usize,
}

impl<'src> ExprParser<'src> {
    fn expr(&mut self) -> Result<f64, DescriptorError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.position += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.position += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, DescriptorError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.position += 1;
                    value *= self.unary()?;
                }
                Some(b'/') => {
                    self.position += 1;
                    value /= self.unary()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, DescriptorError> {
        match self.peek() {
            Some(b'-') => {
                self.position += 1;
                let value = self.nested(Self::unary)?;
                Ok(-value)
            }
            Some(b'+') => {
                self.position += 1;
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, DescriptorError> {
        match self.peek() {
            Some(b'(') => {
                self.position += 1;
                let value = self.nested(Self::expr)?;
                if self.peek() != Some(b')') {
                    return Err(self.error("expected ')'"));
                }
                self.position += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.constant(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn number(&mut self) -> Result<f64, DescriptorError> {
        let start = self.position;
        self.eat_digits();
        if self.current() == Some(b'.') {
            self.position += 1;
            self.eat_digits();
        }
        if matches!(self.current(), Some(b'e') | Some(b'E')) {
            let mark = self.position;
            self.position += 1;
            if matches!(self.current(), Some(b'+') | Some(b'-')) {
                self.position += 1;
            }
            if !self.current().is_some_and(|c| c.is_ascii_digit()) {
                // Not an exponent after all
                self.position = mark;
            } else {
                self.eat_digits();
            }
        }
        let literal = &self.source[start..self.position];
        literal
            .parse::<f64>()
            .map_err(|_| self.error(&format!("malformed number '{}'", literal)))
    }

    fn constant(&mut self) -> Result<f64, DescriptorError> {
        let start = self.position;
        while self.current().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            self.position += 1;
        }
        match &self.source[start..self.position] {
            "pi" => Ok(PI),
            other => Err(self.error(&format!("unknown identifier '{}'", other))),
        }
    }

    /// Run one level deeper, failing instead of growing the stack without bound.
    fn nested(&mut self, parse: fn(&mut Self) -> Result<f64, DescriptorError>) -> Result<f64, DescriptorError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn eat_digits(&mut self) {
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.position += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(|c| c.is_ascii_whitespace()) {
            self.position += 1;
        }
    }

    /// Next significant byte, skipping whitespace.
    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.current()
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn error(&self, what: &str) -> DescriptorError {
        DescriptorError::ParseError(format!(
            "{} at offset {} in '{}'",
            what, self.position, self.source
        ))
    }
}
