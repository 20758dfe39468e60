//! Formula parser
//!
//! A recursive descent parser for metric formulas with proper operator precedence.

use crate::ast::{BinaryOperator, Expr};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{tokenize, Token, TokenKind};

/// Most tokens accepted in one formula
///
/// Counted in tokens rather than bytes: rendering a parsed tree emits the
/// same tokens with different spacing, so rendered text always fits again.
pub const MAX_FORMULA_TOKENS: usize = 2048;

/// Deepest accepted nesting of groups, prefix minus and exponent chains
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parse formula text into an expression tree
///
/// Parsing is pure: identical text always yields structurally identical trees.
///
/// # Example
/// ```rust
/// use metricula_formula::{parse_formula, ParseErrorKind};
///
/// let ast = parse_formula("(currentRevenue - previousRevenue) / previousRevenue * 100").unwrap();
/// assert_eq!(ast.field_refs(), vec!["currentRevenue", "previousRevenue"]);
///
/// let err = parse_formula("a b").unwrap_err();
/// assert_eq!(err.kind, ParseErrorKind::TrailingTokens);
/// ```
pub fn parse_formula(text: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(ParseError::new(ParseErrorKind::EmptyFormula, 0));
    }
    if let Some(token) = tokens.get(MAX_FORMULA_TOKENS) {
        return Err(ParseError::new(ParseErrorKind::FormulaTooLong, token.position));
    }

    let mut parser = FormulaParser::new(&tokens, text.len());
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if let Some(token) = parser.current_token() {
        return Err(ParseError::new(ParseErrorKind::TrailingTokens, token.position));
    }

    Ok(expr)
}

/// Formula parser
struct FormulaParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Byte length of the source, reported for errors at end of input
    end: usize,
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(tokens: &'a [Token], end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            depth: 0,
        }
    }

    // === Token access ===

    fn current_token(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn current_operator(&self, ops: &[(char, BinaryOperator)]) -> Option<BinaryOperator> {
        let token = self.current_token()?;
        ops.iter()
            .find(|(c, _)| token.is_operator(*c))
            .map(|&(_, op)| op)
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        match self.current_token() {
            Some(token) if token.kind == TokenKind::RParen => {
                self.consume();
                Ok(())
            }
            Some(token) => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                token.position,
            )),
            None => Err(self.end_of_input()),
        }
    }

    fn end_of_input(&self) -> ParseError {
        ParseError::new(ParseErrorKind::UnexpectedEndOfInput, self.end)
    }

    fn enter(&mut self, position: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::new(ParseErrorKind::NestingTooDeep, position));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Addition/Subtraction: +, -
    // 2. Multiplication/Division: *, /
    // 3. Unary minus
    // 4. Exponentiation: ^ (right associative)
    // 5. Primary: numbers, fields, parentheses

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        while let Some(op) = self.current_operator(&[
            ('+', BinaryOperator::Add),
            ('-', BinaryOperator::Subtract),
        ]) {
            self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.current_operator(&[
            ('*', BinaryOperator::Multiply),
            ('/', BinaryOperator::Divide),
        ]) {
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_token().map_or(self.end, |t| t.position);
        self.enter(position)?;

        let result = match self.current_token() {
            // Prefix unary minus
            Some(token) if token.is_operator('-') => {
                self.consume();
                self.parse_unary().map(Expr::negate)
            }
            _ => self.parse_exponent(),
        };

        self.leave();
        result
    }

    fn parse_exponent(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_primary()?;

        if self.current_token().is_some_and(|t| t.is_operator('^')) {
            self.consume();
            // Right associative; the exponent may carry its own sign
            let right = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOperator::Power, left, right));
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = match self.current_token() {
            Some(token) => token,
            None => return Err(self.end_of_input()),
        };

        match token.kind {
            TokenKind::Number => {
                self.consume();
                let value: f64 = token
                    .text
                    .parse()
                    .map_err(|_| ParseError::new(ParseErrorKind::InvalidNumber, token.position))?;
                if !value.is_finite() {
                    return Err(ParseError::new(ParseErrorKind::InvalidNumber, token.position));
                }
                Ok(Expr::Literal(value))
            }

            TokenKind::Identifier => {
                self.consume();
                Ok(Expr::FieldRef(token.text.clone()))
            }

            TokenKind::LParen => {
                self.consume();
                let inner = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(Expr::grouping(inner))
            }

            TokenKind::Operator | TokenKind::RParen => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                token.position,
            )),
        }
    }
}
