//! Formula tokenizer
//!
//! Splits formula text into [`Token`]s. Recognizes decimal numbers (digits
//! with at most one `.`), identifiers (`[A-Za-z_][A-Za-z0-9_]*`), the
//! operators `+ - * / ^` and parentheses. Whitespace separates tokens and is
//! otherwise ignored.

use crate::error::{ParseError, ParseErrorKind};

/// Token categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Identifier,
    Operator,
    LParen,
    RParen,
}

/// A token and where it starts in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, text: &str, position: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            position,
        }
    }

    /// Byte offset just past the last character
    pub fn end(&self) -> usize {
        self.position + self.text.len()
    }

    pub(crate) fn is_operator(&self, op: char) -> bool {
        self.kind == TokenKind::Operator && self.text.starts_with(op)
    }
}

/// Tokenize formula text
///
/// # Example
/// ```rust
/// use metricula_formula::{tokenize, TokenKind};
///
/// let tokens = tokenize("(revenue - costs) / revenue").unwrap();
/// assert_eq!(tokens.len(), 7);
/// assert_eq!(tokens[1].kind, TokenKind::Identifier);
/// assert_eq!(tokens[1].position, 1);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(None),
        };
        let start = self.pos;

        match c {
            '+' | '-' | '*' | '/' | '^' => {
                self.advance();
                return Ok(Some(self.token(TokenKind::Operator, start)));
            }
            '(' => {
                self.advance();
                return Ok(Some(self.token(TokenKind::LParen, start)));
            }
            ')' => {
                self.advance();
                return Ok(Some(self.token(TokenKind::RParen, start)));
            }
            _ => {}
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()));
        if starts_number {
            return self.scan_number().map(Some);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(Some(self.scan_identifier()));
        }

        Err(ParseError::new(ParseErrorKind::UnexpectedCharacter(c), start))
    }

    fn scan_number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;

        // Integer part
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part; at most one '.' per number
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            if self.peek_char() == Some('.') {
                return Err(ParseError::new(ParseErrorKind::UnexpectedCharacter('.'), self.pos));
            }
        }

        Ok(self.token(TokenKind::Number, start))
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        self.token(TokenKind::Identifier, start)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, &self.input[start..self.pos], start)
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_tokenize_expression() {
        assert_eq!(
            kinds("(a_1 + 2.5)*b"),
            vec![
                (TokenKind::LParen, "(".to_string()),
                (TokenKind::Identifier, "a_1".to_string()),
                (TokenKind::Operator, "+".to_string()),
                (TokenKind::Number, "2.5".to_string()),
                (TokenKind::RParen, ")".to_string()),
                (TokenKind::Operator, "*".to_string()),
                (TokenKind::Identifier, "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("  x ^  12").unwrap();
        let positions: Vec<_> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![2, 4, 7]);
        assert_eq!(tokens[2].end(), 9);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds(".5"), vec![(TokenKind::Number, ".5".to_string())]);
        assert_eq!(kinds("7."), vec![(TokenKind::Number, "7.".to_string())]);
        // Second '.' does not start a number
        let err = tokenize("1.2.3").unwrap_err();
        assert_eq!(err, ParseError::new(ParseErrorKind::UnexpectedCharacter('.'), 3));
        let err = tokenize("a + 7..5").unwrap_err();
        assert_eq!(err, ParseError::new(ParseErrorKind::UnexpectedCharacter('.'), 6));
    }

    #[test]
    fn test_identifier_after_number() {
        assert_eq!(
            kinds("2x"),
            vec![
                (TokenKind::Number, "2".to_string()),
                (TokenKind::Identifier, "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a + $b").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedCharacter('$'));
        assert_eq!(err.position, 4);

        let err = tokenize("a % b").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedCharacter('%'));
    }

    #[test]
    fn test_empty() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize(" \t\n").unwrap().is_empty());
    }
}
