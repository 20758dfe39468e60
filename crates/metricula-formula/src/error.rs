//! Formula error types
//!
//! Each stage has its own error type and they never overlap: malformed text
//! is a [`ParseError`], schema mismatches are [`ValidationError`]s, and
//! failures against one particular record are [`EvaluationError`]s.

use metricula_core::FieldType;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// What went wrong while reading formula text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input is empty or whitespace only
    EmptyFormula,
    /// Character that starts no token
    UnexpectedCharacter(char),
    /// Input ended after an operator or inside an open group
    UnexpectedEndOfInput,
    /// A complete expression was followed by more tokens
    TrailingTokens,
    /// A token appeared where an operand was required
    UnexpectedToken,
    /// Numeric literal too large to represent
    InvalidNumber,
    /// Groups or prefix operators nested past the depth limit
    NestingTooDeep,
    /// More tokens than the formula size limit
    FormulaTooLong,
}

/// Formula text could not be parsed
///
/// `position` is a byte offset into the source text, suitable for placing a
/// marker under the offending character in an editor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} at position {position}", describe(.kind))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: usize) -> Self {
        Self { kind, position }
    }
}

fn describe(kind: &ParseErrorKind) -> String {
    match kind {
        ParseErrorKind::EmptyFormula => "Formula is empty".into(),
        ParseErrorKind::UnexpectedCharacter(c) => format!("Unexpected character '{c}'"),
        ParseErrorKind::UnexpectedEndOfInput => "Unexpected end of input".into(),
        ParseErrorKind::TrailingTokens => "Unexpected input after expression".into(),
        ParseErrorKind::UnexpectedToken => "Expected a number, field or '('".into(),
        ParseErrorKind::InvalidNumber => "Number is out of range".into(),
        ParseErrorKind::NestingTooDeep => "Formula is nested too deeply".into(),
        ParseErrorKind::FormulaTooLong => "Formula is too long".into(),
    }
}

/// Field reference that does not fit the schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Name not declared by the schema, or declared ambiguously
    #[error("Unknown field '{name}'")]
    UnknownField { name: String },

    /// Field used in arithmetic is not numeric
    #[error("Field '{name}' is {actual}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: FieldType,
        actual: FieldType,
    },
}

impl ValidationError {
    /// Field the error is about
    pub fn name(&self) -> &str {
        match self {
            ValidationError::UnknownField { name } => name,
            ValidationError::TypeMismatch { name, .. } => name,
        }
    }
}

/// Runtime failure evaluating a formula against one record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// Schema declares the field but the record has no value for it
    #[error("Missing value for field '{name}'")]
    MissingValue { name: String },

    /// Record binds NaN or an infinity to the field
    #[error("Field '{name}' is not a finite number")]
    NonFiniteValue { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    /// Power without a real result, e.g. a negative base with a fractional exponent
    #[error("Invalid operation: {base} ^ {exponent} has no real result")]
    InvalidOperation { base: f64, exponent: f64 },

    /// Intermediate value exceeded the range of a double
    #[error("Numeric overflow")]
    Overflow,
}

/// Any failure of a stored formula, as kept in its last-error slot
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl From<Vec<ValidationError>> for FormulaError {
    fn from(errors: Vec<ValidationError>) -> Self {
        FormulaError::Validation(errors)
    }
}

fn join_validation(errors: &[ValidationError]) -> String {
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("Validation error: {}", messages.join("; "))
}
