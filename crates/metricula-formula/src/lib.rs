//! # metricula-formula
//!
//! Formula engine for custom dashboard metrics.
//!
//! This crate provides:
//! - Tokenizing and parsing (text → [`Expr`])
//! - Validation against a field [`Schema`](metricula_core::Schema) (→ [`ValidatedExpr`])
//! - Numeric evaluation against a [`Record`](metricula_core::Record)
//!
//! ## Example
//!
//! ```rust
//! use metricula_core::{Field, Record, Schema};
//! use metricula_formula::{evaluate, parse_formula, validate};
//!
//! let schema = Schema::new(vec![Field::number("revenue"), Field::number("costs")]);
//! let ast = parse_formula("(revenue - costs) / revenue * 100").unwrap();
//! let validated = validate(&ast, &schema).unwrap();
//!
//! let record: Record = [("revenue", 200.0), ("costs", 150.0)].into_iter().collect();
//! assert_eq!(evaluate(&validated, &record), Ok(25.0));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod validator;

pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use error::{
    EvaluationError, FormulaError, FormulaResult, ParseError, ParseErrorKind, ValidationError,
};
pub use evaluator::evaluate;
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse_formula, MAX_FORMULA_TOKENS, MAX_NESTING_DEPTH};
pub use validator::{validate, ValidatedExpr};
