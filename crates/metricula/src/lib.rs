//! # metricula
//!
//! Custom metric formulas for dashboards.
//!
//! Users write formulas such as `(revenue - costs) / revenue * 100` over the
//! fields of a data source. This crate parses and validates them, evaluates
//! them against records, keeps them in a [`FormulaStore`], and exposes each
//! formula's outcome as a [`MetricResult`] for charts and KPI cards.
//!
//! ## Features
//!
//! - Text formulas over `+ - * / ^`, parentheses, numbers and field names
//! - Every unknown or mistyped field reported in one pass
//! - Division by zero, overflow and missing values reported as errors, never
//!   as `NaN` or infinities
//! - Incremental re-evaluation when individual field values change
//! - Persistence of formula definitions behind a small repository trait
//!
//! ## Example
//!
//! ```rust
//! use metricula::prelude::*;
//!
//! let schema = Schema::new(vec![
//!     Field::number("currentRevenue").with_description("Current period revenue"),
//!     Field::number("previousRevenue").with_description("Previous period revenue"),
//! ]);
//! let mut store = FormulaStore::new(schema);
//!
//! let growth = store
//!     .create_with(
//!         "Revenue Growth",
//!         "Revenue growth percentage between periods",
//!         "(currentRevenue - previousRevenue) / previousRevenue * 100",
//!     )
//!     .unwrap();
//!
//! let record: Record = [("currentRevenue", 1125.0), ("previousRevenue", 1000.0)]
//!     .into_iter()
//!     .collect();
//! store.recompute_all(record);
//!
//! let result = store.result(&growth).unwrap();
//! assert_eq!(result.value, Some(12.5));
//! assert_eq!(result.error, None);
//! ```

pub mod dependency;
pub mod error;
pub mod formula;
pub mod options;
pub mod persistence;
pub mod prelude;
pub mod result;
pub mod store;

pub use error::{Result, StoreError};
pub use formula::{Formula, FormulaId};
pub use options::StoreOptions;
pub use persistence::{
    FormulaRepository, JsonFileRepository, MemoryRepository, PersistedFormula, RepositoryError,
};
pub use result::MetricResult;
pub use store::{FormulaStore, RecomputeStats};

// Re-export core types
pub use metricula_core::{Field, FieldType, Record, Schema, SchemaRegistry, SharedSchema};

// Re-export formula engine
pub use metricula_formula::{
    evaluate, parse_formula, tokenize, validate, BinaryOperator, EvaluationError, Expr,
    FormulaError, ParseError, ParseErrorKind, Token, TokenKind, UnaryOperator, ValidatedExpr,
    ValidationError,
};
