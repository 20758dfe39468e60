//! Prelude module - common imports for metricula users
//!
//! ```rust
//! use metricula::prelude::*;
//! ```

pub use crate::{
    // Engine
    evaluate,
    parse_formula,
    validate,
    // Errors
    EvaluationError,
    // Schema and records
    Field,
    FieldType,
    // Store
    Formula,
    FormulaError,
    FormulaId,
    FormulaRepository,
    FormulaStore,
    MemoryRepository,
    MetricResult,
    ParseError,
    Record,
    Schema,
    SchemaRegistry,
    SharedSchema,
    StoreOptions,
    ValidationError,
};
