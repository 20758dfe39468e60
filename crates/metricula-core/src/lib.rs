//! # metricula-core
//!
//! Core data types shared by the metricula crates:
//! - [`Field`], [`FieldType`] and [`Schema`] - the set of named fields a formula may reference
//! - [`SchemaRegistry`] - the injected source of schema snapshots
//! - [`Record`] - a binding from field names to numeric values
//!
//! ## Example
//!
//! ```rust
//! use metricula_core::{Field, FieldType, Record, Schema};
//!
//! let schema = Schema::new(vec![
//!     Field::number("revenue"),
//!     Field::number("costs"),
//!     Field::new("region", FieldType::String),
//! ]);
//! assert_eq!(schema.lookup("revenue").unwrap().field_type, FieldType::Number);
//!
//! let record: Record = [("revenue", 1200.0), ("costs", 900.0)].into_iter().collect();
//! assert_eq!(record.get("costs"), Some(900.0));
//! ```

pub mod error;
pub mod record;
pub mod schema;

pub use error::{Error, Result};
pub use record::Record;
pub use schema::{Field, FieldType, Schema, SchemaRegistry, SharedSchema};
