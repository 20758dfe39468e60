//! Error types for metricula-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in metricula-core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Field type name other than `number` or `string`
    #[error("Invalid field type: {0}")]
    InvalidFieldType(String),

    /// Field not present in a schema
    #[error("Unknown field: {0}")]
    UnknownField(String),
}
