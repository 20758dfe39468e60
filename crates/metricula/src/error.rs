//! Error types for the formula store

use thiserror::Error;

use crate::formula::FormulaId;
use crate::persistence::RepositoryError;

/// Result type alias using [`StoreError`]
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from formula store operations
///
/// Problems with a formula's own text or values are not errors of the store;
/// they are recorded on the formula as its last error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No formula with this id
    #[error("Unknown formula: {0}")]
    UnknownFormula(FormulaId),

    /// Saving requires a non-empty name
    #[error("Formula name is required")]
    NameRequired,

    /// Saving requires a non-empty expression
    #[error("Formula expression is required")]
    SourceRequired,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
