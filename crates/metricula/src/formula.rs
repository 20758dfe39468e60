//! Stored formula records

use std::fmt;

use metricula_formula::{EvaluationError, Expr, FormulaError, ValidatedExpr};
use serde::{Deserialize, Serialize};

use crate::persistence::PersistedFormula;
use crate::result::MetricResult;

/// Opaque formula identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaId(String);

impl FormulaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormulaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FormulaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FormulaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Compiled form of the source text
#[derive(Debug, Clone)]
pub(crate) enum Compiled {
    /// Parsed, but failed validation against the schema
    Parsed(Expr),
    /// Parsed and validated
    Validated(ValidatedExpr),
}

/// A named custom metric
///
/// The compiled tree and last outcome are derived from `source_text` and are
/// never persisted.
#[derive(Debug, Clone)]
pub struct Formula {
    pub(crate) id: FormulaId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) source_text: String,
    pub(crate) compiled: Option<Compiled>,
    pub(crate) last_result: Option<f64>,
    pub(crate) last_error: Option<FormulaError>,
}

impl Formula {
    pub(crate) fn new(id: FormulaId, name: String) -> Self {
        Self {
            id,
            name,
            description: String::new(),
            source_text: String::new(),
            compiled: None,
            last_result: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> &FormulaId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Parsed tree; `None` exactly when the source text fails to parse
    pub fn compiled_expression(&self) -> Option<&Expr> {
        match &self.compiled {
            Some(Compiled::Parsed(expr)) => Some(expr),
            Some(Compiled::Validated(validated)) => Some(validated.expr()),
            None => None,
        }
    }

    /// Validated tree, if the source text parsed and fits the schema
    pub fn validated(&self) -> Option<&ValidatedExpr> {
        match &self.compiled {
            Some(Compiled::Validated(validated)) => Some(validated),
            _ => None,
        }
    }

    pub fn last_result(&self) -> Option<f64> {
        self.last_result
    }

    pub fn last_error(&self) -> Option<&FormulaError> {
        self.last_error.as_ref()
    }

    /// Replace the result fields together with one evaluation outcome
    pub(crate) fn apply_outcome(&mut self, outcome: Result<f64, EvaluationError>) {
        match outcome {
            Ok(value) => {
                self.last_result = Some(value);
                self.last_error = None;
            }
            Err(err) => {
                self.last_result = None;
                self.last_error = Some(FormulaError::Evaluation(err));
            }
        }
    }

    /// Storable fields of this formula
    pub fn to_persisted(&self) -> PersistedFormula {
        PersistedFormula {
            id: self.id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            source_text: self.source_text.clone(),
        }
    }

    /// Value as shown on a chart or KPI card
    pub fn to_result(&self) -> MetricResult {
        MetricResult {
            name: self.name.clone(),
            value: self.last_result,
            error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}
