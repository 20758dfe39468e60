//! Result surface consumed by charts and KPI cards

use serde::{Deserialize, Serialize};

/// A metric's current value, or why it has none
///
/// Renderers show `value` when `error` is `None` and the error message in
/// place of the figure otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub name: String,
    pub value: Option<f64>,
    pub error: Option<String>,
}

impl MetricResult {
    /// Whether a renderer should display the value
    pub fn is_displayable(&self) -> bool {
        self.error.is_none() && self.value.is_some()
    }
}
