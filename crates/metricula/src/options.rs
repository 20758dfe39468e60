//! Formula store configuration

use serde::{Deserialize, Serialize};

/// Options for a [`FormulaStore`](crate::FormulaStore)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Name given to formulas made by `create()` (default: "New Formula")
    pub default_name: String,
    /// Reuse a formula's last outcome when the bound record is unchanged (default: true)
    pub memoize_results: bool,
    /// Parsed trees kept per distinct source text; the cache is emptied when full (default: 128)
    pub parse_cache_capacity: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_name: "New Formula".to_string(),
            memoize_results: true,
            parse_cache_capacity: 128,
        }
    }
}
