//! Workspace files for `metricula report`
//!
//! A workspace bundles a schema, a set of formulas and one record:
//!
//! ```json
//! {
//!   "schema": [{ "name": "revenue", "type": "number" }],
//!   "formulas": [{ "name": "Double", "sourceText": "revenue * 2" }],
//!   "record": { "revenue": 21 },
//!   "options": { "memoize_results": false }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use metricula::{FormulaStore, MetricResult, Record, Schema, StoreOptions};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Workspace {
    pub schema: Schema,
    #[serde(default)]
    pub formulas: Vec<WorkspaceFormula>,
    #[serde(default)]
    pub record: Record,
    #[serde(default)]
    pub options: StoreOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFormula {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_text: String,
}

impl Workspace {
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse workspace '{}'", path.display()))
    }

    /// Evaluate every formula against the record, in file order
    pub fn report(self) -> Result<Vec<MetricResult>> {
        let mut store = FormulaStore::with_options(self.schema, self.options);
        for formula in self.formulas {
            store
                .create_with(formula.name, formula.description, &formula.source_text)
                .context("Failed to add formula")?;
        }

        let stats = store.recompute_all(self.record);
        tracing::info!(
            formulas = stats.formulas,
            errors = stats.errors,
            skipped = stats.skipped,
            "report computed"
        );
        Ok(store.results())
    }
}
