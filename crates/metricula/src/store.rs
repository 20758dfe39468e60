//! Formula store
//!
//! Owns the table of formulas and drives the parse → validate → evaluate
//! pipeline for them. The schema registry and the records formulas are
//! evaluated against are supplied by the caller; the store never fetches
//! either itself.
//!
//! # Example
//!
//! ```rust
//! use metricula::prelude::*;
//!
//! let schema = Schema::new(vec![Field::number("revenue"), Field::number("costs")]);
//! let mut store = FormulaStore::new(schema);
//!
//! let margin = store
//!     .create_with("Profit Margin", "", "(revenue - costs) / revenue * 100")
//!     .unwrap();
//!
//! let record: Record = [("revenue", 200.0), ("costs", 150.0)].into_iter().collect();
//! store.recompute_all(record);
//! assert_eq!(store.get(&margin).unwrap().last_result(), Some(25.0));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use metricula_core::{Record, Schema, SchemaRegistry};
use metricula_formula::{
    evaluate, parse_formula, validate, EvaluationError, Expr, FormulaError, ParseError,
};

use crate::dependency::FieldDependencies;
use crate::error::{Result, StoreError};
use crate::formula::{Compiled, Formula, FormulaId};
use crate::options::StoreOptions;
use crate::persistence::{FormulaRepository, PersistedFormula};
use crate::result::MetricResult;

/// Counts from a recompute pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecomputeStats {
    /// Formulas considered
    pub formulas: usize,
    /// Formulas evaluated (including memoized outcomes)
    pub evaluated: usize,
    /// Outcomes reused from the memo
    pub cached: usize,
    /// Formulas whose outcome is an error
    pub errors: usize,
    /// Formulas without a validated expression
    pub skipped: usize,
}

/// How one formula fared in a recompute pass
enum Recomputed {
    Evaluated { cached: bool, ok: bool },
    Skipped,
}

impl RecomputeStats {
    fn record(&mut self, outcome: Recomputed) {
        self.formulas += 1;
        match outcome {
            Recomputed::Evaluated { cached, ok } => {
                self.evaluated += 1;
                if cached {
                    self.cached += 1;
                }
                if !ok {
                    self.errors += 1;
                }
            }
            Recomputed::Skipped => self.skipped += 1,
        }
    }
}

/// In-memory table of named formulas
pub struct FormulaStore {
    options: StoreOptions,
    registry: Box<dyn SchemaRegistry>,
    /// Snapshot from construction or the last schema refresh
    schema: Arc<Schema>,
    /// Record formulas are evaluated against
    record: Record,
    record_fingerprint: u64,
    formulas: HashMap<FormulaId, Formula>,
    /// Creation order
    order: Vec<FormulaId>,
    dependencies: FieldDependencies,
    /// Source text → parse outcome
    parse_cache: HashMap<String, std::result::Result<Expr, ParseError>>,
    /// Formula → (record fingerprint, outcome) of its last evaluation
    memo: HashMap<FormulaId, (u64, std::result::Result<f64, EvaluationError>)>,
    next_id: u64,
}

impl FormulaStore {
    /// Create an empty store reading schemas from `registry`
    pub fn new(registry: impl SchemaRegistry + 'static) -> Self {
        Self::with_options(registry, StoreOptions::default())
    }

    /// Create an empty store with custom options
    pub fn with_options(registry: impl SchemaRegistry + 'static, options: StoreOptions) -> Self {
        let schema = registry.snapshot();
        let record = Record::new();
        Self {
            options,
            registry: Box::new(registry),
            schema,
            record_fingerprint: record.fingerprint(),
            record,
            formulas: HashMap::new(),
            order: Vec::new(),
            dependencies: FieldDependencies::new(),
            parse_cache: HashMap::new(),
            memo: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Schema snapshot taken at construction or by the last `refresh_schema`
    ///
    /// Edits validate against a fresh registry snapshot without replacing
    /// this one; other formulas keep the validation they had.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Record formulas are currently evaluated against
    pub fn record(&self) -> &Record {
        &self.record
    }

    // === Table operations ===

    /// Create a formula with the default name and empty source text
    pub fn create(&mut self) -> FormulaId {
        let id = self.generate_id();
        let formula = Formula::new(id.clone(), self.options.default_name.clone());
        self.formulas.insert(id.clone(), formula);
        self.order.push(id.clone());
        tracing::debug!(%id, "created formula");
        id
    }

    /// Create a formula and compile its source text
    pub fn create_with(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        source_text: &str,
    ) -> Result<FormulaId> {
        let id = self.create();
        {
            let formula = self.formula_mut(&id)?;
            formula.name = name.into();
            formula.description = description.into();
        }
        self.set_source_text(&id, source_text)?;
        Ok(id)
    }

    pub fn get(&self, id: &FormulaId) -> Option<&Formula> {
        self.formulas.get(id)
    }

    pub fn contains(&self, id: &FormulaId) -> bool {
        self.formulas.contains_key(id)
    }

    /// Formulas in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Formula> {
        self.order.iter().filter_map(|id| self.formulas.get(id))
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn rename(&mut self, id: &FormulaId, name: impl Into<String>) -> Result<()> {
        let formula = self.formula_mut(id)?;
        formula.name = name.into();
        tracing::debug!(%id, name = %formula.name, "renamed formula");
        Ok(())
    }

    pub fn set_description(
        &mut self,
        id: &FormulaId,
        description: impl Into<String>,
    ) -> Result<()> {
        self.formula_mut(id)?.description = description.into();
        Ok(())
    }

    /// Remove a formula; irreversible
    pub fn delete(&mut self, id: &FormulaId) -> Result<Formula> {
        let formula = self
            .formulas
            .remove(id)
            .ok_or_else(|| StoreError::UnknownFormula(id.clone()))?;
        self.order.retain(|other| other != id);
        self.dependencies.clear_dependencies(id);
        self.memo.remove(id);
        tracing::debug!(%id, "deleted formula");
        Ok(formula)
    }

    // === Compilation ===

    /// Replace a formula's source text and recompile it
    ///
    /// - Parse failure: the error is recorded and both the compiled tree and
    ///   the last result are cleared.
    /// - Validation failure: the errors are recorded and the previous result
    ///   stays visible until the text is corrected.
    /// - Otherwise the formula is evaluated against the current record.
    ///
    /// Only an unknown `id` is an error of this call.
    pub fn set_source_text(&mut self, id: &FormulaId, text: &str) -> Result<()> {
        if !self.formulas.contains_key(id) {
            return Err(StoreError::UnknownFormula(id.clone()));
        }
        let parsed = self.parse_cached(text);

        self.memo.remove(id);
        let formula = self.formula_mut(id)?;
        formula.source_text = text.to_string();

        match parsed {
            Err(err) => {
                tracing::debug!(%id, error = %err, "formula failed to parse");
                formula.compiled = None;
                formula.last_result = None;
                formula.last_error = Some(FormulaError::Parse(err));
                self.dependencies.clear_dependencies(id);
            }
            Ok(expr) => {
                self.dependencies.set_dependencies(id, expr.field_refs());
                let schema = self.registry.snapshot();
                self.compile(id, expr, &schema);
            }
        }
        Ok(())
    }

    /// Validate a parsed tree for `id` and evaluate it
    fn compile(&mut self, id: &FormulaId, expr: Expr, schema: &Schema) {
        let validated = validate(&expr, schema);
        let Some(formula) = self.formulas.get_mut(id) else {
            return;
        };

        match validated {
            Err(errors) => {
                tracing::debug!(%id, errors = errors.len(), "formula failed validation");
                formula.compiled = Some(Compiled::Parsed(expr));
                formula.last_error = Some(FormulaError::Validation(errors));
            }
            Ok(validated) => {
                formula.compiled = Some(Compiled::Validated(validated));
                formula.last_error = None;
                self.recompute(id);
            }
        }
    }

    fn parse_cached(&mut self, text: &str) -> std::result::Result<Expr, ParseError> {
        if let Some(parsed) = self.parse_cache.get(text) {
            return parsed.clone();
        }
        let parsed = parse_formula(text);
        if self.options.parse_cache_capacity > 0 {
            if self.parse_cache.len() >= self.options.parse_cache_capacity {
                self.parse_cache.clear();
            }
            self.parse_cache.insert(text.to_string(), parsed.clone());
        }
        parsed
    }

    // === Recomputation ===

    /// Evaluate every formula against a new record
    ///
    /// Formulas are independent: each one's result fields are replaced
    /// together, and a failure in one never touches another.
    pub fn recompute_all(&mut self, record: Record) -> RecomputeStats {
        self.bind_record(record);

        let mut stats = RecomputeStats::default();
        for id in self.order.clone() {
            let outcome = self.recompute(&id);
            stats.record(outcome);
        }

        tracing::info!(
            formulas = stats.formulas,
            evaluated = stats.evaluated,
            cached = stats.cached,
            errors = stats.errors,
            "recomputed all formulas"
        );
        stats
    }

    /// Merge changed field values into the bound record
    ///
    /// Only formulas that read a field whose value actually changed are
    /// re-evaluated.
    pub fn update_fields(&mut self, changes: &Record) -> RecomputeStats {
        let mut record = self.record.clone();
        let changed = record.merge(changes);
        self.bind_record(record);

        let affected = self
            .dependencies
            .affected_by(changed.iter().map(String::as_str));

        let mut stats = RecomputeStats::default();
        for id in self.order.clone() {
            if affected.contains(&id) {
                let outcome = self.recompute(&id);
                stats.record(outcome);
            }
        }

        tracing::info!(
            changed = changed.len(),
            formulas = stats.formulas,
            errors = stats.errors,
            "updated fields"
        );
        stats
    }

    /// Take a fresh schema snapshot and re-validate every parsed formula
    pub fn refresh_schema(&mut self) -> RecomputeStats {
        self.schema = self.registry.snapshot();
        self.memo.clear();
        let schema = Arc::clone(&self.schema);

        let mut stats = RecomputeStats::default();
        for id in self.order.clone() {
            let expr = self
                .formulas
                .get(&id)
                .and_then(Formula::compiled_expression)
                .cloned();
            match expr {
                Some(expr) => {
                    self.compile(&id, expr, &schema);
                    let ok = self
                        .formulas
                        .get(&id)
                        .is_some_and(|f| f.last_error.is_none());
                    stats.record(Recomputed::Evaluated { cached: false, ok });
                }
                None => stats.record(Recomputed::Skipped),
            }
        }

        tracing::info!(
            fields = self.schema.len(),
            formulas = stats.formulas,
            errors = stats.errors,
            "refreshed schema"
        );
        stats
    }

    fn bind_record(&mut self, record: Record) {
        self.record_fingerprint = record.fingerprint();
        self.record = record;
    }

    /// Re-evaluate one formula against the bound record
    fn recompute(&mut self, id: &FormulaId) -> Recomputed {
        let fingerprint = self.record_fingerprint;
        let Some(formula) = self.formulas.get_mut(id) else {
            return Recomputed::Skipped;
        };
        let Some(validated) = formula.validated() else {
            return Recomputed::Skipped;
        };

        let (outcome, cached) = match self.memo.get(id) {
            Some((memo_fingerprint, outcome))
                if self.options.memoize_results && *memo_fingerprint == fingerprint =>
            {
                (outcome.clone(), true)
            }
            _ => (evaluate(validated, &self.record), false),
        };

        let ok = outcome.is_ok();
        tracing::trace!(%id, ?outcome, cached, "evaluated formula");
        if self.options.memoize_results {
            self.memo.insert(id.clone(), (fingerprint, outcome.clone()));
        }
        formula.apply_outcome(outcome);

        Recomputed::Evaluated { cached, ok }
    }

    // === Results ===

    /// Chart-facing result of one formula
    pub fn result(&self, id: &FormulaId) -> Option<MetricResult> {
        self.formulas.get(id).map(Formula::to_result)
    }

    /// Chart-facing results of every formula, in creation order
    pub fn results(&self) -> Vec<MetricResult> {
        self.iter().map(Formula::to_result).collect()
    }

    // === Persistence ===

    /// Persist a formula's name, description and source text
    ///
    /// Refuses formulas without a name or expression.
    pub fn save(&self, id: &FormulaId, repository: &mut dyn FormulaRepository) -> Result<()> {
        let formula = self
            .formulas
            .get(id)
            .ok_or_else(|| StoreError::UnknownFormula(id.clone()))?;
        if formula.name.trim().is_empty() {
            return Err(StoreError::NameRequired);
        }
        if formula.source_text.trim().is_empty() {
            return Err(StoreError::SourceRequired);
        }
        repository.save(id.as_str(), formula.to_persisted())?;
        tracing::debug!(%id, "saved formula");
        Ok(())
    }

    /// Load a persisted formula into the table, replacing any with the same id
    pub fn load(&mut self, id: &FormulaId, repository: &dyn FormulaRepository) -> Result<()> {
        let persisted = repository
            .load(id.as_str())?
            .ok_or_else(|| StoreError::UnknownFormula(id.clone()))?;
        self.insert_persisted(persisted)?;
        Ok(())
    }

    /// Insert or replace a formula from its persisted form and compile it
    pub fn insert_persisted(&mut self, persisted: PersistedFormula) -> Result<FormulaId> {
        let id = FormulaId::new(persisted.id);
        if !self.formulas.contains_key(&id) {
            self.formulas
                .insert(id.clone(), Formula::new(id.clone(), String::new()));
            self.order.push(id.clone());
        }
        {
            let formula = self.formula_mut(&id)?;
            formula.name = persisted.name;
            formula.description = persisted.description;
        }
        self.set_source_text(&id, &persisted.source_text)?;
        Ok(id)
    }

    // === Helpers ===

    fn formula_mut(&mut self, id: &FormulaId) -> Result<&mut Formula> {
        self.formulas
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownFormula(id.clone()))
    }

    fn generate_id(&mut self) -> FormulaId {
        loop {
            let id = FormulaId::new(format!("formula-{}", self.next_id));
            self.next_id += 1;
            if !self.formulas.contains_key(&id) {
                return id;
            }
        }
    }
}

impl std::fmt::Debug for FormulaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaStore")
            .field("options", &self.options)
            .field("schema", &self.schema)
            .field("record", &self.record)
            .field("formulas", &self.order)
            .finish_non_exhaustive()
    }
}
