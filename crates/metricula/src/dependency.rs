//! Field dependency tracking
//!
//! Records which formulas read which fields, so a change to a handful of
//! field values only re-evaluates the formulas that can observe it.

use ahash::{AHashMap, AHashSet};

use crate::formula::FormulaId;

/// Bidirectional index between fields and the formulas that reference them
#[derive(Debug, Default)]
pub struct FieldDependencies {
    /// Field → formulas that read it
    dependents: AHashMap<String, AHashSet<FormulaId>>,
    /// Formula → fields it reads
    precedents: AHashMap<FormulaId, AHashSet<String>>,
}

impl FieldDependencies {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency: `formula` reads `field`
    pub fn add_dependency(&mut self, field: &str, formula: &FormulaId) {
        self.dependents
            .entry(field.to_string())
            .or_default()
            .insert(formula.clone());
        self.precedents
            .entry(formula.clone())
            .or_default()
            .insert(field.to_string());
    }

    /// Replace every dependency of `formula` with `fields`
    pub fn set_dependencies<'a>(
        &mut self,
        formula: &FormulaId,
        fields: impl IntoIterator<Item = &'a str>,
    ) {
        self.clear_dependencies(formula);
        for field in fields {
            self.add_dependency(field, formula);
        }
    }

    /// Remove all dependencies for a formula
    pub fn clear_dependencies(&mut self, formula: &FormulaId) {
        if let Some(fields) = self.precedents.remove(formula) {
            for field in fields {
                if let Some(formulas) = self.dependents.get_mut(&field) {
                    formulas.remove(formula);
                    if formulas.is_empty() {
                        self.dependents.remove(&field);
                    }
                }
            }
        }
    }

    /// Formulas that read the given field
    pub fn get_dependents(&self, field: &str) -> impl Iterator<Item = &FormulaId> + '_ {
        self.dependents
            .get(field)
            .into_iter()
            .flat_map(|set| set.iter())
    }

    /// Fields the given formula reads
    pub fn get_precedents(&self, formula: &FormulaId) -> impl Iterator<Item = &str> + '_ {
        self.precedents
            .get(formula)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Every formula affected by a change to any of `fields`
    pub fn affected_by<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> AHashSet<FormulaId> {
        fields
            .into_iter()
            .flat_map(|field| self.get_dependents(field).cloned())
            .collect()
    }

    /// Clear the entire index
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
    }
}
