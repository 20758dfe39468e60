//! Field value records
//!
//! A [`Record`] binds field names to numbers. It is the input formulas are
//! evaluated against: one row of a data source, or a set of pre-aggregated
//! figures such as `currentRevenue` / `previousRevenue`.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use ahash::AHasher;

/// Mapping from field name to numeric value
///
/// Entries are kept sorted by name so that iteration order, and therefore
/// [`fingerprint`](Record::fingerprint), depends only on the contents.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Record {
    values: BTreeMap<String, f64>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to a field, if any
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Bind a value, returning the previous one
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    /// Remove a binding
    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.values.remove(name)
    }

    /// Apply `changes` on top of this record
    ///
    /// Returns the names whose bound value actually changed, in name order.
    /// Values are compared by bit pattern, so rebinding the same number is
    /// not a change.
    pub fn merge(&mut self, changes: &Record) -> Vec<String> {
        let mut changed = Vec::new();
        for (name, &value) in &changes.values {
            let previous = self.values.insert(name.clone(), value);
            if previous.map(f64::to_bits) != Some(value.to_bits()) {
                changed.push(name.clone());
            }
        }
        changed
    }

    /// Iterate over bindings in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Content hash used as a cache key for evaluation results
    ///
    /// Uses fixed hasher keys: equal records yield equal fingerprints across
    /// calls and processes.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = AHasher::default();
        self.values.len().hash(&mut hasher);
        for (name, value) in &self.values {
            name.hash(&mut hasher);
            value.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<K: Into<String>> Extend<(K, f64)> for Record {
    fn extend<I: IntoIterator<Item = (K, f64)>>(&mut self, iter: I) {
        self.values.extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
    }
}
