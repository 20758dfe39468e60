//! Formula persistence
//!
//! Only the four user-authored string fields are stored. Compiled trees and
//! results are recomputed after loading.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stored layout of a formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedFormula {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source_text: String,
}

/// Errors from a formula repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value store for persisted formulas
pub trait FormulaRepository {
    /// Store a formula under `id`, replacing any previous record
    fn save(&mut self, id: &str, record: PersistedFormula) -> Result<(), RepositoryError>;

    /// Fetch the formula stored under `id`
    fn load(&self, id: &str) -> Result<Option<PersistedFormula>, RepositoryError>;
}

/// In-memory repository
#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    records: HashMap<String, PersistedFormula>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FormulaRepository for MemoryRepository {
    fn save(&mut self, id: &str, record: PersistedFormula) -> Result<(), RepositoryError> {
        self.records.insert(id.to_string(), record);
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<PersistedFormula>, RepositoryError> {
        Ok(self.records.get(id).cloned())
    }
}

/// Repository backed by one JSON object file, keyed by formula id
///
/// A missing file reads as an empty repository.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored formulas, ordered by id
    pub fn load_all(&self) -> Result<Vec<PersistedFormula>, RepositoryError> {
        Ok(self.read()?.into_values().collect())
    }

    fn read(&self) -> Result<BTreeMap<String, PersistedFormula>, RepositoryError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn write(&self, records: &BTreeMap<String, PersistedFormula>) -> Result<(), RepositoryError> {
        let mut writer = BufWriter::new(fs::File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush()?;
        Ok(())
    }
}

impl FormulaRepository for JsonFileRepository {
    fn save(&mut self, id: &str, record: PersistedFormula) -> Result<(), RepositoryError> {
        let mut records = self.read()?;
        records.insert(id.to_string(), record);
        self.write(&records)?;
        tracing::debug!(id, path = %self.path.display(), "saved formula");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<PersistedFormula>, RepositoryError> {
        Ok(self.read()?.remove(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> PersistedFormula {
        PersistedFormula {
            id: "margin".into(),
            name: "Profit Margin".into(),
            description: "Profit as a percentage of revenue".into(),
            source_text: "(revenue - costs) / revenue * 100".into(),
        }
    }

    #[test]
    fn test_layout() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "margin",
                "name": "Profit Margin",
                "description": "Profit as a percentage of revenue",
                "sourceText": "(revenue - costs) / revenue * 100",
            })
        );
    }

    #[test]
    fn test_memory_repository() {
        let mut repo = MemoryRepository::new();
        repo.save("margin", sample()).unwrap();

        assert_eq!(repo.load("margin").unwrap(), Some(sample()));
        assert_eq!(repo.load("growth").unwrap(), None);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_json_file_repository() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = JsonFileRepository::new(dir.path().join("formulas.json"));

        assert_eq!(repo.load("margin").unwrap(), None);

        repo.save("margin", sample()).unwrap();
        let mut growth = sample();
        growth.id = "growth".into();
        growth.source_text = "currentRevenue - previousRevenue".into();
        repo.save("growth", growth.clone()).unwrap();

        let reopened = JsonFileRepository::new(repo.path());
        assert_eq!(reopened.load("margin").unwrap(), Some(sample()));
        assert_eq!(reopened.load_all().unwrap(), vec![growth, sample()]);
    }
}
