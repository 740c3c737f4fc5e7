//! Keyed lookup tables of domain records.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::SourceError;

/// Read-only access to domain records, grouped into named tables.
///
/// Records are opaque JSON values; presentation code decides which fields
/// it cares about. Table and key enumeration is sorted so that document
/// enumeration built on top of it is stable across runs.
pub trait DataProvider: Send + Sync {
    /// Names of all tables, sorted.
    fn table_names(&self) -> Vec<String>;

    /// Keys of all records in `table`, sorted. Empty for an unknown table.
    fn keys(&self, table: &str) -> Vec<String>;

    /// Look up a single record.
    fn lookup(&self, table: &str, key: &str) -> Option<&Value>;
}

/// Data provider with no tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyData;

impl DataProvider for EmptyData {
    fn table_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn keys(&self, _table: &str) -> Vec<String> {
        Vec::new()
    }

    fn lookup(&self, _table: &str, _key: &str) -> Option<&Value> {
        None
    }
}

/// Data provider backed by a JSON document of the shape
/// `{"tables": {"<table>": {"<key>": <record>}}}`.
#[derive(Debug, Default, Deserialize)]
pub struct JsonDataSet {
    #[serde(default)]
    tables: BTreeMap<String, BTreeMap<String, Value>>,
}

impl JsonDataSet {
    /// Parse a data set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a data set from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let json = std::fs::read_to_string(path).map_err(|e| SourceError::io(path, e))?;
        let data = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            tables = data.tables.len(),
            "Loaded data set"
        );
        Ok(data)
    }
}

impl DataProvider for JsonDataSet {
    fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    fn keys(&self, table: &str) -> Vec<String> {
        self.tables
            .get(table)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lookup(&self, table: &str, key: &str) -> Option<&Value> {
        self.tables.get(table)?.get(key)
    }
}
