//! Object catalog: resolves record ids to stored object keys.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored object as known to the catalog.
///
/// `url` and `expires` are filled in when a signed URL is issued for the
/// record and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub expires: Option<DateTime<Utc>>,
}

impl ObjectRecord {
    pub fn new(id: impl Into<String>, key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            name: name.into(),
            url: None,
            expires: None,
        }
    }

    /// A record standing for a bare object key, outside any catalog.
    pub fn for_key(key: impl Into<String>) -> Self {
        Self::new("", key, "")
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("No object with id {0:?}")]
    NotFound(String),

    #[error("Could not read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Lookup of stored objects by id.
pub trait Catalog: Send + Sync {
    fn resolve(&self, id: &str) -> Result<ObjectRecord, CatalogError>;
}

/// In-memory catalog, typically loaded from a JSON array of records.
///
/// Built once at startup and read-only afterwards; share it by reference.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    records: HashMap<String, ObjectRecord>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<ObjectRecord> = serde_json::from_str(&content)?;
        Ok(records.into_iter().collect())
    }

    /// Insert `record`, returning the one it replaced.
    pub fn insert(&mut self, record: ObjectRecord) -> Option<ObjectRecord> {
        self.records.insert(record.id.clone(), record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<ObjectRecord> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = ObjectRecord>>(iter: I) -> Self {
        Self {
            records: iter
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        }
    }
}

impl Catalog for MemoryCatalog {
    fn resolve(&self, id: &str) -> Result<ObjectRecord, CatalogError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }
}
