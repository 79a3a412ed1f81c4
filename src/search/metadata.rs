//! Metadata store resolving index ordinals to descriptive records.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

use crate::error::ServiceError;

/// Position of a vector within its index; the join key into metadata.
pub type Ordinal = u32;

fn unknown() -> String {
    "Unknown".to_string()
}

/// Treat an explicit `null` like an absent field.
fn or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown))
}

/// A single record attached to an indexed vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default = "unknown", deserialize_with = "or_unknown")]
    pub startup: String,
    #[serde(default = "unknown", deserialize_with = "or_unknown")]
    pub source_type: String,
    pub text: String,
}

/// Immutable ordinal -> record mapping for one dataset.
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    records: HashMap<Ordinal, Record>,
}

impl MetadataStore {
    /// Load a JSON object keyed by string-encoded ordinals.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();

        info!(path = %path.display(), "Loading metadata");

        let raw = std::fs::read_to_string(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to read metadata file");
            ServiceError::MetadataLoad(format!("{}: {}", path.display(), e))
        })?;

        let store = Self::from_json_str(&raw)
            .map_err(|e| ServiceError::MetadataLoad(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), records = store.len(), "Metadata loaded");

        Ok(store)
    }

    /// Parse metadata from a JSON string such as `{"0": {"text": "..."}}`.
    pub fn from_json_str(raw: &str) -> Result<Self, ServiceError> {
        let parsed: HashMap<String, Record> =
            serde_json::from_str(raw).map_err(|e| ServiceError::MetadataLoad(e.to_string()))?;

        let mut records = HashMap::with_capacity(parsed.len());
        for (key, record) in parsed {
            // Keys must be the exact decimal form of the ordinal, so "00" or "+1" never alias
            let ordinal = key
                .parse::<Ordinal>()
                .ok()
                .filter(|ordinal| ordinal.to_string() == key)
                .ok_or_else(|| {
                    ServiceError::MetadataLoad(format!("key {:?} is not an ordinal", key))
                })?;
            records.insert(ordinal, record);
        }

        Ok(Self { records })
    }

    /// Look up a record, failing if the ordinal has no entry.
    pub fn get(&self, ordinal: Ordinal) -> Result<&Record, ServiceError> {
        self.records
            .get(&ordinal)
            .ok_or(ServiceError::MetadataMissing(ordinal))
    }

    pub fn contains(&self, ordinal: Ordinal) -> bool {
        self.records.contains_key(&ordinal)
    }

    /// Records in ascending ordinal order.
    pub fn iter_sorted(&self) -> Vec<(Ordinal, &Record)> {
        let mut entries: Vec<_> = self.records.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(ordinal, _)| *ordinal);
        entries
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(Ordinal, Record)> for MetadataStore {
    fn from_iter<I: IntoIterator<Item = (Ordinal, Record)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
