//! Descriptor lookup.
//!
//! The gateway does not own connection records. It asks a
//! [`DescriptorLookup`] for one by id on every request and treats the answer
//! as read-only.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use shellgate_common::{ConnectionDescriptor, StoreError};
use tracing::{debug, info};

#[async_trait]
pub trait DescriptorLookup: Send + Sync {
    /// `Ok(None)` when no record has this id.
    async fn find(&self, id: &str) -> Result<Option<ConnectionDescriptor>, StoreError>;
}

/// Records held in memory, usually loaded once from a TOML file of
/// `[[connection]]` tables.
#[derive(Default)]
pub struct StaticLookup {
    records: HashMap<String, ConnectionDescriptor>,
}

#[derive(Deserialize)]
struct RecordFile {
    #[serde(default, rename = "connection")]
    connections: Vec<ConnectionDescriptor>,
}

impl StaticLookup {
    pub fn new(records: impl IntoIterator<Item = ConnectionDescriptor>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, StoreError> {
        let file: RecordFile = toml::from_str(content)
            .map_err(|e| StoreError::Unavailable(format!("invalid records file: {e}")))?;

        let mut records = HashMap::with_capacity(file.connections.len());
        for record in file.connections {
            if record.host.trim().is_empty() {
                return Err(StoreError::InvalidRecord {
                    id: record.id,
                    reason: "host is empty".into(),
                });
            }
            if records.contains_key(&record.id) {
                return Err(StoreError::InvalidRecord {
                    id: record.id,
                    reason: "duplicate id".into(),
                });
            }
            records.insert(record.id.clone(), record);
        }
        Ok(Self { records })
    }

    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let lookup = Self::from_toml(&content)?;
        info!(path = %path.display(), records = lookup.len(), "loaded connection records");
        Ok(lookup)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DescriptorLookup for StaticLookup {
    async fn find(&self, id: &str) -> Result<Option<ConnectionDescriptor>, StoreError> {
        let found = self.records.get(id).cloned();
        debug!(record = id, found = found.is_some(), "descriptor lookup");
        Ok(found)
    }
}
