//! In-memory cluster registry.
//!
//! Stores all records in a `BTreeMap` behind a `RwLock`. Nothing is
//! persisted; all clusters are lost when the process exits. Use this for
//! development and for tests that need a real registry without a database.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{ClusterRecord, ClusterRegistry, RegistryError};

/// An in-memory registry backed by a `BTreeMap`.
///
/// Cloning is cheap and clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    data: Arc<RwLock<BTreeMap<String, ClusterRecord>>>,
}

impl MemoryRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ClusterRegistry for MemoryRegistry {
    async fn get(&self, id: &str) -> Result<Option<ClusterRecord>, RegistryError> {
        let data = self.data.read().await;
        Ok(data.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ClusterRecord>, RegistryError> {
        let data = self.data.read().await;
        let mut records: Vec<ClusterRecord> = data.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn create(&self, record: ClusterRecord) -> Result<(), RegistryError> {
        let mut data = self.data.write().await;
        if data.contains_key(&record.id) {
            return Err(RegistryError::AlreadyExists { id: record.id });
        }
        data.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update(&self, record: ClusterRecord) -> Result<(), RegistryError> {
        let mut data = self.data.write().await;
        match data.get_mut(&record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RegistryError::NotFound { id: record.id }),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, RegistryError> {
        let mut data = self.data.write().await;
        Ok(data.remove(id).is_some())
    }
}
