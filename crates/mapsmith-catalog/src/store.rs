//! Caller-owned mapping store
//!
//! The pipeline itself holds no cross-request state; saving and loading
//! mapping sets by ID is a caller concern behind this key-value seam.

use mapsmith_core::MappingSet;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Errors returned by a mapping store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Mapping not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    Backend(String),
}

/// Key-value store for mapping sets, addressed by opaque ID
#[async_trait::async_trait]
pub trait MappingStore: Send + Sync {
    /// Fetch a mapping set by ID
    async fn get(&self, id: &str) -> Result<MappingSet, StoreError>;

    /// Save a mapping set under an ID, replacing any previous value
    async fn put(&self, id: &str, set: MappingSet) -> Result<(), StoreError>;

    /// List all stored IDs in a stable order
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Delete a mapping set by ID
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory mapping store
pub struct MemoryStore {
    sets: Arc<RwLock<BTreeMap<String, MappingSet>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            sets: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MappingStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<MappingSet, StoreError> {
        self.sets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn put(&self, id: &str, set: MappingSet) -> Result<(), StoreError> {
        self.sets.write().await.insert(id.to_string(), set);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.sets.read().await.keys().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.sets
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsmith_core::{MappingMetadata, MappingMode, OverallConfidence};

    fn sample_set() -> MappingSet {
        MappingSet {
            metadata: MappingMetadata {
                source_dataset: "p.staging".to_string(),
                target_dataset: "p.target".to_string(),
                generated_at: "2026-01-01T00:00:00Z".to_string(),
                confidence: OverallConfidence::High,
                mode: MappingMode::Report,
            },
            mappings: Vec::new(),
        }
    }

    #[tokio::test]
    async fn put_get_list_delete() {
        let store = MemoryStore::new();

        store.put("run-1", sample_set()).await.unwrap();
        store.put("run-2", sample_set()).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["run-1", "run-2"]);
        assert_eq!(store.get("run-1").await.unwrap(), sample_set());

        store.delete("run-1").await.unwrap();
        assert!(matches!(store.get("run-1").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete("run-1").await, Err(StoreError::NotFound(_))));
    }
}
