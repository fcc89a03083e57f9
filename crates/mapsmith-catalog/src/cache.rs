//! Per-run schema cache
//!
//! Wraps any adapter so each table is introspected at most once per run.
//! Snapshots are immutable, so a cached entry never goes stale within a
//! request.

use crate::adapter::{CatalogAdapter, FetchError, TableIdentifier};
use mapsmith_core::TableSchema;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Caching wrapper around a catalog adapter
pub struct CachingAdapter<A> {
    inner: A,
    cache: Arc<RwLock<HashMap<String, TableSchema>>>,
}

impl<A: CatalogAdapter> CachingAdapter<A> {
    /// Wrap an adapter with an empty cache
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of cached table schemas
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait::async_trait]
impl<A: CatalogAdapter> CatalogAdapter for CachingAdapter<A> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch_schema(&self, table: &TableIdentifier) -> Result<TableSchema, FetchError> {
        let fqn = table.fqn();
        if let Some(schema) = self.cache.read().await.get(&fqn) {
            return Ok(schema.clone());
        }

        let schema = self.inner.fetch_schema(table).await?;
        self.cache.write().await.insert(fqn, schema.clone());
        Ok(schema)
    }

    async fn list_tables(&self, dataset_id: &str) -> Result<Vec<TableIdentifier>, FetchError> {
        self.inner.list_tables(dataset_id).await
    }
}
