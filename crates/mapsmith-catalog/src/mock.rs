//! Mock catalog adapter for testing
//!
//! Stores schemas in memory and returns them on request, without touching
//! any warehouse. Specific tables can be configured to fail, which is how
//! the failure-isolation tests simulate an unintrospectable table.

use crate::adapter::{CatalogAdapter, FetchError, TableIdentifier};
use mapsmith_core::TableSchema;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mock catalog adapter
pub struct MockAdapter {
    /// Predefined schemas by table FQN, in insertion order
    schemas: Arc<RwLock<Vec<TableSchema>>>,

    /// Tables that should fail with a given message
    failures: Arc<RwLock<HashMap<String, String>>>,
}

impl MockAdapter {
    /// Create a new mock adapter with no predefined schemas
    pub fn new() -> Self {
        Self {
            schemas: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a schema; it is returned when `fetch_schema` is called with a
    /// matching identifier
    pub async fn add_schema(&self, schema: TableSchema) {
        self.schemas.write().await.push(schema);
    }

    /// Make fetches for a table fail with a permission error
    pub async fn fail_table(&self, fqn: &str, message: impl Into<String>) {
        self.failures.write().await.insert(fqn.to_string(), message.into());
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CatalogAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn fetch_schema(&self, table: &TableIdentifier) -> Result<TableSchema, FetchError> {
        let fqn = table.fqn();
        if let Some(message) = self.failures.read().await.get(&fqn) {
            return Err(FetchError::PermissionDenied(message.clone()));
        }
        self.schemas
            .read()
            .await
            .iter()
            .find(|s| s.table_id == fqn)
            .cloned()
            .ok_or(FetchError::TableNotFound(fqn))
    }

    async fn list_tables(&self, dataset_id: &str) -> Result<Vec<TableIdentifier>, FetchError> {
        let prefix = format!("{dataset_id}.");
        let schemas = self.schemas.read().await;
        let failures = self.failures.read().await;

        Ok(schemas
            .iter()
            .map(|s| s.table_id.as_str())
            .chain(failures.keys().map(String::as_str))
            .filter(|id| id.starts_with(&prefix))
            .filter_map(|id| TableIdentifier::parse(id).ok())
            .collect())
    }
}
