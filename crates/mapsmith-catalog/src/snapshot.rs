//! Snapshot catalog adapter
//!
//! Serves table schemas from a JSON snapshot file instead of a live
//! warehouse. This is the offline seam the CLI uses: a snapshot is a flat
//! list of `TableSchema` objects keyed by their fully qualified ids.
//!
//! Snapshot format:
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "table_id": "proj.staging.gdp",
//!       "columns": [
//!         { "name": "country_code", "type": "STRING", "mode": "REQUIRED" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::adapter::{CatalogAdapter, FetchError, TableIdentifier};
use mapsmith_core::TableSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk snapshot shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// All table schemas in the snapshot
    pub tables: Vec<TableSchema>,
}

/// Catalog adapter backed by an in-memory snapshot
///
/// Table order within a dataset follows the snapshot file, which keeps
/// downstream output deterministic.
pub struct SnapshotAdapter {
    // BTreeMap is not enough on its own: listing must preserve snapshot
    // order, so the original order is kept separately.
    schemas: BTreeMap<String, TableSchema>,
    order: Vec<String>,
}

impl SnapshotAdapter {
    /// Build an adapter from an already-parsed snapshot
    pub fn new(snapshot: CatalogSnapshot) -> Result<Self, FetchError> {
        let mut schemas = BTreeMap::new();
        let mut order = Vec::new();

        for table in snapshot.tables {
            TableIdentifier::parse(&table.table_id)?;
            if schemas.insert(table.table_id.clone(), table.clone()).is_some() {
                return Err(FetchError::InvalidSnapshot(format!(
                    "duplicate table id: {}",
                    table.table_id
                )));
            }
            order.push(table.table_id);
        }

        Ok(Self { schemas, order })
    }

    /// Load a snapshot file from disk
    pub fn from_file(path: &Path) -> Result<Self, FetchError> {
        let contents = std::fs::read_to_string(path).map_err(|e| FetchError::Io(e.to_string()))?;
        let snapshot: CatalogSnapshot =
            serde_json::from_str(&contents).map_err(|e| FetchError::InvalidSnapshot(e.to_string()))?;
        Self::new(snapshot)
    }

    /// Number of tables in the snapshot
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the snapshot holds no tables
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[async_trait::async_trait]
impl CatalogAdapter for SnapshotAdapter {
    fn name(&self) -> &'static str {
        "Snapshot"
    }

    async fn fetch_schema(&self, table: &TableIdentifier) -> Result<TableSchema, FetchError> {
        self.schemas
            .get(&table.fqn())
            .cloned()
            .ok_or_else(|| FetchError::TableNotFound(table.fqn()))
    }

    async fn list_tables(&self, dataset_id: &str) -> Result<Vec<TableIdentifier>, FetchError> {
        let prefix = format!("{dataset_id}.");
        let tables: Vec<TableIdentifier> = self
            .order
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .filter_map(|id| TableIdentifier::parse(id).ok())
            .collect();

        if tables.is_empty() {
            tracing::warn!(dataset = dataset_id, "no tables found in snapshot");
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsmith_core::{ColumnSchema, SemanticType};

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            tables: vec![
                TableSchema::new(
                    "proj.staging.gdp",
                    vec![ColumnSchema::new("value", SemanticType::Float)],
                ),
                TableSchema::new(
                    "proj.staging.population",
                    vec![ColumnSchema::new("value", SemanticType::Integer)],
                ),
                TableSchema::new(
                    "proj.target.dim_country",
                    vec![ColumnSchema::required("country_code", SemanticType::String)],
                ),
            ],
        }
    }

    #[tokio::test]
    async fn fetch_and_list() {
        let adapter = SnapshotAdapter::new(snapshot()).unwrap();
        assert_eq!(adapter.len(), 3);

        let table = TableIdentifier::parse("proj.staging.gdp").unwrap();
        let schema = adapter.fetch_schema(&table).await.unwrap();
        assert_eq!(schema.column_names(), vec!["value"]);

        let staging = adapter.list_tables("proj.staging").await.unwrap();
        assert_eq!(staging.len(), 2);
        assert_eq!(staging[0].table, "gdp");

        let missing = TableIdentifier::parse("proj.staging.nope").unwrap();
        assert!(matches!(
            adapter.fetch_schema(&missing).await,
            Err(FetchError::TableNotFound(_))
        ));
    }

    #[test]
    fn duplicate_table_ids_are_rejected() {
        let mut snap = snapshot();
        snap.tables.push(snap.tables[0].clone());
        assert!(matches!(
            SnapshotAdapter::new(snap),
            Err(FetchError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn listing_preserves_snapshot_order() {
        // Snapshot order, not lexical order, drives listing.
        let snap = CatalogSnapshot {
            tables: vec![
                TableSchema::new("proj.staging.zzz", vec![]),
                TableSchema::new("proj.staging.aaa", vec![]),
            ],
        };
        let adapter = SnapshotAdapter::new(snap).unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let tables = rt.block_on(adapter.list_tables("proj.staging")).unwrap();
        assert_eq!(tables[0].table, "zzz");
        assert_eq!(tables[1].table, "aaa");
    }
}
