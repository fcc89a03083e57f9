//! Catalog adapter trait for fetching table schemas

use mapsmith_core::TableSchema;
use std::fmt;

/// Identifies a table in a warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentifier {
    /// Catalog/project name
    pub catalog: String,

    /// Dataset/schema name
    pub dataset: String,

    /// Table name
    pub table: String,
}

impl TableIdentifier {
    /// Create a new table identifier
    pub fn new(
        catalog: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Parse a `catalog.dataset.table` string
    pub fn parse(fqn: &str) -> Result<Self, FetchError> {
        let parts: Vec<&str> = fqn.split('.').collect();
        match parts.as_slice() {
            [catalog, dataset, table] => Ok(Self::new(*catalog, *dataset, *table)),
            _ => Err(FetchError::InvalidIdentifier(fqn.to_string())),
        }
    }

    /// Get fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.dataset, self.table)
    }

    /// The `catalog.dataset` prefix
    pub fn dataset_id(&self) -> String {
        format!("{}.{}", self.catalog, self.dataset)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

/// Errors that can occur when fetching schemas
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid table identifier (expected catalog.dataset.table): {0}")]
    InvalidIdentifier(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Trait for catalog adapters that can introspect table schemas
///
/// Introspection is the only I/O-bound stage of the pipeline; it is owned
/// by the caller together with its retry/timeout policy.
#[async_trait::async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Get the adapter name (e.g., "Snapshot", "Mock")
    fn name(&self) -> &'static str;

    /// Fetch the schema snapshot for a specific table
    async fn fetch_schema(&self, table: &TableIdentifier) -> Result<TableSchema, FetchError>;

    /// List the tables of a `catalog.dataset`, in a stable order
    async fn list_tables(&self, dataset_id: &str) -> Result<Vec<TableIdentifier>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_identifier_fqn() {
        let table = TableIdentifier::new("proj", "staging", "gdp");
        assert_eq!(table.fqn(), "proj.staging.gdp");
        assert_eq!(table.dataset_id(), "proj.staging");
        assert_eq!(table.to_string(), "proj.staging.gdp");
    }

    #[test]
    fn table_identifier_parse() {
        let table = TableIdentifier::parse("proj.target.dim_country").unwrap();
        assert_eq!(table.table, "dim_country");

        assert!(TableIdentifier::parse("just_a_table").is_err());
        assert!(TableIdentifier::parse("a.b.c.d").is_err());
    }
}
