//! Mapsmith Core
//!
//! Stable domain model for schema mapping: schema snapshots, the mapping
//! wire contract, error codes, and configuration. Error codes and sentinel
//! strings are part of the public API - never rename them.

pub mod config;
pub mod error;
pub mod mapping;
pub mod schema;

pub use config::{ConfigError, MapperConfig};
pub use error::{MappingError, MappingErrorCode, Severity};
pub use mapping::{
    ColumnMapping, ConfidenceTier, MappingMetadata, MappingMode, MappingSet, OverallConfidence,
    RuleKind, RuleParams, SourceRef, SourceType, TableMapping, ValidationRule,
};
pub use schema::{ColumnSchema, Compatibility, FieldMode, SemanticType, TableSchema};
