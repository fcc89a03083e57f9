//! Mapping error codes and severities
//!
//! IMPORTANT: Error codes are part of the mapping JSON wire contract.
//! NEVER rename or remove codes - add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Stable error code registry for mapping problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingErrorCode {
    /// A target column has no matching source column
    UnmappedTargetColumn,

    /// Source and target types have no sensible cast
    TypeIncompatible,

    /// Introspection failed for a table; only that table's mapping aborts
    SchemaUnavailable,

    /// No source table paired with this target table
    NoMatchingSourceTable,

    /// Mapping input was structurally broken and had to be repaired
    MalformedMappingInput,

    /// Synthesis detected a shape it cannot resolve (e.g. pivot without a
    /// discriminant column)
    SynthesisAmbiguous,
}

impl MappingErrorCode {
    /// Get the code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnmappedTargetColumn => "UNMAPPED_TARGET_COLUMN",
            Self::TypeIncompatible => "TYPE_INCOMPATIBLE",
            Self::SchemaUnavailable => "SCHEMA_UNAVAILABLE",
            Self::NoMatchingSourceTable => "NO_MATCHING_SOURCE_TABLE",
            Self::MalformedMappingInput => "MALFORMED_MAPPING_INPUT",
            Self::SynthesisAmbiguous => "SYNTHESIS_AMBIGUOUS",
        }
    }
}

impl std::fmt::Display for MappingErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a mapping error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Should be reviewed but does not block synthesis
    Warning,

    /// Blocks the affected table's mapping
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// A problem attached to one `TableMapping`
///
/// Errors never abort sibling tables in the same mapping set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingError {
    /// Stable error code
    pub error_type: MappingErrorCode,

    /// Affected target column, when the problem is column-scoped
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_column: Option<String>,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,
}

impl MappingError {
    /// Create a table-scoped error
    pub fn new(error_type: MappingErrorCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            error_type,
            target_column: None,
            severity,
            message: message.into(),
        }
    }

    /// Scope the error to a target column
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_stability() {
        assert_eq!(MappingErrorCode::UnmappedTargetColumn.as_str(), "UNMAPPED_TARGET_COLUMN");
        assert_eq!(MappingErrorCode::SchemaUnavailable.as_str(), "SCHEMA_UNAVAILABLE");
    }

    #[test]
    fn error_serialization() {
        let err = MappingError::new(
            MappingErrorCode::UnmappedTargetColumn,
            Severity::Warning,
            "No source column found for 'loaded_at'",
        )
        .with_column("loaded_at");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("UNMAPPED_TARGET_COLUMN"));
        assert!(json.contains("WARNING"));
        assert!(json.contains("loaded_at"));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
    }
}
