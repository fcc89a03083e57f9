//! Schema snapshot types and the semantic type system

use serde::{Deserialize, Serialize};

/// Portable semantic type for warehouse columns
///
/// Maps warehouse-specific types to a common representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SemanticType {
    /// String/text type
    String,

    /// Integer type (any precision)
    Integer,

    /// Floating point (any precision)
    Float,

    /// Exact decimal type
    Numeric,

    /// Boolean type
    Boolean,

    /// Date (no time component)
    Date,

    /// Timestamp (with time component)
    Timestamp,
}

impl SemanticType {
    /// Stable uppercase name, as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Numeric => "NUMERIC",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// Parse a wire-format type name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STRING" => Some(Self::String),
            "INTEGER" => Some(Self::Integer),
            "FLOAT" => Some(Self::Float),
            "NUMERIC" => Some(Self::Numeric),
            "BOOLEAN" => Some(Self::Boolean),
            "DATE" => Some(Self::Date),
            "TIMESTAMP" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// Whether this type holds numeric values
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Numeric)
    }

    /// Classify a source-to-target type pair
    ///
    /// Compatible pairs need no expression, Convertible pairs need a cast,
    /// Incompatible pairs have no sensible cast at all.
    pub fn compatibility(self, target: SemanticType) -> Compatibility {
        use SemanticType::{Boolean, Date, Integer, String, Timestamp};

        if self == target {
            return Compatibility::Compatible;
        }

        match (self, target) {
            // Implicit widening, no cast required
            (Integer, SemanticType::Float | SemanticType::Numeric) => Compatibility::Compatible,

            // Explicit numeric casts
            (SemanticType::Float | SemanticType::Numeric, _) if target.is_numeric() => {
                Compatibility::Convertible
            }
            // String converts both ways via (SAFE_)CAST
            (String, _) | (_, String) => Compatibility::Convertible,
            (Date, Timestamp) | (Timestamp, Date) => Compatibility::Convertible,
            (Boolean, Integer) | (Integer, Boolean) => Compatibility::Convertible,

            _ => Compatibility::Incompatible,
        }
    }

    /// Cast expression template for a Convertible pair
    ///
    /// String sources get `SAFE_CAST` so unparsable values become NULL
    /// instead of failing the load.
    pub fn cast_expression(self, column: &str, target: SemanticType) -> String {
        if self == SemanticType::String {
            format!("SAFE_CAST({} AS {})", column, target.as_str())
        } else {
            format!("CAST({} AS {})", column, target.as_str())
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying a source/target type pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    /// Identity or implicit-coercion match, no expression needed
    Compatible,

    /// Needs a cast expression; downgrades confidence tier by one level
    Convertible,

    /// No sensible cast; forces the Low tier and raises a warning
    Incompatible,
}

/// Column nullability, as reported by warehouse introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    /// Column must not be NULL
    Required,

    /// Column may be NULL
    Nullable,
}

/// A single column in a table snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name
    pub name: String,

    /// Semantic type
    #[serde(rename = "type")]
    pub field_type: SemanticType,

    /// Nullability
    pub mode: FieldMode,
}

impl ColumnSchema {
    /// Create a nullable column
    pub fn new(name: impl Into<String>, field_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::Nullable,
        }
    }

    /// Create a required column
    pub fn required(name: impl Into<String>, field_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::Required,
        }
    }

    /// Whether introspection marked this column REQUIRED
    pub fn is_required(&self) -> bool {
        self.mode == FieldMode::Required
    }
}

/// Immutable snapshot of one table, produced by introspection once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Fully qualified identifier (`catalog.dataset.table`)
    pub table_id: String,

    /// Ordered list of columns
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Create a snapshot from an identifier and columns
    pub fn new(table_id: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            table_id: table_id.into(),
            columns,
        }
    }

    /// Bare table name (last identifier segment)
    pub fn table_name(&self) -> &str {
        self.table_id.rsplit('.').next().unwrap_or(&self.table_id)
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_type_wire_names() {
        assert_eq!(SemanticType::Numeric.as_str(), "NUMERIC");
        assert_eq!(SemanticType::parse("TIMESTAMP"), Some(SemanticType::Timestamp));
        assert_eq!(SemanticType::parse("INT64"), None);
    }

    #[test]
    fn identity_and_widening_are_compatible() {
        assert_eq!(
            SemanticType::String.compatibility(SemanticType::String),
            Compatibility::Compatible
        );
        assert_eq!(
            SemanticType::Integer.compatibility(SemanticType::Numeric),
            Compatibility::Compatible
        );
        assert_eq!(
            SemanticType::Integer.compatibility(SemanticType::Float),
            Compatibility::Compatible
        );
    }

    #[test]
    fn float_to_numeric_needs_cast() {
        assert_eq!(
            SemanticType::Float.compatibility(SemanticType::Numeric),
            Compatibility::Convertible
        );
        assert_eq!(
            SemanticType::Float.cast_expression("value", SemanticType::Numeric),
            "CAST(value AS NUMERIC)"
        );
    }

    #[test]
    fn string_sources_use_safe_cast() {
        assert_eq!(
            SemanticType::String.cast_expression("year", SemanticType::Integer),
            "SAFE_CAST(year AS INTEGER)"
        );
    }

    #[test]
    fn boolean_to_date_is_incompatible() {
        assert_eq!(
            SemanticType::Boolean.compatibility(SemanticType::Date),
            Compatibility::Incompatible
        );
        assert_eq!(
            SemanticType::Date.compatibility(SemanticType::Numeric),
            Compatibility::Incompatible
        );
    }

    #[test]
    fn table_schema_operations() {
        let schema = TableSchema::new(
            "proj.staging.gdp",
            vec![
                ColumnSchema::required("country_code", SemanticType::String),
                ColumnSchema::new("value", SemanticType::Float),
            ],
        );

        assert_eq!(schema.table_name(), "gdp");
        assert_eq!(schema.column_names(), vec!["country_code", "value"]);
        assert!(schema.find_column("value").is_some());
        assert!(schema.find_column("nope").is_none());
    }
}
