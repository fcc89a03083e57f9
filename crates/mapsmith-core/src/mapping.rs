//! Mapping model (stable wire contract)
//!
//! This is the JSON shape consumed by the SQL synthesizer and the external
//! report renderer. Field names, enumerations, and sentinel strings
//! (UNMAPPED/GENERATED/MISSING/EXPRESSION) are stable - never rename them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MappingError;
use crate::schema::{Compatibility, SemanticType};

/// Mapping mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MappingMode {
    /// Flag every unmapped target column as a warning
    #[default]
    Report,

    /// Default every unmapped target column with a generated expression
    Fix,
}

impl MappingMode {
    /// Whether defaults should be generated for unmapped targets
    pub fn is_fix(&self) -> bool {
        matches!(self, Self::Fix)
    }
}

impl std::fmt::Display for MappingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Report => write!(f, "REPORT"),
            Self::Fix => write!(f, "FIX"),
        }
    }
}

/// Reliability classification of a column match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceTier {
    /// Score >= 95 and no conversion concerns
    High,

    /// Score 80-94, or a High match that needs a cast
    Medium,

    /// Score < 80, or an incompatible type pair
    Low,
}

impl ConfidenceTier {
    /// Tier from a raw similarity score alone
    pub fn from_score(score: u8) -> Self {
        match score {
            95..=100 => Self::High,
            80..=94 => Self::Medium,
            _ => Self::Low,
        }
    }

    /// Tier from score and type compatibility
    ///
    /// Pure function: Convertible downgrades one level, Incompatible
    /// forces Low.
    pub fn for_match(score: u8, compatibility: Compatibility) -> Self {
        let base = Self::from_score(score);
        match compatibility {
            Compatibility::Compatible => base,
            Compatibility::Convertible => base.downgrade(),
            Compatibility::Incompatible => Self::Low,
        }
    }

    fn downgrade(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// Source side of a column mapping: a real column or a sentinel
///
/// Serialized as a plain string; `"UNMAPPED"` and `"GENERATED"` are
/// reserved sentinels from the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceRef {
    /// A real source column
    Column(String),

    /// No source column found; the synthesizer projects NULL
    Unmapped,

    /// Value comes from a generated expression, not a source column
    Generated,
}

impl SourceRef {
    /// The underlying column name, if this is a real column
    pub fn as_column(&self) -> Option<&str> {
        match self {
            Self::Column(name) => Some(name),
            _ => None,
        }
    }

    /// Wire-format string
    pub fn as_str(&self) -> &str {
        match self {
            Self::Column(name) => name,
            Self::Unmapped => "UNMAPPED",
            Self::Generated => "GENERATED",
        }
    }
}

impl Serialize for SourceRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "UNMAPPED" => Self::Unmapped,
            "GENERATED" => Self::Generated,
            _ => Self::Column(s),
        })
    }
}

/// Source-side type: a semantic type or a sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Type of a real source column
    Semantic(SemanticType),

    /// Paired with `SourceRef::Unmapped`
    Missing,

    /// Paired with `SourceRef::Generated`
    Expression,
}

impl SourceType {
    /// Wire-format string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic(t) => t.as_str(),
            Self::Missing => "MISSING",
            Self::Expression => "EXPRESSION",
        }
    }
}

impl Serialize for SourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "MISSING" => Ok(Self::Missing),
            "EXPRESSION" => Ok(Self::Expression),
            other => SemanticType::parse(other)
                .map(Self::Semantic)
                .ok_or_else(|| D::Error::custom(format!("unknown source type: {other}"))),
        }
    }
}

/// One source-to-target column correspondence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Source column or sentinel
    pub source_column: SourceRef,

    /// Target column name
    pub target_column: String,

    /// Source column type or sentinel
    pub source_type: SourceType,

    /// Target column type
    pub target_type: SemanticType,

    /// Cast or default expression; None for a direct copy
    pub transformation: Option<String>,

    /// Match confidence 0-100
    pub confidence: u8,

    /// Confidence tier derived from (score, compatibility)
    pub tier: ConfidenceTier,

    /// Rationale text
    pub notes: String,
}

impl ColumnMapping {
    /// A mapping backed by a real source column
    pub fn mapped(
        source_column: impl Into<String>,
        target_column: impl Into<String>,
        source_type: SemanticType,
        target_type: SemanticType,
        confidence: u8,
        tier: ConfidenceTier,
    ) -> Self {
        Self {
            source_column: SourceRef::Column(source_column.into()),
            target_column: target_column.into(),
            source_type: SourceType::Semantic(source_type),
            target_type,
            transformation: None,
            confidence,
            tier,
            notes: String::new(),
        }
    }

    /// A FIX-mode default: no source column, value from an expression
    pub fn generated(
        target_column: impl Into<String>,
        target_type: SemanticType,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            source_column: SourceRef::Generated,
            target_column: target_column.into(),
            source_type: SourceType::Expression,
            target_type,
            transformation: Some(expression.into()),
            confidence: 100,
            tier: ConfidenceTier::High,
            notes: String::new(),
        }
    }

    /// Set the cast/pivot expression
    pub fn with_transformation(mut self, transformation: impl Into<String>) -> Self {
        self.transformation = Some(transformation.into());
        self
    }

    /// Set the rationale text
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Kind of a validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// Column must not be NULL
    NotNull,

    /// Column values must be unique
    Unique,

    /// Column values must fall inside [min, max]
    Range,

    /// Column values must parse as numbers
    Numeric,

    /// Column values must be > 0
    PositiveValue,

    /// Column references another table's key
    ForeignKey,
}

impl RuleKind {
    /// Stable wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotNull => "NOT_NULL",
            Self::Unique => "UNIQUE",
            Self::Range => "RANGE",
            Self::Numeric => "NUMERIC",
            Self::PositiveValue => "POSITIVE_VALUE",
            Self::ForeignKey => "FOREIGN_KEY",
        }
    }
}

/// Parameters attached to a validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuleParams {
    /// Lower bound for RANGE rules
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min: Option<f64>,

    /// Upper bound for RANGE rules
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<f64>,

    /// Referenced table for FOREIGN_KEY rules
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub references: Option<String>,
}

impl RuleParams {
    /// Whether no parameter is set
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.references.is_none()
    }

    /// Range parameters
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            references: None,
        }
    }

    /// Foreign-key parameters
    pub fn referencing(table: impl Into<String>) -> Self {
        Self {
            min: None,
            max: None,
            references: Some(table.into()),
        }
    }
}

/// A data-quality rule inferred for one target column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Target column name
    pub column: String,

    /// Rule kind
    #[serde(rename = "type")]
    pub rule: RuleKind,

    /// Rule parameters, omitted when empty
    #[serde(skip_serializing_if = "RuleParams::is_empty", default)]
    pub params: RuleParams,

    /// Why this rule was inferred
    pub reason: String,
}

impl ValidationRule {
    /// Create a rule without parameters
    pub fn new(column: impl Into<String>, rule: RuleKind, reason: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            rule,
            params: RuleParams::default(),
            reason: reason.into(),
        }
    }

    /// Attach parameters
    pub fn with_params(mut self, params: RuleParams) -> Self {
        self.params = params;
        self
    }
}

/// Per-table mapping: one source table feeding one target table
///
/// Fan-in targets are represented as several `TableMapping`s sharing a
/// `target_table`; combining them into one statement is the synthesizer's
/// job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMapping {
    /// Source table identifier
    pub source_table: String,

    /// Target table identifier
    pub target_table: String,

    /// Table-pairing confidence, 0.0-1.0
    pub match_confidence: f64,

    /// Ordered column correspondences (target declaration order)
    pub column_mappings: Vec<ColumnMapping>,

    /// Source columns no target column claimed
    pub unmapped_source_columns: Vec<String>,

    /// Target columns with no source and no generated default
    pub unmapped_target_columns: Vec<String>,

    /// Problems found while assembling this mapping (always serialized)
    pub mapping_errors: Vec<MappingError>,

    /// Inferred data-quality rules (always serialized)
    pub validation_rules: Vec<ValidationRule>,

    /// Inferred primary key, in column order
    pub primary_key: Vec<String>,

    /// Columns expected to be unique
    pub uniqueness_constraints: Vec<String>,
}

impl TableMapping {
    /// Create an empty mapping between two tables
    pub fn new(source_table: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            target_table: target_table.into(),
            match_confidence: 0.0,
            column_mappings: Vec::new(),
            unmapped_source_columns: Vec::new(),
            unmapped_target_columns: Vec::new(),
            mapping_errors: Vec::new(),
            validation_rules: Vec::new(),
            primary_key: Vec::new(),
            uniqueness_constraints: Vec::new(),
        }
    }

    /// Whether any attached error has ERROR severity
    pub fn has_errors(&self) -> bool {
        self.mapping_errors
            .iter()
            .any(|e| e.severity == crate::error::Severity::Error)
    }

    /// Whether a target column is accounted for, either by a column
    /// mapping or by the unmapped list
    ///
    /// Invariant: every target column appears exactly once across
    /// `column_mappings` and `unmapped_target_columns`.
    pub fn covers_target(&self, column: &str) -> bool {
        let mapped = self
            .column_mappings
            .iter()
            .filter(|m| m.target_column == column)
            .count();
        let unmapped = self
            .unmapped_target_columns
            .iter()
            .filter(|c| c.as_str() == column)
            .count();
        mapped + unmapped == 1
    }
}

/// Dataset-level confidence summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallConfidence {
    /// Every column match is High tier
    High,

    /// At least one Medium match, no Low
    Medium,

    /// At least one Low match or table-level error
    Low,
}

/// Metadata block of a mapping set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingMetadata {
    /// Source dataset identifier
    pub source_dataset: String,

    /// Target dataset identifier
    pub target_dataset: String,

    /// Generation timestamp (caller-supplied so identical inputs
    /// serialize identically)
    pub generated_at: String,

    /// Confidence summary across all mappings
    pub confidence: OverallConfidence,

    /// Mode the set was produced in
    pub mode: MappingMode,
}

/// Dataset-level mapping container: metadata plus ordered table mappings
///
/// Produced once per request and treated as immutable; a refinement
/// produces a new set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSet {
    /// Dataset metadata
    pub metadata: MappingMetadata,

    /// Ordered per-table mappings
    pub mappings: Vec<TableMapping>,
}

impl MappingSet {
    /// Summarize the confidence of a finished set of table mappings
    pub fn summarize_confidence(mappings: &[TableMapping]) -> OverallConfidence {
        let mut overall = OverallConfidence::High;
        for mapping in mappings {
            if mapping.has_errors() {
                return OverallConfidence::Low;
            }
            for cm in &mapping.column_mappings {
                match cm.tier {
                    ConfidenceTier::Low => return OverallConfidence::Low,
                    ConfidenceTier::Medium => overall = OverallConfidence::Medium,
                    ConfidenceTier::High => {}
                }
            }
        }
        overall
    }

    /// Serialize to stable pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
