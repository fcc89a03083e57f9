//! Dataset mapping pipeline
//!
//! Pure, synchronous orchestration: pairs source tables with target
//! tables, runs the matcher and assembler per pair, and collects the
//! result into one `MappingSet`. Introspection happens upstream; the
//! pipeline only sees snapshots (or per-table introspection failures,
//! which isolate to their own `TableMapping`).

use mapsmith_core::{
    MapperConfig, MappingError, MappingErrorCode, MappingMetadata, MappingMode, MappingSet,
    Severity, TableMapping, TableSchema,
};

use crate::assembler::assemble_table;
use crate::matcher::{match_columns, table_name_similarity, SynonymTable};

/// Sentinel source id for targets no source table paired with
///
/// Wire-contract string carried over from the mapping JSON consumed by
/// downstream loaders.
pub const NO_SOURCE_SENTINEL: &str = "NO_MATCHING_SOURCE_TABLES";

/// Sentinel target id for source tables whose introspection failed
pub const NO_TARGET_SENTINEL: &str = "NO_MATCHING_TARGET_TABLES";

/// Introspection result for one table, as seen by the pipeline
#[derive(Debug, Clone)]
pub enum TableSnapshot {
    /// Schema fetched successfully
    Available(TableSchema),

    /// Introspection failed; carries the identifier and the error text
    Unavailable { table_id: String, error: String },
}

impl TableSnapshot {
    /// The table identifier regardless of availability
    pub fn table_id(&self) -> &str {
        match self {
            Self::Available(schema) => &schema.table_id,
            Self::Unavailable { table_id, .. } => table_id,
        }
    }
}

/// Pipeline options, usually derived from `MapperConfig`
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Mapping mode
    pub mode: MappingMode,

    /// Column similarity threshold (0-100)
    pub similarity_threshold: u8,

    /// Table pairing threshold (0-100)
    pub table_threshold: u8,

    /// Synonym table used by both column and table matching
    pub synonyms: SynonymTable,

    /// Source dataset id for the metadata block
    pub source_dataset: String,

    /// Target dataset id for the metadata block
    pub target_dataset: String,

    /// Caller-supplied generation timestamp (RFC 3339); identical inputs
    /// with the same timestamp produce byte-identical output
    pub generated_at: String,
}

impl PipelineOptions {
    /// Build options from config plus per-request context
    pub fn from_config(
        config: &MapperConfig,
        source_dataset: impl Into<String>,
        target_dataset: impl Into<String>,
        generated_at: impl Into<String>,
    ) -> Self {
        Self {
            mode: config.mode,
            similarity_threshold: config.similarity_threshold,
            table_threshold: config.table_threshold,
            synonyms: SynonymTable::with_extra_groups(&config.synonyms),
            source_dataset: source_dataset.into(),
            target_dataset: target_dataset.into(),
            generated_at: generated_at.into(),
        }
    }
}

/// Map a whole dataset: every target table against its paired sources
///
/// Each source table is assigned to the target it scores best against
/// (name similarity or column coverage, whichever is higher); several
/// sources landing on one target become independent fan-in mappings
/// sharing that target. Targets nothing paired with, and tables on either
/// side whose introspection failed, get error-only mappings without
/// affecting their siblings.
pub fn map_dataset(
    sources: &[TableSnapshot],
    targets: &[TableSnapshot],
    options: &PipelineOptions,
) -> MappingSet {
    let available_targets: Vec<&TableSchema> = targets
        .iter()
        .filter_map(|t| match t {
            TableSnapshot::Available(schema) => Some(schema),
            TableSnapshot::Unavailable { .. } => None,
        })
        .collect();

    // target table id -> paired source schemas, in source order
    let mut assignments: Vec<Vec<&TableSchema>> = vec![Vec::new(); available_targets.len()];

    // Failed source introspections first, in source order, then the
    // target-driven mappings.
    let mut mappings = Vec::new();

    for source in sources {
        let schema = match source {
            TableSnapshot::Available(schema) => schema,
            TableSnapshot::Unavailable { table_id, error } => {
                tracing::warn!(table = %table_id, %error, "unintrospectable source table");
                mappings.push(unavailable_source_mapping(table_id, error));
                continue;
            }
        };

        let mut best: Option<(usize, u8)> = None;
        for (idx, target) in available_targets.iter().enumerate() {
            let score = table_pair_score(schema, target, options);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((idx, score));
            }
        }

        match best {
            Some((idx, score)) if score >= options.table_threshold => {
                tracing::info!(
                    source = %schema.table_id,
                    target = %available_targets[idx].table_id,
                    score,
                    "paired source table with target"
                );
                assignments[idx].push(schema);
            }
            _ => {
                tracing::info!(source = %schema.table_id, "source table paired with no target");
            }
        }
    }

    let mut target_index = 0;
    for target in targets {
        match target {
            TableSnapshot::Unavailable { table_id, error } => {
                mappings.push(unavailable_target_mapping(table_id, error));
            }
            TableSnapshot::Available(target_schema) => {
                let paired = &assignments[target_index];
                target_index += 1;

                if paired.is_empty() {
                    mappings.push(no_source_mapping(target_schema));
                    continue;
                }

                for source_schema in paired {
                    let outcome = match_columns(
                        source_schema,
                        target_schema,
                        options.similarity_threshold,
                        &options.synonyms,
                    );
                    let confidence =
                        f64::from(table_pair_score(source_schema, target_schema, options)) / 100.0;
                    mappings.push(assemble_table(
                        source_schema,
                        target_schema,
                        &outcome,
                        confidence,
                        options.mode,
                        &options.synonyms,
                    ));
                }
            }
        }
    }

    let confidence = MappingSet::summarize_confidence(&mappings);
    MappingSet {
        metadata: MappingMetadata {
            source_dataset: options.source_dataset.clone(),
            target_dataset: options.target_dataset.clone(),
            generated_at: options.generated_at.clone(),
            confidence,
            mode: options.mode,
        },
        mappings,
    }
}

/// Score a source/target table pair, 0-100
///
/// The better of stripped-name similarity and column coverage: coverage is
/// the share of source columns a column-level match would claim, so a
/// long-format staging table still pairs with a differently-named target
/// it can actually fill. Name evidence only counts for structured matches
/// (exact, synonym, or token subset); raw edit-distance noise between
/// unrelated table names sits in the 40-60 band and must not pair tables.
fn table_pair_score(source: &TableSchema, target: &TableSchema, options: &PipelineOptions) -> u8 {
    let name_score =
        table_name_similarity(source.table_name(), target.table_name(), &options.synonyms);
    let name_score = if name_score >= 85 { name_score } else { 0 };

    if source.columns.is_empty() {
        return name_score;
    }

    let outcome = match_columns(
        source,
        target,
        options.similarity_threshold,
        &options.synonyms,
    );
    let coverage = (outcome.matched_count() * 100 / source.columns.len()) as u8;
    name_score.max(coverage)
}

fn unavailable_target_mapping(table_id: &str, error: &str) -> TableMapping {
    let mut mapping = TableMapping::new(NO_SOURCE_SENTINEL, table_id);
    mapping.mapping_errors.push(MappingError::new(
        MappingErrorCode::SchemaUnavailable,
        Severity::Error,
        format!("Failed to introspect {table_id}: {error}"),
    ));
    mapping
}

fn unavailable_source_mapping(table_id: &str, error: &str) -> TableMapping {
    let mut mapping = TableMapping::new(table_id, NO_TARGET_SENTINEL);
    mapping.mapping_errors.push(MappingError::new(
        MappingErrorCode::SchemaUnavailable,
        Severity::Error,
        format!("Failed to introspect {table_id}: {error}"),
    ));
    mapping
}

fn no_source_mapping(target: &TableSchema) -> TableMapping {
    let mut mapping = TableMapping::new(NO_SOURCE_SENTINEL, &target.table_id);
    mapping.unmapped_target_columns = target
        .columns
        .iter()
        .map(|c| c.name.clone())
        .collect();
    mapping.mapping_errors.push(MappingError::new(
        MappingErrorCode::NoMatchingSourceTable,
        Severity::Error,
        format!("No source table paired with {}", target.table_id),
    ));
    mapping
}
