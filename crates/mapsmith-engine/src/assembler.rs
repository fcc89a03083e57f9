//! Mapping assembler
//!
//! Turns matcher output plus target metadata into a structured
//! `TableMapping`: transformations, FIX-mode defaults, inferred keys, and
//! validation rules.

use mapsmith_core::{
    ColumnMapping, ColumnSchema, Compatibility, ConfidenceTier, MappingError, MappingErrorCode,
    MappingMode, RuleKind, RuleParams, SemanticType, Severity, TableMapping, TableSchema,
    ValidationRule,
};

use crate::matcher::{tokenize, MatchOutcome, SynonymTable};

/// Assemble one table mapping from matcher output
///
/// Column mappings come out in target declaration order. In REPORT mode
/// unmapped targets land in `unmapped_target_columns` with a warning each;
/// in FIX mode they become GENERATED rows with a default expression and no
/// error. Every target column ends up in exactly one of the two places.
pub fn assemble_table(
    source: &TableSchema,
    target: &TableSchema,
    outcome: &MatchOutcome,
    match_confidence: f64,
    mode: MappingMode,
    synonyms: &SynonymTable,
) -> TableMapping {
    let mut mapping = TableMapping::new(&source.table_id, &target.table_id);
    mapping.match_confidence = match_confidence;
    mapping.unmapped_source_columns = outcome.unused_sources.clone();

    for m in &outcome.matches {
        let Some(target_col) = target.find_column(&m.target) else {
            continue;
        };

        match (&m.source, m.compatibility) {
            (Some(source_name), Some(compatibility)) => {
                let Some(source_col) = source.find_column(source_name) else {
                    continue;
                };
                mapping.column_mappings.push(build_mapped_column(
                    source_col,
                    target_col,
                    m.score,
                    compatibility,
                    &mut mapping.mapping_errors,
                ));
            }
            _ => match mode {
                MappingMode::Report => {
                    mapping.unmapped_target_columns.push(target_col.name.clone());
                    mapping.mapping_errors.push(
                        MappingError::new(
                            MappingErrorCode::UnmappedTargetColumn,
                            Severity::Warning,
                            format!(
                                "No source column found for '{}' - requires manual mapping or a default value",
                                target_col.name
                            ),
                        )
                        .with_column(&target_col.name),
                    );
                }
                MappingMode::Fix => {
                    let (expression, notes) =
                        default_expression(target_col, source, outcome, synonyms);
                    tracing::debug!(
                        column = %target_col.name,
                        %expression,
                        "generated default for unmapped target column"
                    );
                    mapping.column_mappings.push(
                        ColumnMapping::generated(&target_col.name, target_col.field_type, expression)
                            .with_notes(notes),
                    );
                }
            },
        }
    }

    mapping.primary_key = infer_primary_key(target);
    mapping.uniqueness_constraints = mapping.primary_key.clone();
    mapping.validation_rules = build_validation_rules(target, &mapping.primary_key);
    mapping
}

fn build_mapped_column(
    source_col: &ColumnSchema,
    target_col: &ColumnSchema,
    score: u8,
    compatibility: Compatibility,
    errors: &mut Vec<MappingError>,
) -> ColumnMapping {
    let tier = ConfidenceTier::for_match(score, compatibility);
    let mapped = ColumnMapping::mapped(
        &source_col.name,
        &target_col.name,
        source_col.field_type,
        target_col.field_type,
        score,
        tier,
    );

    match compatibility {
        Compatibility::Compatible => mapped.with_notes("Direct mapping"),
        Compatibility::Convertible => {
            let cast = source_col
                .field_type
                .cast_expression(&source_col.name, target_col.field_type);
            mapped.with_transformation(cast).with_notes(format!(
                "Cast from {} to {}",
                source_col.field_type, target_col.field_type
            ))
        }
        Compatibility::Incompatible => {
            errors.push(
                MappingError::new(
                    MappingErrorCode::TypeIncompatible,
                    Severity::Warning,
                    format!(
                        "No sensible cast from {} ({}) to {} ({})",
                        source_col.name,
                        source_col.field_type,
                        target_col.name,
                        target_col.field_type
                    ),
                )
                .with_column(&target_col.name),
            );
            mapped.with_notes("Incompatible types - manual review required")
        }
    }
}

/// Pick a default expression for a target column with no source
///
/// Heuristics, in priority order: audit timestamps, source-naming columns,
/// derived ratios over mapped operands, then type-based fallbacks.
fn default_expression(
    target_col: &ColumnSchema,
    source: &TableSchema,
    outcome: &MatchOutcome,
    synonyms: &SynonymTable,
) -> (String, String) {
    let tokens = tokenize(&target_col.name);

    if target_col.field_type == SemanticType::Timestamp || tokens.last().is_some_and(|t| t == "at")
    {
        return (
            "CURRENT_TIMESTAMP()".to_string(),
            "Auto-generated load timestamp".to_string(),
        );
    }

    if tokens.iter().any(|t| t == "source") {
        return (
            format!("'{}'", source.table_name()),
            "Literal naming the originating table".to_string(),
        );
    }

    if let Some((numerator, denominator)) = resolve_ratio_operands(&tokens, outcome, synonyms) {
        return (
            format!("SAFE_DIVIDE({numerator}, {denominator})"),
            format!("Derived ratio of {numerator} over {denominator}"),
        );
    }

    match target_col.field_type {
        SemanticType::Date => (
            "CURRENT_DATE()".to_string(),
            "Auto-generated load date".to_string(),
        ),
        SemanticType::Integer | SemanticType::Float | SemanticType::Numeric => {
            ("0".to_string(), "Numeric default".to_string())
        }
        SemanticType::Boolean => ("FALSE".to_string(), "Boolean default".to_string()),
        SemanticType::String | SemanticType::Timestamp => (
            "'UNKNOWN'".to_string(),
            "String placeholder default".to_string(),
        ),
    }
}

/// Detect a ratio-shaped name and resolve both operands to mapped target
/// columns
///
/// Recognizes `a_per_b`, `a_to_b_ratio`, and `a_of_b_pct` shapes. Returns
/// the operand target column names only when both resolve; otherwise the
/// caller falls through to the plain numeric default.
fn resolve_ratio_operands(
    tokens: &[String],
    outcome: &MatchOutcome,
    synonyms: &SynonymTable,
) -> Option<(String, String)> {
    let (numerator_tokens, denominator_tokens) = split_ratio_name(tokens)?;

    let numerator = find_mapped_operand(&numerator_tokens, outcome, synonyms)?;
    let denominator = find_mapped_operand(&denominator_tokens, outcome, synonyms)?;
    if numerator == denominator {
        return None;
    }
    Some((numerator, denominator))
}

fn split_ratio_name(tokens: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    if let Some(pos) = tokens.iter().position(|t| t == "per") {
        if pos > 0 && pos + 1 < tokens.len() {
            return Some((tokens[..pos].to_vec(), tokens[pos + 1..].to_vec()));
        }
        return None;
    }

    if tokens.last().is_some_and(|t| t == "ratio" || t == "pct") {
        let operands: Vec<String> = tokens[..tokens.len() - 1]
            .iter()
            .filter(|t| *t != "to" && *t != "of")
            .cloned()
            .collect();
        if operands.len() == 2 {
            return Some((vec![operands[0].clone()], vec![operands[1].clone()]));
        }
    }
    None
}

/// Find a mapped target column whose name tokens cover all operand tokens,
/// synonym-aware
fn find_mapped_operand(
    operand_tokens: &[String],
    outcome: &MatchOutcome,
    synonyms: &SynonymTable,
) -> Option<String> {
    let canonical_operand: Vec<&str> = operand_tokens
        .iter()
        .map(|t| synonyms.canonical(t))
        .collect();

    outcome
        .matches
        .iter()
        .filter(|m| m.source.is_some())
        .find(|m| {
            let target_tokens = tokenize(&m.target);
            let canonical_target: Vec<&str> =
                target_tokens.iter().map(|t| synonyms.canonical(t)).collect();
            canonical_operand
                .iter()
                .all(|t| canonical_target.contains(t))
        })
        .map(|m| m.target.clone())
}

/// Infer a primary key from target metadata
///
/// Fact and aggregate tables key on their full required non-measure column
/// set; dimension tables key on id/code-like columns, preferring REQUIRED
/// ones.
pub fn infer_primary_key(target: &TableSchema) -> Vec<String> {
    let table_name = target.table_name();
    let is_fact = table_name.starts_with("fact_") || table_name.starts_with("agg_");

    if is_fact {
        return target
            .columns
            .iter()
            .filter(|c| {
                c.is_required()
                    && !matches!(c.field_type, SemanticType::Float | SemanticType::Numeric)
            })
            .map(|c| c.name.clone())
            .collect();
    }

    let key_like: Vec<&ColumnSchema> = target
        .columns
        .iter()
        .filter(|c| is_key_like(&c.name))
        .collect();

    let required: Vec<String> = key_like
        .iter()
        .filter(|c| c.is_required())
        .map(|c| c.name.clone())
        .collect();
    if !required.is_empty() {
        return required;
    }
    key_like.iter().map(|c| c.name.clone()).collect()
}

fn is_key_like(name: &str) -> bool {
    tokenize(name)
        .last()
        .is_some_and(|t| t == "id" || t == "code" || t == "key")
}

/// Build validation rules for every target column, in declaration order
fn build_validation_rules(target: &TableSchema, primary_key: &[String]) -> Vec<ValidationRule> {
    let table_name = target.table_name();
    let is_fact = table_name.starts_with("fact_") || table_name.starts_with("agg_");
    let mut rules = Vec::new();

    for col in &target.columns {
        let in_pk = primary_key.contains(&col.name);
        let tokens = tokenize(&col.name);

        // Primary-key columns are NOT_NULL even when introspection says
        // NULLABLE.
        if in_pk {
            rules.push(ValidationRule::new(
                &col.name,
                RuleKind::NotNull,
                "Primary key column",
            ));
        } else if col.is_required() {
            rules.push(ValidationRule::new(
                &col.name,
                RuleKind::NotNull,
                "Target column is REQUIRED",
            ));
        }

        if primary_key.len() == 1 && in_pk {
            rules.push(ValidationRule::new(
                &col.name,
                RuleKind::Unique,
                "Primary key must be unique",
            ));
        }

        if col.field_type.is_numeric() {
            rules.push(ValidationRule::new(
                &col.name,
                RuleKind::Numeric,
                format!("{} column must hold numeric values", col.field_type),
            ));
        }

        if tokens.iter().any(|t| t == "year") {
            rules.push(
                ValidationRule::new(&col.name, RuleKind::Range, "Calendar year sanity bounds")
                    .with_params(RuleParams::range(1900.0, 2100.0)),
            );
        } else if tokens
            .iter()
            .any(|t| t == "percent" || t == "percentage" || t == "pct" || t == "rate")
        {
            rules.push(
                ValidationRule::new(&col.name, RuleKind::Range, "Percentage bounds")
                    .with_params(RuleParams::range(0.0, 100.0)),
            );
        } else if tokens
            .iter()
            .any(|t| t == "count" || t == "total" || t == "population")
        {
            rules.push(ValidationRule::new(
                &col.name,
                RuleKind::PositiveValue,
                "Measure expected to be positive",
            ));
        }

        if is_fact && is_key_like(&col.name) && tokens.len() > 1 {
            let referenced = format!("dim_{}", tokens[..tokens.len() - 1].join("_"));
            rules.push(
                ValidationRule::new(&col.name, RuleKind::ForeignKey, "Dimension reference")
                    .with_params(RuleParams::referencing(referenced)),
            );
        }
    }

    rules
}
