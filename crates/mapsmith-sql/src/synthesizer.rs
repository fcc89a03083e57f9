//! SQL synthesizer
//!
//! Turns a `MappingSet` into an executable load script: direct INSERTs,
//! fan-in UNION ALL, fan-out pivots via MAX(IF(...)), and idempotent MERGE
//! when a primary key is known. Output is deterministic: identical input
//! produces byte-identical SQL.

use std::collections::BTreeMap;

use mapsmith_core::{ColumnMapping, MappingSet, SourceRef, TableMapping};
use thiserror::Error;

use crate::repair::{repair_with, RepairOutcome};

/// Failures that abort synthesis for the whole set
#[derive(Debug, Error, PartialEq)]
pub enum SynthesisError {
    /// Input JSON broken beyond repair
    #[error("malformed mapping input at line {line}, column {column}: {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },

    /// Pivot transformation with no parsable discriminant
    #[error("ambiguous pivot for {table}: cannot parse discriminant from `{expression}`")]
    AmbiguousPivot { table: String, expression: String },

    /// Merge requested but the mapping carries no usable primary key
    #[error("idempotent merge requested for {table} but no primary key is known")]
    MissingPrimaryKey { table: String },

    /// Fan-in members project different target column lists
    #[error("fan-in sources for {table} disagree on the projected column list")]
    ShapeMismatch { table: String },
}

/// Synthesis options
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlOptions {
    /// Emit MERGE statements keyed on the inferred primary key instead of
    /// plain INSERTs
    pub idempotent: bool,
}

/// Synthesize the load script for a mapping set
pub fn synthesize(set: &MappingSet, options: &SqlOptions) -> Result<String, SynthesisError> {
    let mut out = String::new();
    banner(&mut out, set, options);

    for group in group_by_target(&set.mappings) {
        out.push('\n');
        synthesize_group(&mut out, &group, options)?;
    }

    Ok(out)
}

/// Parse (repairing if needed) and synthesize in one step
///
/// Repaired input synthesizes normally with a warning comment block naming
/// each repair. Input broken beyond repair returns `Malformed` with the
/// parser's best-known location.
pub fn synthesize_from_json(
    json: &str,
    options: &SqlOptions,
) -> Result<String, SynthesisError> {
    match MappingSet::from_json(json) {
        Ok(set) => synthesize(&set, options),
        Err(parse_err) => {
            let outcome = repair_with(json, |s| MappingSet::from_json(s).is_ok())
                .ok_or_else(|| SynthesisError::Malformed {
                    line: parse_err.line(),
                    column: parse_err.column(),
                    message: parse_err.to_string(),
                })?;
            tracing::warn!(
                repairs = outcome.notes.len(),
                "mapping input repaired before synthesis"
            );
            let set = MappingSet::from_json(&outcome.repaired).map_err(|e| {
                SynthesisError::Malformed {
                    line: e.line(),
                    column: e.column(),
                    message: e.to_string(),
                }
            })?;
            let mut out = repair_warning(&outcome);
            out.push_str(&synthesize(&set, options)?);
            Ok(out)
        }
    }
}

fn banner(out: &mut String, set: &MappingSet, options: &SqlOptions) {
    out.push_str("-- mapsmith load script\n");
    out.push_str(&format!(
        "-- source dataset: {}\n",
        set.metadata.source_dataset
    ));
    out.push_str(&format!(
        "-- target dataset: {}\n",
        set.metadata.target_dataset
    ));
    out.push_str(&format!("-- mode: {}\n", set.metadata.mode));
    out.push_str(&format!(
        "-- idempotent merge: {}\n",
        if options.idempotent { "enabled" } else { "disabled" }
    ));
    out.push_str(&format!("-- generated at: {}\n", set.metadata.generated_at));
}

fn repair_warning(outcome: &RepairOutcome) -> String {
    let mut block = String::from("-- WARNING: mapping input was repaired before synthesis:\n");
    for note in &outcome.notes {
        block.push_str(&format!("--   - {note}\n"));
    }
    block
}

/// Group mappings by target table and order the groups for loading
///
/// Fan-in mappings sharing a target collapse into one group. Groups load
/// dimensions first, then facts, then aggregates, then everything else,
/// stable within each class.
fn group_by_target<'a>(mappings: &'a [TableMapping]) -> Vec<Vec<&'a TableMapping>> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: BTreeMap<&str, Vec<&'a TableMapping>> = BTreeMap::new();
    for mapping in mappings {
        let target = mapping.target_table.as_str();
        if !groups.contains_key(target) {
            order.push(target);
        }
        groups.entry(target).or_default().push(mapping);
    }

    let mut keyed: Vec<(u8, usize, &str)> = order
        .iter()
        .enumerate()
        .map(|(i, t)| (load_class(t), i, *t))
        .collect();
    keyed.sort();

    keyed
        .into_iter()
        .filter_map(|(_, _, target)| groups.remove(target))
        .collect()
}

fn load_class(table_id: &str) -> u8 {
    let name = table_id.rsplit('.').next().unwrap_or(table_id);
    if name.starts_with("dim_") {
        0
    } else if name.starts_with("fact_") {
        1
    } else if name.starts_with("agg_") {
        2
    } else {
        3
    }
}

fn synthesize_group(
    out: &mut String,
    group: &[&TableMapping],
    options: &SqlOptions,
) -> Result<(), SynthesisError> {
    let target = &group[0].target_table;

    let loadable: Vec<&TableMapping> = group
        .iter()
        .copied()
        .filter(|m| !m.has_errors() && !m.column_mappings.is_empty())
        .collect();

    if loadable.is_empty() {
        let reason = group[0]
            .mapping_errors
            .iter()
            .map(|e| e.message.as_str())
            .next()
            .unwrap_or("no mapped columns");
        out.push_str(&format!("-- SKIPPED {target}: {reason}\n"));
        return Ok(());
    }

    let sources: Vec<&str> = loadable.iter().map(|m| m.source_table.as_str()).collect();
    out.push_str(&format!("-- {} -> {}\n", sources.join(", "), target));

    let blocks: Vec<SelectBlock> = loadable
        .iter()
        .map(|m| build_select_block(m))
        .collect::<Result<_, _>>()?;

    // Fan-in members must agree on the projected target columns.
    let columns = &blocks[0].columns;
    if blocks.iter().any(|b| &b.columns != columns) {
        return Err(SynthesisError::ShapeMismatch {
            table: target.clone(),
        });
    }

    if options.idempotent {
        let primary_key = &loadable[0].primary_key;
        if primary_key.is_empty() || !primary_key.iter().all(|k| columns.contains(k)) {
            return Err(SynthesisError::MissingPrimaryKey {
                table: target.clone(),
            });
        }
        write_merge(out, target, columns, primary_key, &blocks);
    } else {
        write_insert(out, target, columns, &blocks);
    }
    Ok(())
}

/// One projected SELECT over one source table
struct SelectBlock {
    /// Projected target column names, in target order
    columns: Vec<String>,

    /// Projection lines, aligned with `columns`
    lines: Vec<String>,

    source_table: String,

    /// GROUP BY keys; non-empty only for pivot blocks
    group_by: Vec<String>,
}

impl SelectBlock {
    fn write(&self, out: &mut String, indent: &str) {
        out.push_str(indent);
        out.push_str("SELECT\n");
        for (i, line) in self.lines.iter().enumerate() {
            out.push_str(indent);
            out.push_str("  ");
            out.push_str(line);
            if i + 1 < self.lines.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push_str(indent);
        out.push_str(&format!("FROM `{}`\n", self.source_table));
        if !self.group_by.is_empty() {
            out.push_str(indent);
            out.push_str(&format!("GROUP BY {}\n", self.group_by.join(", ")));
        }
    }
}

fn build_select_block(mapping: &TableMapping) -> Result<SelectBlock, SynthesisError> {
    // First pass: the source-side value expression for every non-generated
    // column. Pivot rewrites happen here so generated ratios substitute
    // the aggregated shape, not the raw value column.
    let mut value_exprs: BTreeMap<&str, String> = BTreeMap::new();
    let mut group_by: Vec<String> = Vec::new();
    let mut has_pivot = false;

    for cm in &mapping.column_mappings {
        let SourceRef::Column(source) = &cm.source_column else {
            continue;
        };
        let expr = match &cm.transformation {
            Some(t) if t.contains(" WHERE ") => {
                has_pivot = true;
                pivot_expression(t).ok_or_else(|| SynthesisError::AmbiguousPivot {
                    table: mapping.target_table.clone(),
                    expression: t.clone(),
                })?
            }
            Some(t) => t.clone(),
            None => source.clone(),
        };
        if !expr.starts_with("MAX(IF(") {
            group_by.push(expr.clone());
        }
        value_exprs.insert(cm.target_column.as_str(), expr);
    }

    let mut columns = Vec::new();
    let mut lines = Vec::new();
    for cm in &mapping.column_mappings {
        columns.push(cm.target_column.clone());
        lines.push(projection_line(cm, &value_exprs));
    }

    Ok(SelectBlock {
        columns,
        lines,
        source_table: mapping.source_table.clone(),
        group_by: if has_pivot { group_by } else { Vec::new() },
    })
}

fn projection_line(cm: &ColumnMapping, value_exprs: &BTreeMap<&str, String>) -> String {
    let target = &cm.target_column;
    match &cm.source_column {
        SourceRef::Unmapped => format!("NULL AS {target}"),
        SourceRef::Generated => {
            let expr = cm.transformation.as_deref().unwrap_or("NULL");
            let expr = substitute_identifiers(expr, value_exprs);
            format!("{expr} AS {target}  /* generated default */")
        }
        SourceRef::Column(_) => {
            // Resolved in the first pass; every Column mapping has an entry.
            let expr = value_exprs
                .get(target.as_str())
                .cloned()
                .unwrap_or_else(|| target.clone());
            format!("{expr} AS {target}")
        }
    }
}

/// Rewrite the `value_col WHERE disc = 'LIT'` wire form as a pivot
/// aggregate
fn pivot_expression(transformation: &str) -> Option<String> {
    let (value, condition) = transformation.split_once(" WHERE ")?;
    let value = value.trim();
    let condition = condition.trim();
    if value.is_empty() || !condition.contains('=') {
        return None;
    }
    Some(format!("MAX(IF({condition}, {value}, NULL))"))
}

/// Replace target-column identifiers in a generated expression with their
/// source-side value expressions
///
/// Scans outside single-quoted literals only; identifiers not in the map
/// pass through untouched.
fn substitute_identifiers(expr: &str, value_exprs: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(expr.len());
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    let mut in_literal = false;

    while i < chars.len() {
        let c = chars[i];
        if in_literal {
            out.push(c);
            if c == '\'' {
                in_literal = false;
            }
            i += 1;
        } else if c == '\'' {
            in_literal = true;
            out.push(c);
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            match value_exprs.get(word.as_str()) {
                Some(replacement) => out.push_str(replacement),
                None => out.push_str(&word),
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn write_insert(out: &mut String, target: &str, columns: &[String], blocks: &[SelectBlock]) {
    out.push_str(&format!("INSERT INTO `{}` ({})\n", target, columns.join(", ")));
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push_str("UNION ALL\n");
        }
        block.write(out, "");
    }
    finish_statement(out);
}

fn write_merge(
    out: &mut String,
    target: &str,
    columns: &[String],
    primary_key: &[String],
    blocks: &[SelectBlock],
) {
    out.push_str(&format!("MERGE INTO `{target}` AS T\nUSING (\n"));
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push_str("  UNION ALL\n");
        }
        block.write(out, "  ");
    }
    out.push_str(") AS S\n");

    let on: Vec<String> = primary_key
        .iter()
        .map(|k| format!("T.{k} = S.{k}"))
        .collect();
    out.push_str(&format!("ON {}\n", on.join(" AND ")));

    let non_key: Vec<String> = columns
        .iter()
        .filter(|c| !primary_key.contains(c))
        .map(|c| format!("  {c} = S.{c}"))
        .collect();
    if non_key.is_empty() {
        // Key-only table: nothing to update, insert misses only.
        out.push_str("WHEN NOT MATCHED THEN INSERT (");
    } else {
        out.push_str("WHEN MATCHED THEN UPDATE SET\n");
        out.push_str(&non_key.join(",\n"));
        out.push_str("\nWHEN NOT MATCHED THEN INSERT (");
    }
    out.push_str(&columns.join(", "));
    out.push_str(")\nVALUES (");
    let values: Vec<String> = columns.iter().map(|c| format!("S.{c}")).collect();
    out.push_str(&values.join(", "));
    out.push_str(")\n");
    finish_statement(out);
}

fn finish_statement(out: &mut String) {
    // Move the terminator onto the last content line.
    if out.ends_with('\n') {
        out.pop();
    }
    out.push_str(";\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapsmith_core::{
        ColumnMapping, ConfidenceTier, MappingError, MappingErrorCode, MappingMetadata,
        MappingMode, MappingSet, OverallConfidence, SemanticType, Severity, TableMapping,
    };
    use pretty_assertions::assert_eq;

    fn set_with(mappings: Vec<TableMapping>) -> MappingSet {
        MappingSet {
            metadata: MappingMetadata {
                source_dataset: "proj.staging".to_string(),
                target_dataset: "proj.target".to_string(),
                generated_at: "2026-01-01T00:00:00Z".to_string(),
                confidence: OverallConfidence::High,
                mode: MappingMode::Fix,
            },
            mappings,
        }
    }

    fn indicator_mapping(source: &str) -> TableMapping {
        let mut mapping = TableMapping::new(
            format!("proj.staging.{source}"),
            "proj.target.fact_indicator_values",
        );
        mapping.match_confidence = 1.0;
        mapping.column_mappings = vec![
            ColumnMapping::mapped(
                "country_code",
                "country_code",
                SemanticType::String,
                SemanticType::String,
                100,
                ConfidenceTier::High,
            ),
            ColumnMapping::mapped(
                "year",
                "year",
                SemanticType::Integer,
                SemanticType::Integer,
                100,
                ConfidenceTier::High,
            ),
            ColumnMapping::mapped(
                "value",
                "value",
                SemanticType::Float,
                SemanticType::Float,
                100,
                ConfidenceTier::High,
            ),
            ColumnMapping::generated(
                "data_source",
                SemanticType::String,
                format!("'{source}'"),
            ),
        ];
        mapping.primary_key = vec!["country_code".to_string(), "year".to_string()];
        mapping
    }

    #[test]
    fn direct_insert_aliases_every_projection() {
        let mut mapping = indicator_mapping("gdp");
        mapping.column_mappings[1] = ColumnMapping::mapped(
            "yr",
            "year",
            SemanticType::String,
            SemanticType::Integer,
            96,
            ConfidenceTier::Medium,
        )
        .with_transformation("SAFE_CAST(yr AS INTEGER)");

        let sql = synthesize(&set_with(vec![mapping]), &SqlOptions::default()).unwrap();

        assert!(sql.contains(
            "INSERT INTO `proj.target.fact_indicator_values` (country_code, year, value, data_source)"
        ));
        assert!(sql.contains("country_code AS country_code"));
        assert!(sql.contains("SAFE_CAST(yr AS INTEGER) AS year"));
        assert!(sql.contains("'gdp' AS data_source  /* generated default */"));
        assert!(sql.contains("FROM `proj.staging.gdp`;"));
    }

    #[test]
    fn fan_in_emits_one_select_per_source() {
        let set = set_with(vec![
            indicator_mapping("gdp"),
            indicator_mapping("population"),
            indicator_mapping("literacy"),
        ]);
        let sql = synthesize(&set, &SqlOptions::default()).unwrap();

        assert_eq!(sql.matches("SELECT").count(), 3);
        assert_eq!(sql.matches("UNION ALL").count(), 2);
        assert_eq!(sql.matches("INSERT INTO").count(), 1);
        assert!(sql.contains(
            "-- proj.staging.gdp, proj.staging.population, proj.staging.literacy -> proj.target.fact_indicator_values"
        ));
    }

    fn pivot_mapping() -> TableMapping {
        let mut mapping = TableMapping::new(
            "proj.staging.indicators_long",
            "proj.target.agg_country_stats",
        );
        mapping.match_confidence = 0.9;
        mapping.column_mappings = vec![
            ColumnMapping::mapped(
                "country_code",
                "country_code",
                SemanticType::String,
                SemanticType::String,
                100,
                ConfidenceTier::High,
            ),
            ColumnMapping::mapped(
                "value",
                "gdp",
                SemanticType::Float,
                SemanticType::Float,
                85,
                ConfidenceTier::Medium,
            )
            .with_transformation("value WHERE indicator = 'GDP'"),
            ColumnMapping::mapped(
                "value",
                "population",
                SemanticType::Float,
                SemanticType::Float,
                85,
                ConfidenceTier::Medium,
            )
            .with_transformation("value WHERE indicator = 'POP'"),
            ColumnMapping::generated(
                "gdp_per_capita",
                SemanticType::Float,
                "SAFE_DIVIDE(gdp, population)",
            ),
        ];
        mapping.primary_key = vec!["country_code".to_string()];
        mapping
    }

    #[test]
    fn pivot_rewrites_discriminants_and_groups_by_keys() {
        let sql = synthesize(&set_with(vec![pivot_mapping()]), &SqlOptions::default()).unwrap();

        assert!(sql.contains("MAX(IF(indicator = 'GDP', value, NULL)) AS gdp"));
        assert!(sql.contains("MAX(IF(indicator = 'POP', value, NULL)) AS population"));
        assert!(sql.contains("GROUP BY country_code;"));
    }

    #[test]
    fn generated_ratio_substitutes_pivot_shapes() {
        let sql = synthesize(&set_with(vec![pivot_mapping()]), &SqlOptions::default()).unwrap();

        assert!(sql.contains(
            "SAFE_DIVIDE(MAX(IF(indicator = 'GDP', value, NULL)), \
             MAX(IF(indicator = 'POP', value, NULL))) AS gdp_per_capita  /* generated default */"
        ));
    }

    #[test]
    fn unparsable_pivot_is_ambiguous_not_guessed() {
        let mut mapping = pivot_mapping();
        mapping.column_mappings[1] = ColumnMapping::mapped(
            "value",
            "gdp",
            SemanticType::Float,
            SemanticType::Float,
            85,
            ConfidenceTier::Medium,
        )
        .with_transformation("value WHERE gdp rows only");

        let err = synthesize(&set_with(vec![mapping]), &SqlOptions::default()).unwrap_err();
        assert!(matches!(err, SynthesisError::AmbiguousPivot { .. }));
    }

    #[test]
    fn merge_lists_agree_with_insert_projection() {
        let set = set_with(vec![indicator_mapping("gdp")]);
        let sql = synthesize(&set, &SqlOptions { idempotent: true }).unwrap();

        assert!(sql.contains("MERGE INTO `proj.target.fact_indicator_values` AS T"));
        assert!(sql.contains("ON T.country_code = S.country_code AND T.year = S.year"));
        assert!(sql.contains("WHEN MATCHED THEN UPDATE SET\n  value = S.value,\n  data_source = S.data_source"));
        assert!(sql.contains(
            "WHEN NOT MATCHED THEN INSERT (country_code, year, value, data_source)\nVALUES (S.country_code, S.year, S.value, S.data_source);"
        ));
        // The USING subquery carries the same projection as the plain path.
        assert!(sql.contains("  SELECT\n    country_code AS country_code"));
    }

    #[test]
    fn merge_without_primary_key_is_an_error() {
        let mut mapping = indicator_mapping("gdp");
        mapping.primary_key.clear();

        let err = synthesize(&set_with(vec![mapping]), &SqlOptions { idempotent: true })
            .unwrap_err();
        assert_eq!(
            err,
            SynthesisError::MissingPrimaryKey {
                table: "proj.target.fact_indicator_values".to_string()
            }
        );
    }

    #[test]
    fn unmapped_sentinel_projects_null() {
        let mut mapping = indicator_mapping("gdp");
        mapping.column_mappings[2] = ColumnMapping {
            source_column: mapsmith_core::SourceRef::Unmapped,
            target_column: "value".to_string(),
            source_type: mapsmith_core::SourceType::Missing,
            target_type: SemanticType::Float,
            transformation: None,
            confidence: 0,
            tier: ConfidenceTier::Low,
            notes: String::new(),
        };

        let sql = synthesize(&set_with(vec![mapping]), &SqlOptions::default()).unwrap();
        assert!(sql.contains("NULL AS value"));
    }

    #[test]
    fn error_mappings_are_skipped_with_a_comment() {
        let mut broken = TableMapping::new("NO_MATCHING_SOURCE_TABLES", "proj.target.dim_country");
        broken.mapping_errors.push(MappingError::new(
            MappingErrorCode::NoMatchingSourceTable,
            Severity::Error,
            "No source table paired with proj.target.dim_country",
        ));

        let sql = synthesize(
            &set_with(vec![broken, indicator_mapping("gdp")]),
            &SqlOptions::default(),
        )
        .unwrap();

        assert!(sql.contains(
            "-- SKIPPED proj.target.dim_country: No source table paired with proj.target.dim_country"
        ));
        assert!(sql.contains("INSERT INTO `proj.target.fact_indicator_values`"));
    }

    #[test]
    fn load_order_is_dim_fact_agg() {
        let mut dim = indicator_mapping("countries");
        dim.target_table = "proj.target.dim_country".to_string();
        let fact = indicator_mapping("gdp");
        let agg = pivot_mapping();

        // Deliberately out of order in the input.
        let sql = synthesize(&set_with(vec![agg, fact, dim]), &SqlOptions::default()).unwrap();

        let dim_pos = sql.find("dim_country").unwrap();
        let fact_pos = sql.find("fact_indicator_values").unwrap();
        let agg_pos = sql.find("agg_country_stats").unwrap();
        assert!(dim_pos < fact_pos);
        assert!(fact_pos < agg_pos);
    }

    #[test]
    fn identical_input_produces_identical_bytes() {
        let set = set_with(vec![indicator_mapping("gdp"), pivot_mapping()]);
        let first = synthesize(&set, &SqlOptions::default()).unwrap();
        let second = synthesize(&set, &SqlOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn truncated_json_is_repaired_with_a_warning() {
        let json = set_with(vec![
            indicator_mapping("gdp"),
            indicator_mapping("population"),
        ])
        .to_json()
        .unwrap();
        // Chop mid-way through the second mapping; repair drops it whole.
        let truncated = &json[..json.len() - 40];

        let sql = synthesize_from_json(truncated, &SqlOptions::default()).unwrap();
        assert!(sql.starts_with("-- WARNING: mapping input was repaired"));
        assert!(sql.contains("dropped dangling partial element"));
        assert!(sql.contains("FROM `proj.staging.gdp`"));
    }

    #[test]
    fn hopeless_json_reports_parse_location() {
        let err = synthesize_from_json("not json", &SqlOptions::default()).unwrap_err();
        assert!(matches!(err, SynthesisError::Malformed { line: 1, .. }));
    }
}
