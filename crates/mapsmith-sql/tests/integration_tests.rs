//! End-to-end tests: snapshots through the mapping pipeline into SQL

use mapsmith_core::{ColumnSchema, MapperConfig, MappingMode, SemanticType, TableSchema};
use mapsmith_engine::{map_dataset, PipelineOptions, TableSnapshot};
use mapsmith_sql::{synthesize, synthesize_from_json, SqlOptions};

fn staging_source(table: &str) -> TableSnapshot {
    TableSnapshot::Available(TableSchema::new(
        format!("wb.staging.{table}"),
        vec![
            ColumnSchema::new("country_code", SemanticType::String),
            ColumnSchema::new("country_name", SemanticType::String),
            ColumnSchema::new("year", SemanticType::Integer),
            ColumnSchema::new("value", SemanticType::Float),
        ],
    ))
}

fn fact_target() -> TableSnapshot {
    TableSnapshot::Available(TableSchema::new(
        "wb.warehouse.fact_indicator_values",
        vec![
            ColumnSchema::required("country_code", SemanticType::String),
            ColumnSchema::required("year", SemanticType::Integer),
            ColumnSchema::new("value", SemanticType::Float),
            ColumnSchema::new("data_source", SemanticType::String),
            ColumnSchema::new("loaded_at", SemanticType::Timestamp),
        ],
    ))
}

fn options(mode: MappingMode) -> PipelineOptions {
    let mut config = MapperConfig::default();
    config.mode = mode;
    PipelineOptions::from_config(&config, "wb.staging", "wb.warehouse", "2026-02-01T00:00:00Z")
}

#[test]
fn report_mode_leaves_gaps_and_fix_mode_fills_them() {
    let sources = vec![staging_source("gdp"), staging_source("population")];
    let targets = vec![fact_target()];

    let report = map_dataset(&sources, &targets, &options(MappingMode::Report));
    let fix = map_dataset(&sources, &targets, &options(MappingMode::Fix));

    // Every column REPORT leaves unmapped is defaulted by FIX.
    for (report_mapping, fix_mapping) in report.mappings.iter().zip(&fix.mappings) {
        assert!(!report_mapping.unmapped_target_columns.is_empty());
        assert!(fix_mapping.unmapped_target_columns.is_empty());
        for column in &report_mapping.unmapped_target_columns {
            assert!(
                fix_mapping
                    .column_mappings
                    .iter()
                    .any(|cm| &cm.target_column == column),
                "FIX should default {column}"
            );
        }
    }

    let report_sql = synthesize(&report, &SqlOptions::default()).unwrap();
    let fix_sql = synthesize(&fix, &SqlOptions::default()).unwrap();

    // REPORT projects only what it mapped.
    assert!(report_sql.contains("(country_code, year, value)"));
    assert!(!report_sql.contains("data_source"));

    // FIX projects the full target shape with flagged defaults.
    assert!(fix_sql.contains("(country_code, year, value, data_source, loaded_at)"));
    assert!(fix_sql.contains("'gdp' AS data_source  /* generated default */"));
    assert!(fix_sql.contains("'population' AS data_source  /* generated default */"));
    assert!(fix_sql.contains("CURRENT_TIMESTAMP() AS loaded_at  /* generated default */"));
}

#[test]
fn fan_in_synthesizes_one_statement_over_both_sources() {
    let sources = vec![staging_source("gdp"), staging_source("population")];
    let set = map_dataset(&sources, &[fact_target()], &options(MappingMode::Fix));
    let sql = synthesize(&set, &SqlOptions::default()).unwrap();

    assert_eq!(sql.matches("INSERT INTO").count(), 1);
    assert_eq!(sql.matches("UNION ALL").count(), 1);
    assert!(sql.contains("FROM `wb.staging.gdp`"));
    assert!(sql.contains("FROM `wb.staging.population`"));
}

#[test]
fn merge_keys_on_the_inferred_fact_primary_key() {
    let set = map_dataset(
        &[staging_source("gdp")],
        &[fact_target()],
        &options(MappingMode::Fix),
    );
    let sql = synthesize(&set, &SqlOptions { idempotent: true }).unwrap();

    assert!(sql.contains("MERGE INTO `wb.warehouse.fact_indicator_values` AS T"));
    assert!(sql.contains("ON T.country_code = S.country_code AND T.year = S.year"));
    assert!(sql.contains("WHEN NOT MATCHED THEN INSERT (country_code, year, value, data_source, loaded_at)"));
}

#[test]
fn pipeline_output_is_byte_identical_across_runs() {
    let sources = vec![staging_source("gdp"), staging_source("population")];
    let targets = vec![fact_target()];
    let opts = options(MappingMode::Fix);

    let first = map_dataset(&sources, &targets, &opts);
    let second = map_dataset(&sources, &targets, &opts);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());

    let sql_options = SqlOptions { idempotent: true };
    assert_eq!(
        synthesize(&first, &sql_options).unwrap(),
        synthesize(&second, &sql_options).unwrap()
    );
}

#[test]
fn truncated_mapping_json_round_trips_through_repair() {
    let sources = vec![staging_source("gdp"), staging_source("population")];
    let set = map_dataset(&sources, &[fact_target()], &options(MappingMode::Fix));
    let json = set.to_json().unwrap();

    let intact = synthesize_from_json(&json, &SqlOptions::default()).unwrap();
    assert!(!intact.starts_with("-- WARNING"));

    let truncated = &json[..json.len() - 60];
    let repaired = synthesize_from_json(truncated, &SqlOptions::default()).unwrap();
    assert!(repaired.starts_with("-- WARNING: mapping input was repaired"));
    assert!(repaired.contains("FROM `wb.staging.gdp`"));
}
