use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};

use mapsmith_catalog::{CachingAdapter, CatalogAdapter, SnapshotAdapter};
use mapsmith_core::{MapperConfig, MappingMode, MappingSet, OverallConfidence};
use mapsmith_engine::{map_dataset, PipelineOptions, TableSnapshot};
use mapsmith_sql::{synthesize, synthesize_from_json, SqlOptions};

/// Mapsmith - deterministic schema mapping and ETL SQL synthesis
#[derive(Parser)]
#[command(name = "mapsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: mapsmith.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Report,
    Fix,
}

impl From<ModeArg> for MappingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Report => MappingMode::Report,
            ModeArg::Fix => MappingMode::Fix,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Map a source dataset onto a target dataset
    Map {
        /// Source dataset id (catalog.dataset)
        #[arg(short, long)]
        source: String,

        /// Target dataset id (catalog.dataset)
        #[arg(short, long)]
        target: String,

        /// Path to the schema snapshot file
        #[arg(long)]
        snapshot: PathBuf,

        /// Mapping mode (overrides config)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Column similarity threshold 0-100 (overrides config)
        #[arg(long)]
        threshold: Option<u8>,

        /// Output file for the mapping JSON
        #[arg(short, long, default_value = "mapping.json")]
        output: PathBuf,
    },

    /// Synthesize load SQL from an existing mapping
    Sql {
        /// Path to the mapping JSON
        #[arg(short, long)]
        mapping: PathBuf,

        /// Emit idempotent MERGE statements instead of INSERTs
        #[arg(long)]
        merge: bool,

        /// Output file for the SQL script
        #[arg(short, long, default_value = "load.sql")]
        output: PathBuf,
    },

    /// Map and synthesize in one run
    Pipeline {
        /// Source dataset id (catalog.dataset)
        #[arg(short, long)]
        source: String,

        /// Target dataset id (catalog.dataset)
        #[arg(short, long)]
        target: String,

        /// Path to the schema snapshot file
        #[arg(long)]
        snapshot: PathBuf,

        /// Mapping mode (overrides config)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Emit idempotent MERGE statements instead of INSERTs
        #[arg(long)]
        merge: bool,

        /// Also write the intermediate mapping JSON
        #[arg(long)]
        mapping_out: Option<PathBuf>,

        /// Output file for the SQL script
        #[arg(short, long, default_value = "load.sql")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config if present
    let config = if let Some(config_path) = &cli.config {
        MapperConfig::from_file(config_path)?
    } else if Path::new("mapsmith.toml").exists() {
        MapperConfig::from_file(Path::new("mapsmith.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        MapperConfig::default()
    };

    if cli.verbose {
        eprintln!("{} dialect: {}", "Using".cyan(), config.dialect);
    }

    match cli.command {
        Commands::Map {
            source,
            target,
            snapshot,
            mode,
            threshold,
            output,
        } => {
            map_command(
                &config, &source, &target, &snapshot, mode, threshold, &output, cli.verbose,
            )
            .await
        }
        Commands::Sql {
            mapping,
            merge,
            output,
        } => sql_command(&config, &mapping, merge, &output, cli.verbose),
        Commands::Pipeline {
            source,
            target,
            snapshot,
            mode,
            merge,
            mapping_out,
            output,
        } => {
            pipeline_command(
                &config,
                &source,
                &target,
                &snapshot,
                mode,
                merge,
                mapping_out.as_deref(),
                &output,
                cli.verbose,
            )
            .await
        }
    }
}

/// Map command - introspect both datasets and produce a mapping set
#[allow(clippy::too_many_arguments)]
async fn map_command(
    config: &MapperConfig,
    source: &str,
    target: &str,
    snapshot: &Path,
    mode: Option<ModeArg>,
    threshold: Option<u8>,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    let set = run_mapping(config, source, target, snapshot, mode, threshold, verbose).await?;

    std::fs::write(output, set.to_json()?)?;
    if verbose {
        eprintln!("{} {}", "Mapping saved to:".green(), output.display());
    }

    print_mapping_summary(&set);

    if set.mappings.iter().any(|m| m.has_errors()) {
        std::process::exit(1);
    }
    Ok(())
}

/// Sql command - repair if needed and synthesize the load script
fn sql_command(
    config: &MapperConfig,
    mapping: &Path,
    merge: bool,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    let json = std::fs::read_to_string(mapping)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", mapping.display(), e))?;

    let options = SqlOptions {
        idempotent: merge || config.idempotent_merge,
    };
    let sql = synthesize_from_json(&json, &options)?;

    std::fs::write(output, &sql)?;
    if verbose {
        eprintln!("{} {}", "SQL saved to:".green(), output.display());
    }

    print_sql_summary(&sql);
    Ok(())
}

/// Pipeline command - map then synthesize in one run
#[allow(clippy::too_many_arguments)]
async fn pipeline_command(
    config: &MapperConfig,
    source: &str,
    target: &str,
    snapshot: &Path,
    mode: Option<ModeArg>,
    merge: bool,
    mapping_out: Option<&Path>,
    output: &Path,
    verbose: bool,
) -> Result<()> {
    let set = run_mapping(config, source, target, snapshot, mode, None, verbose).await?;

    if let Some(path) = mapping_out {
        std::fs::write(path, set.to_json()?)?;
        if verbose {
            eprintln!("{} {}", "Mapping saved to:".green(), path.display());
        }
    }

    print_mapping_summary(&set);

    let options = SqlOptions {
        idempotent: merge || config.idempotent_merge,
    };
    let sql = synthesize(&set, &options)?;

    std::fs::write(output, &sql)?;
    if verbose {
        eprintln!("{} {}", "SQL saved to:".green(), output.display());
    }

    print_sql_summary(&sql);

    if set.mappings.iter().any(|m| m.has_errors()) {
        std::process::exit(1);
    }
    Ok(())
}

/// Introspect both datasets through the snapshot adapter and run the
/// mapping pipeline
async fn run_mapping(
    config: &MapperConfig,
    source: &str,
    target: &str,
    snapshot: &Path,
    mode: Option<ModeArg>,
    threshold: Option<u8>,
    verbose: bool,
) -> Result<MappingSet> {
    if verbose {
        eprintln!(
            "{} {}",
            "Loading schema snapshot from:".cyan(),
            snapshot.display()
        );
    }

    let adapter = SnapshotAdapter::from_file(snapshot)
        .map_err(|e| anyhow::anyhow!("Failed to load snapshot {}: {}", snapshot.display(), e))?;
    let adapter = CachingAdapter::new(adapter);

    let sources = snapshot_dataset(&adapter, source, verbose).await?;
    let targets = snapshot_dataset(&adapter, target, verbose).await?;

    let mut options = PipelineOptions::from_config(
        config,
        source,
        target,
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    );
    if let Some(mode) = mode {
        options.mode = mode.into();
    }
    if let Some(threshold) = threshold {
        options.similarity_threshold = threshold;
    }

    if verbose {
        eprintln!(
            "{} {} source table(s) -> {} target table(s), mode {}",
            "Mapping".cyan(),
            sources.len(),
            targets.len(),
            options.mode
        );
    }

    Ok(map_dataset(&sources, &targets, &options))
}

/// Fetch every table in a dataset, isolating per-table failures
async fn snapshot_dataset<A: CatalogAdapter>(
    adapter: &A,
    dataset: &str,
    verbose: bool,
) -> Result<Vec<TableSnapshot>> {
    let tables = adapter
        .list_tables(dataset)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list tables in {}: {}", dataset, e))?;

    let mut snapshots = Vec::new();
    for table in tables {
        match adapter.fetch_schema(&table).await {
            Ok(schema) => snapshots.push(TableSnapshot::Available(schema)),
            Err(e) => {
                if verbose {
                    eprintln!("  {} {}: {}", "⚠".yellow(), table.fqn(), e);
                }
                snapshots.push(TableSnapshot::Unavailable {
                    table_id: table.fqn(),
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(snapshots)
}

/// Print mapping summary to stdout
fn print_mapping_summary(set: &MappingSet) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Schema Mapping Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!(
        "{} {} -> {}",
        "Datasets:".bold(),
        set.metadata.source_dataset,
        set.metadata.target_dataset
    );
    println!("{} {}", "Mode:".bold(), set.metadata.mode);

    let confidence = match set.metadata.confidence {
        OverallConfidence::High => "high".green().bold(),
        OverallConfidence::Medium => "medium".yellow().bold(),
        OverallConfidence::Low => "low".red().bold(),
    };
    println!("{} {}", "Overall confidence:".bold(), confidence);
    println!();

    for mapping in &set.mappings {
        println!(
            "  {} -> {}",
            mapping.source_table.yellow(),
            mapping.target_table.yellow()
        );
        println!(
            "    {} mapped, {} unmapped source, {} unmapped target",
            mapping.column_mappings.len(),
            mapping.unmapped_source_columns.len(),
            mapping.unmapped_target_columns.len()
        );
        for error in &mapping.mapping_errors {
            let severity = match error.severity {
                mapsmith_core::Severity::Error => "ERROR".red().bold(),
                mapsmith_core::Severity::Warning => "WARN".yellow().bold(),
            };
            println!("    [{}] {}: {}", severity, error.error_type.as_str(), error.message);
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Print synthesized SQL summary to stdout
fn print_sql_summary(sql: &str) {
    let statements = sql.matches(";\n").count();
    let skipped = sql.matches("-- SKIPPED").count();
    let repaired = sql.starts_with("-- WARNING");

    println!();
    println!("{} {} statement(s)", "Synthesized".green().bold(), statements);
    if skipped > 0 {
        println!("{} {} table(s) skipped", "⚠".yellow(), skipped);
    }
    if repaired {
        println!(
            "{}",
            "⚠ Input mapping was repaired before synthesis".yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
