//! Mapsmith Engine
//!
//! The matching-and-assembly half of the pipeline: deterministic column
//! matching (lexical similarity plus an extensible synonym table), mapping
//! assembly with inferred keys and validation rules, and the dataset-level
//! pipeline with per-table failure isolation. Everything here is a pure
//! transformation of in-memory snapshots.

pub mod assembler;
pub mod matcher;
pub mod pipeline;

pub use assembler::{assemble_table, infer_primary_key};
pub use matcher::{
    match_columns, name_similarity, table_name_similarity, ColumnMatch, MatchOutcome, SynonymTable,
};
pub use pipeline::{
    map_dataset, PipelineOptions, TableSnapshot, NO_SOURCE_SENTINEL, NO_TARGET_SENTINEL,
};
