//! Mapsmith SQL
//!
//! Back half of the pipeline: turns a `MappingSet` into an executable load
//! script (INSERT, UNION ALL fan-in, MAX(IF) pivots, idempotent MERGE),
//! with a best-effort repair guard for structurally broken mapping JSON.

pub mod repair;
pub mod synthesizer;

pub use repair::{repair_json, repair_with, RepairOutcome};
pub use synthesizer::{synthesize, synthesize_from_json, SqlOptions, SynthesisError};
