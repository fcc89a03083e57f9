//! Configuration schema (mapsmith.toml)

use serde::{Deserialize, Serialize};

use crate::mapping::MappingMode;

fn default_similarity_threshold() -> u8 {
    80
}

fn default_table_threshold() -> u8 {
    50
}

fn default_dialect() -> String {
    "bigquery".to_string()
}

/// Main configuration structure
///
/// All knobs are consumed by the pipeline, never produced by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Minimum column-name similarity (0-100) to accept a match
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: u8,

    /// Minimum table-pairing score (0-100) to pair a source with a target
    #[serde(default = "default_table_threshold")]
    pub table_threshold: u8,

    /// REPORT flags unmapped columns; FIX generates defaults for them
    #[serde(default)]
    pub mode: MappingMode,

    /// Emit MERGE statements instead of plain INSERT ... SELECT
    #[serde(default)]
    pub idempotent_merge: bool,

    /// Extra synonym groups merged into the built-in table,
    /// e.g. [["cust", "customer", "client"]]
    #[serde(default)]
    pub synonyms: Vec<Vec<String>>,

    /// SQL dialect tag carried through for operators and reports
    #[serde(default = "default_dialect")]
    pub dialect: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            table_threshold: default_table_threshold(),
            mode: MappingMode::default(),
            idempotent_merge: false,
            synonyms: Vec::new(),
            dialect: default_dialect(),
        }
    }
}

impl MapperConfig {
    /// Load config from a TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&contents)
    }

    /// Load config from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save config to a TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, toml).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = MapperConfig::default();
        assert_eq!(config.similarity_threshold, 80);
        assert_eq!(config.table_threshold, 50);
        assert_eq!(config.mode, MappingMode::Report);
        assert!(!config.idempotent_merge);
        assert_eq!(config.dialect, "bigquery");
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = MapperConfig::from_toml("mode = \"FIX\"\n").unwrap();
        assert_eq!(config.mode, MappingMode::Fix);
        assert_eq!(config.similarity_threshold, 80);
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut config = MapperConfig::default();
        config.synonyms = vec![vec!["cust".to_string(), "customer".to_string()]];

        let toml = toml::to_string(&config).unwrap();
        let parsed: MapperConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
