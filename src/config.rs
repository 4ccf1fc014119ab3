//! Configuration file parsing
//!
//! Reads pg-migration-runner.toml configuration files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::engine::ledger;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub flyway: FlywayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Execution backend: "direct" or "flyway"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Name of the applied-migrations table in the target database
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            ledger_table: default_ledger_table(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Root directory of the filesystem object store (bucket = subdirectory)
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlywayConfig {
    /// Path to (or name of) the flyway binary
    #[serde(default = "default_flyway_binary")]
    pub binary_path: PathBuf,
}

impl Default for FlywayConfig {
    fn default() -> Self {
        Self {
            binary_path: default_flyway_binary(),
        }
    }
}

fn default_backend() -> String {
    "direct".to_string()
}

fn default_ledger_table() -> String {
    ledger::DEFAULT_TABLE.to_string()
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_flyway_binary() -> PathBuf {
    PathBuf::from("flyway")
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.backend.parse::<crate::engine::ExecutorKind>().is_err() {
            return Err(ConfigError::Validation(format!(
                "invalid backend value '{}'. Valid values: direct, flyway",
                self.runner.backend
            )));
        }
        if !ledger::is_valid_identifier(&self.runner.ledger_table) {
            return Err(ConfigError::Validation(format!(
                "invalid ledger_table '{}': must be a bare SQL identifier",
                self.runner.ledger_table
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: parse TOML into Config and run validation.
    fn parse_and_validate(toml_str: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.runner.backend, "direct");
        assert_eq!(config.runner.ledger_table, "schema_migrations");
        assert_eq!(config.flyway.binary_path, PathBuf::from("flyway"));
    }

    #[test]
    fn test_valid_backend_values() {
        for value in &["direct", "flyway"] {
            let toml = format!("[runner]\nbackend = \"{}\"", value);
            assert!(
                parse_and_validate(&toml).is_ok(),
                "backend = '{}' should be valid",
                value
            );
        }
    }

    #[test]
    fn test_invalid_backend_rejected() {
        let toml = "[runner]\nbackend = \"liquibase\"";
        let err = parse_and_validate(toml).unwrap_err();
        assert!(
            err.to_string().contains("invalid backend"),
            "Expected validation error, got: {}",
            err
        );
    }

    #[test]
    fn test_invalid_ledger_table_rejected() {
        let toml = "[runner]\nledger_table = \"public.schema_migrations\"";
        let err = parse_and_validate(toml).unwrap_err();
        assert!(err.to_string().contains("ledger_table"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = parse_and_validate("[store]\nroot = \"/var/artifacts\"").expect("parse");
        assert_eq!(config.store.root, PathBuf::from("/var/artifacts"));
        assert_eq!(config.runner.backend, "direct");
    }

    #[test]
    fn test_from_file_roundtrip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("pg-migration-runner.toml");
        std::fs::write(
            &path,
            "[runner]\nbackend = \"flyway\"\nledger_table = \"applied_migrations\"\n",
        )
        .expect("write");

        let config = Config::from_file(&path).expect("load");
        assert_eq!(config.runner.backend, "flyway");
        assert_eq!(config.runner.ledger_table, "applied_migrations");
    }
}
