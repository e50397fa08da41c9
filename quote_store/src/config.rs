//! Pipeline configuration.
//!
//! Everything path- or policy-shaped is carried in one explicit
//! [`PipelineConfig`] handed to each component; no global mutable state.
//! The struct deserializes from TOML with full defaults, so a config file
//! only needs the keys it wants to override.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use quote_ingestor::normalize::UnitHeuristic;

/// Paths and retention policy for one pipeline run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Directory for intermediate snapshots (crawled JSON/CSV).
    pub data_dir: PathBuf,
    /// Root directory for per-table archive files.
    pub archive_dir: PathBuf,
    /// Append-only run log.
    pub log_file: PathBuf,
    /// Keep-last-N-distinct-dates retention parameter.
    pub retention_days: u32,
    /// Magnitude-normalization rules applied during normalization.
    pub heuristics: Vec<UnitHeuristic>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_data_dir(Path::new("data"), 365)
    }
}

impl PipelineConfig {
    /// Conventional layout rooted at `data_dir`, as the original scripts
    /// used: `gold.db`, `archive/`, and `daily_update.log` inside it.
    pub fn from_data_dir(data_dir: &Path, retention_days: u32) -> Self {
        Self {
            db_path: data_dir.join("gold.db"),
            data_dir: data_dir.to_path_buf(),
            archive_dir: data_dir.join("archive"),
            log_file: data_dir.join("daily_update.log"),
            retention_days,
            heuristics: vec![UnitHeuristic::sjc_default()],
        }
    }

    /// Load from a TOML file; unknown keys are an error.
    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&body).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
            retention_days = 90

            [[heuristics]]
            label = "SJC"
            threshold = 100000.0
            factor = 1000000.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.retention_days, 90);
        assert_eq!(cfg.db_path, PathBuf::from("data/gold.db"));
        assert_eq!(cfg.heuristics.len(), 1);
        assert_eq!(cfg.heuristics[0].threshold, 100_000.0);
    }

    #[test]
    fn unknown_keys_error() {
        assert!(toml::from_str::<PipelineConfig>("nope = 1").is_err());
    }
}
