use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::insight_core::ForestOptions;

/// Engine configuration, loadable from TOML.
///
/// ```toml
/// [forest]
/// n_trees = 100
/// contamination = 0.05
/// seed = 42
///
/// [report]
/// preview_rows = 5
/// anomalies_only = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub forest: ForestOptions,
    pub report: ReportConfig,
}

/// Controls what the CLI prints and exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Rows shown in the dataset preview
    pub preview_rows: usize,
    /// Export only anomalous rows instead of the full augmented table
    pub anomalies_only: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            anomalies_only: false,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(toml_str: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(toml_str).context("failed to parse engine config")?;
        config.forest.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults when no file is given or it does not exist.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let Some(config_path) = path else {
            debug!("No config path given, using defaults");
            return Ok(Self::default());
        };

        if config_path.exists() {
            debug!(?config_path, "Loading config");
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("failed to read config: {}", config_path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("invalid config: {}", config_path.display()))
        } else {
            debug!(?config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.forest.contamination, 0.05);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.report.preview_rows, 5);
        assert!(!config.report.anomalies_only);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml_str("[forest]\nseed = 7\n").unwrap();
        assert_eq!(config.forest.seed, 7);
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = EngineConfig::default();
        config.forest.max_samples = Some(128);
        config.report.anomalies_only = true;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = EngineConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_contamination_rejected() {
        let result = EngineConfig::from_toml_str("[forest]\ncontamination = 0.8\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(EngineConfig::load(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[forest]\nn_trees = 50\ncontamination = 0.1").unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.forest.n_trees, 50);
        assert_eq!(config.forest.contamination, 0.1);
    }
}
