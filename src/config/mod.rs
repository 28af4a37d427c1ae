//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (`OODLE_LIBRARY_DIR`, applied at resolution)
//! - CLI arguments

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::native::SupportedVersion;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Version probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[probe]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Directory holding the oo2core binaries. Defaults to the executable's
    /// directory.
    #[serde(default)]
    pub search_dir: Option<PathBuf>,
    /// Major versions that may be bound
    #[serde(default = "default_versions")]
    pub versions: Vec<u32>,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_versions() -> Vec<u32> {
    SupportedVersion::NEWEST_FIRST
        .iter()
        .map(|v| v.major())
        .collect()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            search_dir: None,
            versions: default_versions(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            probe: ProbeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.probe.versions.is_empty() {
            anyhow::bail!("probe.versions must name at least one version");
        }

        for &major in &self.probe.versions {
            if SupportedVersion::from_major(major).is_none() {
                anyhow::bail!("Unsupported oo2core version in probe.versions: {major}");
            }
        }

        if let Some(dir) = &self.probe.search_dir {
            if dir.as_os_str().is_empty() {
                anyhow::bail!("probe.search_dir is empty");
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, search_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = search_dir {
            self.probe.search_dir = Some(dir);
        }

        self
    }

    /// Allowed versions, skipping unknown majors.
    pub fn allowed_versions(&self) -> Vec<SupportedVersion> {
        self.probe
            .versions
            .iter()
            .filter_map(|&major| SupportedVersion::from_major(major))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.probe.search_dir, None);
        assert_eq!(config.probe.versions, vec![9, 8, 6, 5]);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [probe]
            search_dir = "/opt/oodle"
            "#,
        )
        .unwrap();

        assert_eq!(config.probe.search_dir, Some(PathBuf::from("/opt/oodle")));
        assert_eq!(config.probe.versions, vec![9, 8, 6, 5]);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_allowed_versions() {
        let config: Config = toml::from_str(
            r#"
            [probe]
            versions = [5, 8]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(
            config.allowed_versions(),
            vec![SupportedVersion::V5, SupportedVersion::V8]
        );
    }

    #[test]
    fn test_config_validation_unknown_version() {
        let mut config = Config::default_config();
        config.probe.versions = vec![9, 7];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_versions() {
        let mut config = Config::default_config();
        config.probe.versions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_level() {
        let mut config = Config::default_config();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let dir = PathBuf::from("/srv/bin");
        let config = Config::default_config().with_overrides(Some(dir.clone()));
        assert_eq!(config.probe.search_dir.as_ref(), Some(&dir));

        let config = config.with_overrides(None);
        assert_eq!(config.probe.search_dir, Some(dir));
    }

    #[test]
    fn test_load_from_file() {
        let name = format!("oodle-dyn-config-{}", std::process::id());
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[probe]\nversions = [6]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.allowed_versions(), vec![SupportedVersion::V6]);

        std::fs::write(&path, "[probe]\nversions = [4]\n").unwrap();
        assert!(Config::load(&path).is_err());
        assert!(Config::load(&dir.join("missing.toml")).is_err());
    }
}
