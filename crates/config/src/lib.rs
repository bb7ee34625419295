//! Configuration loading, validation, and management for oscfg.
//!
//! Loads configuration from `~/.oscfg/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.oscfg/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Namespace that secret references are resolved in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Content resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Overrides for the embedded unit and script payloads
    #[serde(default)]
    pub payloads: PayloadConfig,
}

fn default_namespace() -> String {
    "default".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Directory holding secrets as `<namespace>/<name>/<dataKey>` files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_dir: Option<PathBuf>,

    /// Per-file resolution timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How many file contents may be resolved at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_concurrent() -> usize {
    8
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            secrets_dir: None,
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl ResolverConfig {
    /// The timeout as a `Duration`, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Files that replace the built-in payloads. Unset entries keep the built-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command_unit: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command_script: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerd_drop_in: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgroupsv2_unit: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgroupsv2_script: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.oscfg/config.toml).
    ///
    /// Environment variables override file values:
    /// - `OSCFG_NAMESPACE`
    /// - `OSCFG_SECRETS_DIR`
    /// - `OSCFG_RESOLVE_TIMEOUT_SECS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;

        if let Ok(namespace) = std::env::var("OSCFG_NAMESPACE") {
            config.namespace = namespace;
        }

        if let Ok(dir) = std::env::var("OSCFG_SECRETS_DIR") {
            config.resolver.secrets_dir = Some(PathBuf::from(dir));
        }

        if let Ok(raw) = std::env::var("OSCFG_RESOLVE_TIMEOUT_SECS") {
            config.resolver.timeout_secs = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "OSCFG_RESOLVE_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".oscfg")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::ValidationError("namespace cannot be empty".into()));
        }

        if self.resolver.max_concurrent == 0 {
            return Err(ConfigError::ValidationError(
                "resolver.max_concurrent must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            resolver: ResolverConfig::default(),
            payloads: PayloadConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.resolver.max_concurrent, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.namespace, config.namespace);
        assert_eq!(parsed.resolver.timeout_secs, config.resolver.timeout_secs);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = AppConfig {
            resolver: ResolverConfig {
                max_concurrent: 0,
                ..ResolverConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_disables_it() {
        let resolver = ResolverConfig {
            timeout_secs: 0,
            ..ResolverConfig::default()
        };
        assert_eq!(resolver.timeout(), None);
        assert_eq!(
            ResolverConfig::default().timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.namespace, "default");
    }

    #[test]
    fn payload_overrides_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
namespace = "shoot--dev--local"

[resolver]
secrets_dir = "/var/lib/oscfg/secrets"
max_concurrent = 2

[payloads]
cgroupsv2_script = "/etc/oscfg/cgroups.sh"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.namespace, "shoot--dev--local");
        assert_eq!(
            config.resolver.secrets_dir,
            Some(PathBuf::from("/var/lib/oscfg/secrets"))
        );
        assert_eq!(config.resolver.max_concurrent, 2);
        assert_eq!(config.resolver.timeout_secs, 30);
        assert_eq!(
            config.payloads.cgroupsv2_script,
            Some(PathBuf::from("/etc/oscfg/cgroups.sh"))
        );
        assert!(config.payloads.run_command_script.is_none());
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "namespace = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("namespace = \"default\""));
        assert!(toml_str.contains("max_concurrent = 8"));
    }
}
