//! Configuration management for cpu-profile
//!
//! Config file location:
//! - Linux: ~/.config/cpu-profile/config.toml
//! - macOS: ~/Library/Application Support/cpu-profile/config.toml
//! - Windows: %APPDATA%/cpu-profile/config.toml
//!
//! You can override the config location by setting `CPU_PROFILE_CONFIG_PATH`.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::probe::{ProbeSettings, SystemRunner};

pub const CONFIG_PATH_ENV: &str = "CPU_PROFILE_CONFIG_PATH";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Probing behaviour
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Output preferences
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from file or fall back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path; a missing file means defaults
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, toml)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        let proj_dirs = ProjectDirs::from("org", "cpu-profile", "cpu-profile")
            .context("Could not determine project directories")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Load the config and write the defaults if no file exists yet
    pub fn init() -> Result<Self> {
        let config_path = Self::config_path()?;
        let config = Self::load_from(&config_path)?;
        if !config_path.exists() {
            config.save_to(&config_path)?;
        }
        Ok(config)
    }
}

/// Probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-command timeout in seconds; 0 waits forever
    #[serde(default = "default_timeout")]
    pub command_timeout_seconds: u64,

    /// CPU descriptor source read on Linux
    #[serde(default = "default_cpuinfo_path")]
    pub cpuinfo_path: PathBuf,

    /// Distribution banner read on Linux
    #[serde(default = "default_issue_path")]
    pub issue_path: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command_timeout_seconds: default_timeout(),
            cpuinfo_path: default_cpuinfo_path(),
            issue_path: default_issue_path(),
        }
    }
}

impl ProbeConfig {
    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            cpuinfo_path: self.cpuinfo_path.clone(),
            issue_path: self.issue_path.clone(),
        }
    }

    pub fn runner(&self) -> SystemRunner {
        SystemRunner::with_timeout_secs(self.command_timeout_seconds)
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_cpuinfo_path() -> PathBuf {
    ProbeSettings::default().cpuinfo_path
}

fn default_issue_path() -> PathBuf {
    ProbeSettings::default().issue_path
}

fn default_true() -> bool {
    true
}

/// Profile rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Boxed table
    #[default]
    Text,
    /// Flat JSON record
    Json,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Colored terminal output
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            color: default_true(),
        }
    }
}

/// Get configuration file path for display purposes
pub fn get_config_path() -> Result<String> {
    let path = Config::config_path()?;
    Ok(path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.probe.command_timeout_seconds, 30);
        assert_eq!(config.probe.cpuinfo_path, PathBuf::from("/proc/cpuinfo"));
        assert_eq!(config.probe.issue_path, PathBuf::from("/etc/issue"));
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.output.color);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();

        assert!(toml.contains("[probe]"));
        assert!(toml.contains("command_timeout_seconds"));
        assert!(toml.contains("cpuinfo_path"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("format = \"text\""));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[probe]
command_timeout_seconds = 0

[output]
format = "json"
"#,
        )
        .unwrap();

        assert_eq!(config.probe.command_timeout_seconds, 0);
        assert_eq!(config.probe.runner().timeout(), None);
        assert_eq!(config.probe.cpuinfo_path, PathBuf::from("/proc/cpuinfo"));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.color);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.probe.command_timeout_seconds = 5;
        config.probe.cpuinfo_path = PathBuf::from("/srv/fixtures/cpuinfo");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.probe.runner().timeout(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            loaded.probe.settings().cpuinfo_path,
            PathBuf::from("/srv/fixtures/cpuinfo")
        );
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[probe]\ncommand_timeout_seconds = \"soon\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
