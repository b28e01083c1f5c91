//! Configuration file support for Doseguard.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/doseguard/config.toml`.
//! Only the command-line boundary reads it; the engine takes every input
//! as an explicit argument.

use crate::types::PatientType;
use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Data storage configuration (override audit log)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Defaults applied when a command-line flag is omitted
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Patient type used when `--patient` is not given; unset means required
    #[serde(default)]
    pub patient_type: Option<PatientType>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

fn home_relative(fallback: &str) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(fallback),
        None => PathBuf::from("."),
    }
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_relative(".local/share"));
    base.join("doseguard")
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_relative(".config"));
        base.join("doseguard").join("config.toml")
    }

    /// Path of the override audit log inside the data directory
    pub fn override_log_path(data_dir: &Path) -> PathBuf {
        data_dir.join("audit").join("overrides.jsonl")
    }

    /// Path of the CSV archive the override log is rolled up into
    pub fn override_csv_path(data_dir: &Path) -> PathBuf {
        data_dir.join("overrides.csv")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    ///
    /// Writes to a temp file in the same directory and renames it over the
    /// target, so a crash never leaves a half-written config.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Config(format!("config path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
