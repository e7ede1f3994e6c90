//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use verity_pipeline::PipelineConfig;

/// CLI configuration, stored at `~/.verity/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Output settings
    #[serde(default)]
    pub settings: Settings,

    /// Evidence store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Model backend settings
    #[serde(default)]
    pub model: ModelSettings,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

/// Evidence store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Path to the SQLite corpus database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Ollama endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable format
    Table,
    /// JSON format
    Json,
    /// Quiet (answer text only) format
    Quiet,
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".verity").join("corpus.db"))
        .unwrap_or_else(|| PathBuf::from("verity-corpus.db"))
}

impl Config {
    /// Get the configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".verity").join("config.toml"))
    }

    /// Load configuration from the given path, the default location, or
    /// fall back to defaults.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p.clone(),
            None => Self::path()?,
        };

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            config
                .pipeline
                .validate()
                .map_err(CliError::Config)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, contents)?;
        Ok(())
    }
}
