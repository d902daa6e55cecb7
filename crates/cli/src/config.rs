//! Configuration management for the CLI

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Settings read from `~/.config/mediscan/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub default_format: Option<OutputFormat>,
    /// Used by `train` when `--data-dir` is not given
    pub data_dir: Option<PathBuf>,
    /// Used by `train` when `--models-dir` is not given
    pub models_dir: Option<PathBuf>,
}

impl Config {
    /// Load the user config; a missing file is an empty config
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("mediscan").join("config.json"))
    }

    /// Flag or env value first, then config file, then the default
    pub fn api_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.default_format).unwrap_or_default()
    }
}
