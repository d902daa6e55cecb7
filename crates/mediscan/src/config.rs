//! Server configuration

use anyhow::{Context, Result};
use mediscan_lib::credentials::DEFAULT_ROUNDS;
use mediscan_lib::ContextSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory (any format `config` reads)
pub const DEFAULT_CONFIG_FILE: &str = "mediscan";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name reported in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding `<key>_model.json` and friends
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Directory holding the reference CSV datasets
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_users_file")]
    pub users_file: PathBuf,

    /// PBKDF2 rounds for newly registered passwords
    #[serde(default = "default_password_rounds")]
    pub password_rounds: u32,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "mediscan".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_users_file() -> PathBuf {
    PathBuf::from("users.json")
}

fn default_password_rounds() -> u32 {
    DEFAULT_ROUNDS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            models_dir: default_models_dir(),
            data_dir: default_data_dir(),
            users_file: default_users_file(),
            password_rounds: default_password_rounds(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional `mediscan.toml` and `MEDISCAN_*` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE), false)
    }

    /// Load with an explicit config file; environment variables still win
    pub fn load_from(file: &Path, required: bool) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(file).required(required))
            .add_source(config::Environment::with_prefix("MEDISCAN"))
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", file))?;

        config
            .try_deserialize()
            .context("Invalid server configuration")
    }

    pub fn context_settings(&self) -> ContextSettings {
        ContextSettings {
            models_dir: self.models_dir.clone(),
            data_dir: self.data_dir.clone(),
            users_file: self.users_file.clone(),
            password_rounds: self.password_rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mediscan.toml");
        std::fs::write(&path, "api_port = 9191\nmodels_dir = \"/srv/models\"\n").unwrap();

        let config = ServerConfig::load_from(&path, true).unwrap();
        assert_eq!(config.api_port, 9191);
        assert_eq!(config.models_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.users_file, PathBuf::from("users.json"));
        assert_eq!(config.password_rounds, DEFAULT_ROUNDS);
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig::load_from(&dir.path().join("absent.toml"), false).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.context_settings().password_rounds, config.password_rounds);
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mediscan.toml");
        std::fs::write(&path, "api_port = \"not a port\"\n").unwrap();
        assert!(ServerConfig::load_from(&path, true).is_err());
    }
}
