//! Configuration management for formledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "formledger";

/// Default registrations file, relative to the working directory.
const REGISTRATIONS_FILE_NAME: &str = "registrations.csv";

/// Default dataset file, relative to the working directory.
const DATASET_FILE_NAME: &str = "data.csv";

/// Default directory for additional static assets.
const STATIC_DIR_NAME: &str = "public";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FORMLEDGER_`, `__` between sections)
/// 2. TOML config file at `~/.config/formledger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// File locations and storage behavior.
    pub storage: StorageConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Enable permissive CORS.
    pub cors: bool,
    /// Directory served for paths no route matches. `None` disables it.
    pub static_dir: Option<PathBuf>,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Append-only CSV file that receives registrations.
    pub registrations_path: PathBuf,
    /// CSV dataset exposed by `GET /data`.
    pub dataset_path: PathBuf,
    /// Columns removed from every dataset row.
    pub excluded_columns: Vec<String>,
    /// Number of pending appends the writer queue holds.
    pub writer_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            cors: true,
            static_dir: Some(PathBuf::from(STATIC_DIR_NAME)),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            registrations_path: PathBuf::from(REGISTRATIONS_FILE_NAME),
            dataset_path: PathBuf::from(DATASET_FILE_NAME),
            excluded_columns: default_excluded_columns(),
            writer_queue: 64,
        }
    }
}

/// Columns the dataset endpoint never exposes.
#[must_use]
pub fn default_excluded_columns() -> Vec<String> {
    vec!["Subcategory".to_string(), "Note".to_string()]
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FORMLEDGER_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(&config_file))
    }

    /// Build the layered figment for the given config file.
    ///
    /// Field names contain underscores, so sections are separated by `__`
    /// in environment variables: `FORMLEDGER_STORAGE__DATASET_PATH`.
    #[must_use]
    pub fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("FORMLEDGER_").split("__"))
    }

    /// Extract and validate a configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.writer_queue == 0 {
            return Err(Error::ConfigValidation {
                message: "writer_queue must be greater than 0".to_string(),
            });
        }

        // Appending registrations to the dataset would corrupt it.
        if self.storage.registrations_path == self.storage.dataset_path {
            return Err(Error::ConfigValidation {
                message: format!(
                    "registrations_path and dataset_path both point to {}",
                    self.storage.registrations_path.display()
                ),
            });
        }

        if self
            .storage
            .excluded_columns
            .iter()
            .any(|c| c.trim().is_empty())
        {
            return Err(Error::ConfigValidation {
                message: "excluded_columns cannot contain empty names".to_string(),
            });
        }

        Ok(())
    }

    /// Path of the registrations file.
    #[must_use]
    pub fn registrations_path(&self) -> &std::path::Path {
        &self.storage.registrations_path
    }

    /// Path of the dataset file.
    #[must_use]
    pub fn dataset_path(&self) -> &std::path::Path {
        &self.storage.dataset_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert!(config.server.cors);
        assert_eq!(config.server.static_dir, Some(PathBuf::from("public")));
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();

        assert_eq!(storage.registrations_path, PathBuf::from("registrations.csv"));
        assert_eq!(storage.dataset_path, PathBuf::from("data.csv"));
        assert_eq!(storage.excluded_columns, vec!["Subcategory", "Note"]);
        assert_eq!(storage.writer_queue, 64);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_writer_queue() {
        let mut config = Config::default();
        config.storage.writer_queue = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("writer_queue"));
    }

    #[test]
    fn test_validate_same_paths() {
        let mut config = Config::default();
        config.storage.dataset_path = config.storage.registrations_path.clone();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("registrations.csv"));
    }

    #[test]
    fn test_validate_empty_excluded_column() {
        let mut config = Config::default();
        config.storage.excluded_columns.push("  ".to_string());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("excluded_columns"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("formledger"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .expect("defaults load");
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_toml_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "formledger.toml",
                r#"
                [server]
                bind = "127.0.0.1:8080"
                cors = false

                [storage]
                dataset_path = "fixtures/budget.csv"
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("formledger.toml")))
                .expect("toml loads");
            assert_eq!(config.server.bind, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
            assert!(!config.server.cors);
            assert_eq!(config.storage.dataset_path, PathBuf::from("fixtures/budget.csv"));
            assert_eq!(config.storage.registrations_path, PathBuf::from("registrations.csv"));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "formledger.toml",
                r#"
                [storage]
                registrations_path = "from-file.csv"
                "#,
            )?;
            jail.set_env("FORMLEDGER_STORAGE__REGISTRATIONS_PATH", "from-env.csv");
            jail.set_env("FORMLEDGER_STORAGE__WRITER_QUEUE", "8");

            let config = Config::load_from(Some(PathBuf::from("formledger.toml")))
                .expect("env loads");
            assert_eq!(config.storage.registrations_path, PathBuf::from("from-env.csv"));
            assert_eq!(config.storage.writer_queue, 8);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "formledger.toml",
                r#"
                [storage]
                writer_queue = 0
                "#,
            )?;

            let result = Config::load_from(Some(PathBuf::from("formledger.toml")));
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("registrations_path"));
        assert!(json.contains("excluded_columns"));
    }

    #[test]
    fn test_storage_config_deserialize_partial() {
        let json = r#"{"dataset_path": "other.csv"}"#;
        let storage: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(storage.dataset_path, PathBuf::from("other.csv"));
        assert_eq!(storage.writer_queue, 64);
    }
}
