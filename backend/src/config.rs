//! Runtime configuration.
//!
//! Defaults are overlaid by `config.yaml` in the data directory (when present)
//! and then by `SCHOOL_TRANSPORT_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::io::backup::remote_upload::DEFAULT_UPLOAD_ENDPOINT;

pub const CONFIG_FILE_NAME: &str = "config.yaml";

pub const ENV_DATA_DIR: &str = "SCHOOL_TRANSPORT_DATA_DIR";
pub const ENV_BIND: &str = "SCHOOL_TRANSPORT_BIND";
pub const ENV_UPLOAD_ENDPOINT: &str = "SCHOOL_TRANSPORT_UPLOAD_ENDPOINT";

/// Largest snapshot document `POST /api/snapshot/restore` accepts
pub const DEFAULT_MAX_RESTORE_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_directory: PathBuf,
    /// Relative paths resolve against `data_directory`
    pub database_file: PathBuf,
    /// None means `<data_directory>/backups`
    pub backup_directory: Option<PathBuf>,
    pub upload_endpoint: String,
    pub remote_timeout_secs: u64,
    pub bind_address: String,
    pub log_filter: String,
    pub max_restore_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            database_file: PathBuf::from("school_transport.db"),
            backup_directory: None,
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            remote_timeout_secs: 30,
            bind_address: "127.0.0.1:3000".to_string(),
            log_filter: "info".to_string(),
            max_restore_bytes: DEFAULT_MAX_RESTORE_BYTES,
        }
    }
}

fn default_data_directory() -> PathBuf {
    dirs::document_dir()
        .map(|docs| docs.join("School Transport"))
        .unwrap_or_else(|| PathBuf::from("./school-transport-data"))
}

impl AppConfig {
    /// Defaults, then `config.yaml`, then environment overrides
    pub fn load() -> Result<Self> {
        let data_directory = env::var_os(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_directory);

        let mut config = Self::load_from_dir(&data_directory)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Read `config.yaml` from `data_directory`, or fall back to defaults.
    /// A file that leaves out `data_directory` stays anchored to the
    /// directory it was read from.
    pub fn load_from_dir(data_directory: &Path) -> Result<Self> {
        let path = data_directory.join(CONFIG_FILE_NAME);

        if !path.exists() {
            return Ok(Self {
                data_directory: data_directory.to_path_buf(),
                ..Self::default()
            });
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?;
        let names_data_dir = value
            .as_mapping()
            .map(|m| m.contains_key("data_directory"))
            .unwrap_or(false);

        let mut config: AppConfig = serde_yaml::from_value(value)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        if !names_data_dir {
            config.data_directory = data_directory.to_path_buf();
        }

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(dir) = env::var_os(ENV_DATA_DIR) {
            self.data_directory = PathBuf::from(dir);
        }
        if let Ok(bind) = env::var(ENV_BIND) {
            self.bind_address = bind;
        }
        if let Ok(endpoint) = env::var(ENV_UPLOAD_ENDPOINT) {
            self.upload_endpoint = endpoint;
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        match &self.backup_directory {
            Some(dir) => self.resolve(dir),
            None => self.data_directory.join("backups"),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_directory.join(path)
        }
    }
}
