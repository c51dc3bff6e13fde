//! Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TASKFLOW_CONFIG_PATH";

/// Project-local config file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "taskflow/config.yaml";

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP API binds to.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("taskflow/taskflow.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    31995
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the first file found, then apply environment
    /// overrides.
    ///
    /// An explicit path (from `--config` or `TASKFLOW_CONFIG_PATH`) must
    /// exist; the implicit locations are skipped when absent.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Self::load(path)?
            }
            None => match Self::implicit_locations().into_iter().find(|p| p.is_file()) {
                Some(path) => {
                    debug!("Loading config from {}", path.display());
                    Self::load(path)?
                }
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Candidate config files searched when none is named explicitly.
    fn implicit_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("taskflow").join("config.yaml"));
        }
        paths
    }

    /// Apply `TASKFLOW_DB_PATH`, `TASKFLOW_HOST` and `TASKFLOW_PORT`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(db_path) = lookup("TASKFLOW_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }
        if let Some(host) = lookup("TASKFLOW_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TASKFLOW_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid TASKFLOW_PORT '{}'", port))?;
        }
        Ok(())
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
