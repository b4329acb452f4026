use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use push_core::Credential;
use push_dispatch::DispatchConfig;
use push_driver::DriverConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PUSHGATE_CONFIG";

/// Config file used when neither an argument nor [`CONFIG_ENV`] is given.
pub const DEFAULT_CONFIG_PATH: &str = "pushgate.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub dispatch: DispatchConfig,
    pub drivers: BTreeMap<String, DriverConfig>,
    pub credentials: Vec<CredentialConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path, or `memory` for a throwaway in-process store.
    #[serde(default = "default_database_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub id: String,
    pub api_key: String,
}

/// Storage backend selected by [`DatabaseConfig::url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Sqlite(String),
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_database_url() -> String {
    "pushgate.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl DatabaseConfig {
    pub fn kind(&self) -> StorageKind {
        match self.url.trim() {
            "memory" | ":memory:" => StorageKind::Memory,
            url => StorageKind::Sqlite(url.to_string()),
        }
    }
}

impl CredentialConfig {
    pub fn to_credential(&self) -> Credential {
        Credential::new(self.id.as_str(), self.api_key.as_str())
    }
}

impl Config {
    /// Load the config from the resolved path.
    pub fn load(arg: Option<String>) -> Result<Self, ConfigError> {
        let path = Self::config_path(arg, std::env::var(CONFIG_ENV).ok());
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Command-line argument first, then the environment, then the default.
    pub fn config_path(arg: Option<String>, env: Option<String>) -> PathBuf {
        arg.or(env)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Check cross-section references.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (platform, driver) in &self.dispatch.platforms {
            if !self.drivers.contains_key(driver.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "platform {platform} routes to unknown driver {driver}"
                )));
            }
        }

        for credential in &self.credentials {
            if credential.id.trim().is_empty() || credential.api_key.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "credentials need a non-empty id and api_key".to_string(),
                ));
            }
        }

        if self.dispatch.workers == 0 {
            return Err(ConfigError::Invalid("dispatch.workers must be at least 1".to_string()));
        }

        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}
