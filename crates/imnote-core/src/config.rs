//! Server and storage configuration.
//!
//! Configuration is read from a TOML file (`IMNOTE_CONFIG`, falling back
//! to `<config dir>/imnote/config.toml`), with a couple of environment
//! overrides on top. Every field has a default, so running with no config
//! file at all works.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const ENV_CONFIG: &str = "IMNOTE_CONFIG";
pub const ENV_ADDR: &str = "IMNOTE_ADDR";
pub const ENV_DATA_DIR: &str = "IMNOTE_DATA_DIR";

const NOTES_FILE: &str = "notes.json";
const THEMES_FILE: &str = "themes.json";
const PRESETS_FILE: &str = "presets.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP server.
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: "127.0.0.1:4816".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the database and the flat JSON files.
    pub data_dir: PathBuf,
    /// Database filename inside `data_dir`.
    pub db_file: String,
    /// How many recent notes the stats endpoint returns.
    pub stats_recent_limit: usize,
    /// Page size used when a notes listing does not pass `limit`.
    pub default_page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: PathBuf::from("./data"),
            db_file: "notes.db".to_string(),
            stats_recent_limit: 5,
            default_page_size: 20,
        }
    }
}

impl StorageConfig {
    /// Convenience for tests and callers that already know the directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        StorageConfig {
            data_dir: dir.into(),
            ..Default::default()
        }
    }

    // The flat-file names are fixed: earlier releases wrote this exact
    // layout, and the migration has to find it.
    pub fn notes_path(&self) -> PathBuf {
        self.data_dir.join(NOTES_FILE)
    }

    pub fn themes_path(&self) -> PathBuf {
        self.data_dir.join(THEMES_FILE)
    }

    pub fn presets_path(&self) -> PathBuf {
        self.data_dir.join(PRESETS_FILE)
    }
}

impl Config {
    /// Load configuration from disk and the environment. Never fails: an
    /// unreadable file is logged and replaced with defaults.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG)
            .map(PathBuf::from)
            .ok()
            .or_else(Self::standard_path);
        let mut config = match path {
            Some(path) if path.exists() => match Self::from_toml_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Config {} unreadable ({}), using defaults", path.display(), e);
                    Config::default()
                }
            },
            _ => Config::default(),
        };
        config.apply_env();
        config
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_toml(&raw)
    }

    fn standard_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("imnote").join("config.toml"))
    }

    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var(ENV_ADDR) {
            self.server.addr = addr;
        }
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server.addr is not a socket address: {}",
                self.server.addr
            )));
        }
        if self.storage.db_file.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.db_file is empty".to_string()));
        }
        if self.storage.default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "storage.default_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.addr, "127.0.0.1:4816");
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.storage.db_file, "notes.db");
        assert_eq!(config.storage.default_page_size, 20);
        assert_eq!(config.storage.stats_recent_limit, 5);
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let config = Config::from_toml(
            r#"
            [server]
            addr = "0.0.0.0:9000"

            [storage]
            data_dir = "/var/lib/imnote"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:9000");
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/imnote"));
        assert_eq!(config.storage.db_file, "notes.db");
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.addr, ServerConfig::default().addr);
    }

    #[test]
    fn bad_values_fail_validation() {
        let mut config = Config::default();
        config.server.addr = "not an address".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.default_page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.db_file = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn flat_file_paths_join_the_data_dir() {
        let storage = StorageConfig::in_dir("/tmp/x");
        assert_eq!(storage.notes_path(), PathBuf::from("/tmp/x/notes.json"));
        assert_eq!(storage.themes_path(), PathBuf::from("/tmp/x/themes.json"));
        assert_eq!(storage.presets_path(), PathBuf::from("/tmp/x/presets.json"));
    }
}
