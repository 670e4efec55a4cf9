//! Configuration management for sondeo.
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
use crate::sav::ReaderOptions;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "sondeo";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "users.db";

/// Default survey data file, relative to the working directory.
const DEFAULT_SAV_PATH: &str = "datos.sav";

/// Environment variable prefix.
const ENV_PREFIX: &str = "SONDEO_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SONDEO_`, sections separated by
///    a double underscore, e.g. `SONDEO_SERVER__PORT`)
/// 2. TOML config file at `~/.config/sondeo/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Survey data configuration.
    pub data: DataConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Profile listing configuration.
    pub profiles: ProfilesConfig,
}

/// Survey data file configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the `.sav` file.
    pub sav_path: PathBuf,
    /// Strip trailing spaces from string values.
    pub trim_strings: bool,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Allow cross-origin requests from any origin.
    pub cors: bool,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the profile database.
    /// Defaults to `~/.local/share/sondeo/users.db`
    pub database_path: Option<PathBuf>,
}

/// Profile listing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilesConfig {
    /// Page size when a listing does not ask for one.
    pub default_limit: usize,
    /// Largest page size a listing may ask for.
    pub max_limit: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sav_path: PathBuf::from(DEFAULT_SAV_PATH),
            trim_strings: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors: true,
        }
    }
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

impl ProfilesConfig {
    /// Resolve a requested page size against the configured bounds.
    #[must_use]
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `SONDEO_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.data.sav_path.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "data.sav_path must not be empty".to_string(),
            });
        }

        if self.profiles.default_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "profiles.default_limit must be greater than 0".to_string(),
            });
        }

        if self.profiles.default_limit > self.profiles.max_limit {
            return Err(Error::ConfigValidation {
                message: format!(
                    "profiles.default_limit ({}) cannot be greater than profiles.max_limit ({})",
                    self.profiles.default_limit, self.profiles.max_limit
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the address the server binds.
    ///
    /// # Errors
    ///
    /// Returns an error if `server.host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| Error::ConfigValidation {
            message: format!("invalid server address: {addr}"),
        })
    }

    /// Reader options derived from the data section.
    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            trim_strings: self.data.trim_strings,
            ..ReaderOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.data.sav_path, PathBuf::from("datos.sav"));
        assert!(config.data.trim_strings);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.cors);
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.profiles.default_limit, 100);
        assert_eq!(config.profiles.max_limit, 1000);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.port"));
    }

    #[test]
    fn test_validate_empty_sav_path() {
        let mut config = Config::default();
        config.data.sav_path = PathBuf::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("sav_path"));
    }

    #[test]
    fn test_validate_limits() {
        let mut config = Config::default();
        config.profiles.default_limit = 0;
        assert!(config.validate().is_err());

        config.profiles.default_limit = 2000;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_limit"));
    }

    #[test]
    fn test_clamp_limit() {
        let profiles = ProfilesConfig::default();
        assert_eq!(profiles.clamp_limit(None), 100);
        assert_eq!(profiles.clamp_limit(Some(5)), 5);
        assert_eq!(profiles.clamp_limit(Some(50_000)), 1000);
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("users.db"));
        assert!(path.to_string_lossy().contains("sondeo"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/users.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/users.sqlite")
        );
    }

    #[test]
    fn test_bind_addr() {
        let config = Config::default();
        assert_eq!(config.bind_addr().unwrap().port(), 8000);

        let mut config = Config::default();
        config.server.host = "not an ip".to_string();
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_reader_options_follow_config() {
        let mut config = Config::default();
        config.data.trim_strings = false;
        let options = config.reader_options();
        assert!(!options.trim_strings);
        assert!(options.user_missing_as_missing);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("sondeo"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[data]\nsav_path = \"/srv/encuesta/datos.sav\"\n\n[server]\nport = 9090\ncors = false\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.data.sav_path, PathBuf::from("/srv/encuesta/datos.sav"));
        assert_eq!(config.server.port, 9090);
        assert!(!config.server.cors);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 0\n").unwrap();

        let result = Config::load_from(Some(path));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("sav_path"));
        assert!(json.contains("default_limit"));
    }
}
