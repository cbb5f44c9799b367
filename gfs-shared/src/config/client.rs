use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use thiserror::Error;
use url::Url;

use super::LoadPolicy;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_BASE_URL: &str = "GFS_BASE_URL";
/// Environment variable overriding [`ClientConfig::log_level`].
pub const ENV_LOG_LEVEL: &str = "GFS_LOG_LEVEL";
/// Environment variable overriding [`ClientConfig::storage_path`].
pub const ENV_STORAGE_PATH: &str = "GFS_STORAGE_PATH";
/// Environment variable overriding [`ClientConfig::load_policy`].
pub const ENV_LOAD_POLICY: &str = "GFS_LOAD_POLICY";
/// Environment variable overriding [`ClientConfig::request_timeout_secs`].
pub const ENV_REQUEST_TIMEOUT: &str = "GFS_REQUEST_TIMEOUT_SECS";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

/// Errors raised while resolving a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
    /// The file extension is not a supported format.
    #[error("unsupported configuration format for {0}; use .yaml, .yml or .json")]
    UnsupportedFormat(PathBuf),
    /// The YAML file did not parse.
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yml::Error),
    /// The JSON file did not parse.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// An environment override could not be parsed.
    #[error("invalid {name} value '{value}': {reason}")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Raw value found in the environment
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Settings for the session client and the `gfs` binary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin of the API server; relative request targets resolve against it
    pub base_url: Url,

    /// Logging level used when `RUST_LOG` is not set
    pub log_level: String,

    /// File holding the persisted session
    pub storage_path: PathBuf,

    /// Handling of a stored user record that fails to parse
    pub load_policy: LoadPolicy,

    /// Optional per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClientConfig {
    /// Generates a default configuration.
    ///
    /// # Panics
    /// Never; the default base URL is a valid constant.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            log_level: "info".to_string(),
            storage_path: default_storage_path(),
            load_policy: LoadPolicy::default(),
            request_timeout_secs: None,
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// File values win over defaults. Environment variables only apply to
    /// fields the file left at their default.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if an
    /// environment override is malformed.
    pub fn load_config(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let defaults = Self::with_defaults();
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => defaults.clone(),
        };

        if config.base_url == defaults.base_url {
            if let Ok(value) = env::var(ENV_BASE_URL) {
                config.base_url = Url::parse(&value).map_err(|err| ConfigError::InvalidEnv {
                    name: ENV_BASE_URL,
                    value: value.clone(),
                    reason: err.to_string(),
                })?;
            }
        }
        if config.log_level == defaults.log_level {
            if let Ok(value) = env::var(ENV_LOG_LEVEL) {
                config.log_level = value;
            }
        }
        if config.storage_path == defaults.storage_path {
            if let Ok(value) = env::var(ENV_STORAGE_PATH) {
                config.storage_path = PathBuf::from(value);
            }
        }
        if config.load_policy == defaults.load_policy {
            if let Ok(value) = env::var(ENV_LOAD_POLICY) {
                config.load_policy = value.parse::<LoadPolicy>().map_err(|reason| ConfigError::InvalidEnv {
                    name: ENV_LOAD_POLICY,
                    value: value.clone(),
                    reason,
                })?;
            }
        }
        if config.request_timeout_secs.is_none() {
            if let Ok(value) = env::var(ENV_REQUEST_TIMEOUT) {
                let secs = value.parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_REQUEST_TIMEOUT,
                    value: value.clone(),
                    reason: "must be a whole number of seconds".to_string(),
                })?;
                config.request_timeout_secs = Some(secs);
            }
        }

        Ok(config)
    }

    fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Ok(serde_yml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(ConfigError::UnsupportedFormat(path)),
        }
    }

    /// Validate the configuration, collecting every problem found.
    ///
    /// # Errors
    /// Returns the list of problems when any field is unusable.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(self.base_url.scheme(), "http" | "https") {
            errors.push(format!(
                "base_url must use http or https, got '{}'",
                self.base_url.scheme()
            ));
        }
        if self.log_level.trim().is_empty() {
            errors.push("log_level must not be empty".to_string());
        }
        if self.storage_path.as_os_str().is_empty() {
            errors.push("storage_path must not be empty".to_string());
        }
        if self.request_timeout_secs == Some(0) {
            errors.push("request_timeout_secs must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Default location of the persisted session file.
#[must_use]
pub fn default_storage_path() -> PathBuf {
    BaseDirs::new().map_or_else(
        || PathBuf::from("./gfs-session.json"),
        |dirs| dirs.config_dir().join("gfs").join("session.json"),
    )
}
