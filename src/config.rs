//! Configuration for statement classification and the allocator client.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Remote allocator connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Allocator URI, e.g. `http://127.0.0.1:9090`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Connection establishment timeout.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:9090".to_string()
}

const fn default_connect_timeout_ms() -> u64 {
    1_000
}

const fn default_request_timeout_ms() -> u64 {
    3_000
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Top-level idgate configuration.
///
/// # Examples
///
/// ```
/// use idgate::IdGateConfig;
///
/// let cfg = IdGateConfig::from_json_str(r#"{ "batch_list_key": "items" }"#).unwrap();
/// assert_eq!(cfg.batch_list_key, "items");
/// assert_eq!(cfg.single_markers, vec!["insert", "save"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGateConfig {
    /// Statement-name substrings selecting the single-record path.
    #[serde(default = "default_single_markers")]
    pub single_markers: Vec<String>,
    /// Statement-name substrings selecting the batch path.
    #[serde(default = "default_batch_markers")]
    pub batch_markers: Vec<String>,
    /// Argument name holding the record list of a batch call.
    #[serde(default = "default_batch_list_key")]
    pub batch_list_key: String,
    /// Remote allocator client settings.
    #[serde(default)]
    pub allocator: AllocatorConfig,
}

fn default_single_markers() -> Vec<String> {
    vec!["insert".to_string(), "save".to_string()]
}

fn default_batch_markers() -> Vec<String> {
    vec!["insertBatch".to_string(), "saveBatch".to_string()]
}

fn default_batch_list_key() -> String {
    "list".to_string()
}

impl Default for IdGateConfig {
    fn default() -> Self {
        Self {
            single_markers: default_single_markers(),
            batch_markers: default_batch_markers(),
            batch_list_key: default_batch_list_key(),
            allocator: AllocatorConfig::default(),
        }
    }
}

impl IdGateConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses, and validates a JSON config file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise as
    /// [`IdGateConfig::from_json_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Checks marker lists, list key, and timeouts.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_markers("single_markers", &self.single_markers)?;
        check_markers("batch_markers", &self.batch_markers)?;
        if self.batch_list_key.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "batch_list_key cannot be empty".to_string(),
            });
        }
        if self.allocator.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "allocator.endpoint cannot be empty".to_string(),
            });
        }
        if self.allocator.request_timeout_ms == 0 || self.allocator.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "allocator timeouts must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn check_markers(name: &str, markers: &[String]) -> Result<(), ConfigError> {
    if markers.is_empty() {
        return Err(ConfigError::Invalid {
            reason: format!("{name} cannot be empty"),
        });
    }
    if markers.iter().any(String::is_empty) {
        return Err(ConfigError::Invalid {
            reason: format!("{name} contains an empty marker"),
        });
    }
    Ok(())
}
