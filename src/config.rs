//! Session configuration.
//!
//! A session is configured once, before any player interacts with it: the
//! shared secret that gates start/restart and the default game options used
//! when a start command does not carry its own. Misconfiguration is reported
//! here, at construction, rather than surfacing mid-game.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::GameStartOptions;

/// Errors raised while building or loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be a positive integer")]
    NonPositive { field: &'static str },

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u32 },

    #[error("board of {cells} territories exceeds the limit of {max}")]
    BoardTooLarge { cells: u64, max: u64 },

    #[error("secret code must not be empty")]
    EmptySecretCode,

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything needed to construct one game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shared secret compared against start and restart requests.
    pub secret_code: String,
    /// Options used when a start request does not supply its own.
    #[serde(default)]
    pub options: GameStartOptions,
}

impl SessionConfig {
    pub fn new(secret_code: impl Into<String>, options: GameStartOptions) -> Self {
        SessionConfig {
            secret_code: secret_code.into(),
            options,
        }
    }

    /// Checks the secret and the default options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_code.trim().is_empty() {
            return Err(ConfigError::EmptySecretCode);
        }
        self.options.validate()
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}
