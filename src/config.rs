//! Dispatcher configuration.
//!
//! `Config` deserializes with serde, so it can sit inside whatever settings
//! struct the application already loads. Every field has a default.
//!
//! ```rust
//! use restgate::Config;
//!
//! let cfg: Config = serde_json::from_str(r#"{ "timeout_ms": 2500 }"#).unwrap();
//! assert_eq!(cfg.timeout(), Some(std::time::Duration::from_millis(2500)));
//! assert_eq!(cfg.accepted_content_types.len(), 2);
//! ```

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::gate::{parse_media_type, DEFAULT_CONTENT_TYPES};

/// Settings for an [`Api`](crate::Api).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Media type prefixes accepted on `POST`, `PUT` and `PATCH`.
    pub accepted_content_types: Vec<String>,

    /// Per-request deadline in milliseconds. `0` disables it.
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accepted_content_types: DEFAULT_CONTENT_TYPES.iter().map(|s| (*s).to_owned()).collect(),
            timeout_ms: 0,
        }
    }
}

/// A [`Config`] that cannot be used.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("accepted_content_types must not be empty")]
    NoContentTypes,

    #[error("accepted_content_types: `{0}` is not a media type")]
    InvalidContentType(String),
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Sets the timeout; `Duration::ZERO` disables it.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }

    /// Checks the accepted content types parse as media types.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accepted_content_types.is_empty() {
            return Err(ConfigError::NoContentTypes);
        }
        for t in &self.accepted_content_types {
            if t.contains(';') || parse_media_type(t).is_none() {
                return Err(ConfigError::InvalidContentType(t.clone()));
            }
        }
        Ok(())
    }
}
