use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SensError};

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "SENS_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.sens.ai/v1";

#[derive(Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Bearer token; falls back to `SENS_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

// The key never reaches logs through Debug
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL with trailing slashes removed
    pub fn normalized_base_url(&self) -> Result<String> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(SensError::local_validation("base URL must not be empty"));
        }
        Ok(trimmed.to_string())
    }

    /// Pick the configured key, else ask `lookup` for the environment value.
    ///
    /// Blank keys count as missing.
    pub fn resolve_api_key<F>(&self, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()));

        key.ok_or_else(|| {
            SensError::local_validation(format!(
                "API key required. Provide `api_key` or set the {} environment variable.",
                API_KEY_ENV
            ))
        })
    }
}
