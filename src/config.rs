use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Concurrency used for every fan-out against the rate-limited providers.
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_REPLY_CHECK_LIMIT: usize = 50;
pub const DEFAULT_HISTORY_THREADS: usize = 3;
pub const DEFAULT_MAX_IMPORT: usize = 5000;

/// Environment variable that overrides [`OutreachConfig::base_url`].
pub const BASE_URL_ENV: &str = "OUTREACH_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    /// Maximum number of provider calls in flight for one batch.
    pub concurrency: usize,
    /// Public URL of the deployment, used for the open-tracking pixel.
    pub base_url: String,
    /// How many of the newest sent emails are checked for replies.
    pub reply_check_limit: usize,
    /// Threads fetched per contact as history for draft generation.
    pub history_threads: usize,
    /// Maximum rows accepted by one contact import.
    pub max_import: usize,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            base_url: DEFAULT_BASE_URL.to_string(),
            reply_check_limit: DEFAULT_REPLY_CHECK_LIMIT,
            history_threads: DEFAULT_HISTORY_THREADS,
            max_import: DEFAULT_MAX_IMPORT,
        }
    }
}

impl OutreachConfig {
    /// Load a TOML config file, apply environment overrides and validate the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.reply_check_limit == 0 {
            return Err(ConfigError::Invalid(
                "reply_check_limit must be at least 1".into(),
            ));
        }
        if self.max_import == 0 {
            return Err(ConfigError::Invalid("max_import must be at least 1".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
