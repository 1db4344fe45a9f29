//! Engine configuration
//!
//! Loaded from `embedql.toml` in a directory. A `.env` file next to it is
//! loaded first, and the following environment variables override the file:
//!
//! - `EMBEDQL_TIMEZONE` - IANA zone for the `localtime`/`utc` date modifiers
//! - `EMBEDQL_LIKE_CASE_SENSITIVE` - `true`/`false`
//! - `EMBEDQL_LOG` - tracing filter directive

use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::portable::DEFAULT_ROOT_NAME;
use embedql_core::EvalOptions;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "embedql.toml";

/// Environment variable names
pub const ENV_TIMEZONE: &str = "EMBEDQL_TIMEZONE";
pub const ENV_LIKE_CASE_SENSITIVE: &str = "EMBEDQL_LIKE_CASE_SENSITIVE";
pub const ENV_LOG: &str = "EMBEDQL_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA time zone name
    pub timezone: String,
    /// LIKE compares case-sensitively
    pub like_case_sensitive: bool,
    /// Compiled size limit for patterns, in bytes
    pub regex_size_limit: usize,
    /// Maximum pattern length, in characters
    pub max_pattern_length: usize,
    /// Root object name written by the portable text codec
    pub root_object_name: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let options = EvalOptions::DEFAULT;
        Self {
            timezone: "UTC".to_string(),
            like_case_sensitive: options.like_case_sensitive,
            regex_size_limit: options.regex_size_limit,
            max_pattern_length: options.max_pattern_length,
            root_object_name: DEFAULT_ROOT_NAME.to_string(),
            log_filter: "embedql=info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a directory
    ///
    /// A missing `embedql.toml` yields the defaults; environment overrides
    /// apply either way.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        // Load env file if present (ignore errors)
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(timezone) = std::env::var(ENV_TIMEZONE) {
            if !timezone.is_empty() {
                self.timezone = timezone;
            }
        }

        if let Ok(flag) = std::env::var(ENV_LIKE_CASE_SENSITIVE) {
            match flag.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => self.like_case_sensitive = true,
                "false" | "0" | "no" => self.like_case_sensitive = false,
                _ => warn!("Ignoring {}={:?}: not a boolean", ENV_LIKE_CASE_SENSITIVE, flag),
            }
        }

        if let Ok(filter) = std::env::var(ENV_LOG) {
            if !filter.is_empty() {
                self.log_filter = filter;
            }
        }
    }

    /// Resolve the configured zone, falling back to UTC.
    pub fn tz(&self) -> Tz {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!("Unknown time zone '{}', using UTC", self.timezone);
                Tz::UTC
            }
        }
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            like_case_sensitive: self.like_case_sensitive,
            regex_size_limit: self.regex_size_limit,
            max_pattern_length: self.max_pattern_length,
            timezone: self.tz(),
        }
    }
}
