//! Configuration module for the retention engine.
//!
//! The engine is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! type = "sqlite"
//! path = "archivist.db"
//!
//! [cache]
//! type = "redis"
//! url = "redis://localhost:6379"
//!
//! [cold_archive]
//! api_key = "${OAS_API_KEY}"
//! api_secret = "${OAS_API_SECRET}"
//!
//! [policy]
//! schedule = "0 30 2 * * *"
//! ```

mod archive;
mod cache;
mod database;
mod observability;
mod policy;
mod reconciler;
mod server;
mod signals;
mod storage;

use std::{path::Path, sync::LazyLock};

pub use archive::*;
pub use cache::*;
pub use database::*;
pub use observability::*;
pub use policy::*;
pub use reconciler::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
pub use server::*;
pub use signals::*;
pub use storage::*;

/// Root configuration.
///
/// All sections are optional with sensible defaults. A database is required
/// to run the periodic workers, everything else degrades gracefully.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchivistConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database holding records, policies and archival jobs.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cache backing the durable signal queues.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Cold archive (OAS) credentials and transport settings.
    #[serde(default)]
    pub cold_archive: ColdArchiveConfig,

    /// Object storage used for live backup copies.
    #[serde(default)]
    pub object_storage: ObjectStorageConfig,

    /// Retention policy evaluation schedule.
    #[serde(default)]
    pub policy: PolicySchedulerConfig,

    /// Archival job reconciliation.
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Signal queues and agent connections.
    #[serde(default)]
    pub signals: SignalsConfig,

    /// Observability configuration (logging, metrics).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ArchivistConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: ArchivistConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        if (self.policy.enabled || self.reconciler.enabled) && self.database.is_none() {
            tracing::warn!(
                "Policy evaluation and job reconciliation need a database; \
                 both workers stay idle until [database] is configured"
            );
        }

        self.database.validate()?;
        self.cache.validate()?;
        self.cold_archive.validate()?;
        self.object_storage.validate()?;
        self.policy.validate()?;
        self.reconciler.validate()?;
        self.signals.validate()?;

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

static ENV_VAR_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").ok());

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let Some(re) = ENV_VAR_RE.as_ref() else {
        return Ok(input.to_string());
    };
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
