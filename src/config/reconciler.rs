use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Archival job reconciliation configuration.
///
/// # Example
///
/// ```toml
/// [reconciler]
/// interval_secs = 300
/// job_retention_days = 7
/// failed_job_backoff_secs = 0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcilerConfig {
    /// Whether the reconciler runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between reconciliation passes.
    /// Default: 300 (5 minutes)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Days a completed job is kept before it is garbage-collected.
    /// Default: 7
    #[serde(default = "default_job_retention_days")]
    pub job_retention_days: u64,

    /// Initial delay before re-polling a job whose remote status was Failed.
    /// Doubles per consecutive failure, capped at one hour.
    /// Default: 0 (re-poll every pass)
    #[serde(default)]
    pub failed_job_backoff_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            job_retention_days: default_job_retention_days(),
            failed_job_backoff_secs: 0,
        }
    }
}

impl ReconcilerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn job_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.job_retention_days as i64)
    }

    pub fn failed_job_backoff(&self) -> Option<Duration> {
        (self.failed_job_backoff_secs > 0).then(|| Duration::from_secs(self.failed_job_backoff_secs))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "reconciler.interval_secs must be greater than 0".into(),
            ));
        }
        if self.job_retention_days > i32::MAX as u64 {
            return Err(ConfigError::Validation(
                "reconciler.job_retention_days is out of range".into(),
            ));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    300
}

fn default_job_retention_days() -> u64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert_eq!(config.job_retention(), chrono::Duration::days(7));
        assert!(config.failed_job_backoff().is_none());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ReconcilerConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
