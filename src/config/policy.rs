//! Retention policy scheduling.
//!
//! # Example
//!
//! ```toml
//! [policy]
//! enabled = true
//! schedule = "0 30 2 * * *"   # every day at 02:30:00 UTC
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// When and whether retention policies are evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySchedulerConfig {
    /// Whether the policy worker runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Cron expression with a leading seconds field, evaluated in UTC.
    /// Default: top of every hour.
    #[serde(default = "default_schedule")]
    pub schedule: String,
}

impl Default for PolicySchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            schedule: default_schedule(),
        }
    }
}

impl PolicySchedulerConfig {
    /// Parse the schedule expression.
    pub fn cron(&self) -> Result<cron::Schedule, ConfigError> {
        cron::Schedule::from_str(&self.schedule).map_err(|e| {
            ConfigError::Validation(format!(
                "policy.schedule '{}' is not a valid cron expression: {e}",
                self.schedule
            ))
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cron().map(|_| ())
    }
}

fn default_enabled() -> bool {
    true
}

fn default_schedule() -> String {
    "0 0 * * * *".to_string()
}
