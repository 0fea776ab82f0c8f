use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Signal queue and agent connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalsConfig {
    /// Prefix of the per-host durable queue key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Lifetime of a durable queue, refreshed on every append.
    /// Default: 1800 (30 minutes)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Capacity of each host's live dispatch queue.
    #[serde(default = "default_dispatch_capacity")]
    pub dispatch_capacity: usize,

    /// Seconds between keepalive pings on agent connections.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Seconds without a pong before an agent connection is dropped.
    #[serde(default = "default_pong_timeout_secs")]
    pub pong_timeout_secs: u64,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            ttl_secs: default_ttl_secs(),
            dispatch_capacity: default_dispatch_capacity(),
            ping_interval_secs: default_ping_interval_secs(),
            pong_timeout_secs: default_pong_timeout_secs(),
        }
    }
}

impl SignalsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "signals.ttl_secs must be greater than 0".into(),
            ));
        }
        if self.dispatch_capacity == 0 {
            return Err(ConfigError::Validation(
                "signals.dispatch_capacity must be greater than 0".into(),
            ));
        }
        if self.ping_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "signals.ping_interval_secs must be greater than 0".into(),
            ));
        }
        if self.pong_timeout_secs < self.ping_interval_secs {
            return Err(ConfigError::Validation(
                "signals.pong_timeout_secs must not be shorter than ping_interval_secs".into(),
            ));
        }
        Ok(())
    }
}

fn default_key_prefix() -> String {
    "Signal_".to_string()
}

fn default_ttl_secs() -> u64 {
    1800
}

fn default_dispatch_capacity() -> usize {
    1024
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_pong_timeout_secs() -> u64 {
    60
}
