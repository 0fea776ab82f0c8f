use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Cold archive (OAS) client configuration.
///
/// The endpoint is per vault and comes from the database; only credentials
/// and transport settings live here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColdArchiveConfig {
    /// API access key id.
    #[serde(default)]
    pub api_key: String,

    /// API secret used for request signing.
    #[serde(default)]
    pub api_secret: String,

    /// Service port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Use HTTPS. Implied when `port` is 443.
    #[serde(default)]
    pub use_ssl: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ColdArchiveConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            port: default_port(),
            use_ssl: false,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ColdArchiveConfig {
    pub fn https(&self) -> bool {
        self.use_ssl || self.port == 443
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_key.is_empty() && self.api_secret.is_empty() {
            return Err(ConfigError::Validation(
                "cold_archive.api_secret is required when api_key is set".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "cold_archive.timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    80
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("archivist/", env!("CARGO_PKG_VERSION")).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_implied_by_port() {
        let config = ColdArchiveConfig {
            port: 443,
            ..Default::default()
        };
        assert!(config.https());
        assert!(!ColdArchiveConfig::default().https());
    }

    #[test]
    fn test_secret_required_with_key() {
        let config = ColdArchiveConfig {
            api_key: "key".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
