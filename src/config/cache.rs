use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Cache configuration.
///
/// The cache holds the durable per-host signal queues. Without one, the
/// queues fall back to an in-process memory cache.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum CacheConfig {
    /// No cache.
    #[default]
    None,

    /// In-memory cache. Good for single-node deployments.
    /// Pending signals are lost on restart.
    Memory(MemoryCacheConfig),

    /// Redis cache. Required when several nodes share signal queues.
    Redis(RedisCacheConfig),
}

impl CacheConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, CacheConfig::None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            CacheConfig::None => Ok(()),
            CacheConfig::Memory(c) => c.validate(),
            CacheConfig::Redis(c) => c.validate(),
        }
    }
}

/// In-memory cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries in the cache.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Number of entries to evict when cache is full.
    /// Eviction removes expired entries first, then uses LRU.
    #[serde(default = "default_eviction_batch_size")]
    pub eviction_batch_size: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            eviction_batch_size: default_eviction_batch_size(),
        }
    }
}

impl MemoryCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entries == 0 {
            return Err(ConfigError::Validation(
                "Memory cache max_entries must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_entries() -> usize {
    100_000
}

fn default_eviction_batch_size() -> usize {
    100
}

/// Redis cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisCacheConfig {
    /// Redis connection URL.
    /// Format: redis://[user:password@]host:port[/database]
    pub url: String,

    /// Connection timeout in seconds.
    #[serde(default = "default_redis_timeout")]
    pub connect_timeout_secs: u64,

    /// Key prefix for all cache keys.
    /// Useful when sharing a Redis instance with other applications.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Cluster mode configuration.
    #[serde(default)]
    pub cluster: Option<RedisClusterConfig>,
}

impl RedisCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Validation("Redis URL cannot be empty".into()));
        }
        Ok(())
    }
}

/// Redis cluster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisClusterConfig {
    /// Additional seed nodes besides `url`.
    #[serde(default)]
    pub nodes: Vec<String>,

    /// Read from replicas for read operations.
    #[serde(default)]
    pub read_from_replicas: bool,

    /// Number of retries for cluster operations.
    #[serde(default = "default_cluster_retries")]
    pub retries: u32,
}

fn default_redis_timeout() -> u64 {
    5
}

fn default_key_prefix() -> String {
    "archivist:".to_string()
}

fn default_cluster_retries() -> u32 {
    3
}
