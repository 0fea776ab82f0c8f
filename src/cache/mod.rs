//! Shared key/value cache used for the durable per-host signal queues.

mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod traits;

use std::sync::Arc;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;
pub use traits::{Cache, CacheExt};

use crate::config::CacheConfig;

/// Build the configured cache backend, or `None` when caching is disabled.
pub async fn from_config(config: &CacheConfig) -> CacheResult<Option<Arc<dyn Cache>>> {
    match config {
        CacheConfig::None => Ok(None),
        CacheConfig::Memory(c) => Ok(Some(Arc::new(MemoryCache::new(c)))),
        #[cfg(feature = "redis")]
        CacheConfig::Redis(c) => Ok(Some(Arc::new(RedisCache::from_config(c).await?))),
        #[cfg(not(feature = "redis"))]
        CacheConfig::Redis(_) => Err(CacheError::Internal(
            "Redis cache requires the 'redis' feature".to_string(),
        )),
    }
}
