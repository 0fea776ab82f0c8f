use std::time::Duration;

use async_trait::async_trait;

use super::error::{CacheError, CacheResult};

/// Key/value store with per-key expiry.
///
/// Holds the durable signal queues. A zero TTL means the entry never expires.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get raw bytes from cache
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Set raw bytes in cache with TTL, replacing any previous value and expiry
    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Check whether a live (non-expired) entry exists
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

// Helper extension trait for working with JSON
pub trait CacheExt: Cache {
    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get_bytes(key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| CacheError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_json<T: serde::Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.set_bytes(key, &bytes, ttl).await
    }
}

// Blanket implementation for all Cache types
impl<T: Cache + ?Sized> CacheExt for T {}
