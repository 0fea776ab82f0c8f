use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::{error::CacheResult, traits::Cache};
use crate::config::MemoryCacheConfig;

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(data: Vec<u8>, expires_at: Option<Instant>) -> Self {
        Self {
            data,
            expires_at,
            last_accessed: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// In-memory cache implementation using DashMap for concurrent access.
///
/// Each node keeps its own queues, so pending signals are only visible to
/// the node that queued them and are lost on restart. Use Redis when agents
/// may connect to any of several nodes.
///
/// Expiry is lazy: an expired entry is dropped the next time it is read, or
/// during eviction when the cache is full.
pub struct MemoryCache {
    data: Arc<DashMap<String, CacheEntry>>,
    max_entries: usize,
    eviction_batch_size: usize,
}

impl MemoryCache {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            max_entries: config.max_entries,
            eviction_batch_size: config.eviction_batch_size.max(1),
        }
    }

    fn evict_if_needed(&self) {
        if self.data.len() < self.max_entries {
            return;
        }

        // First pass: remove all expired entries
        self.data.retain(|_, entry| !entry.is_expired());

        let current_len = self.data.len();
        if current_len < self.max_entries {
            return;
        }

        let target_size = self.max_entries.saturating_sub(self.eviction_batch_size);
        let to_evict = current_len.saturating_sub(target_size);
        if to_evict == 0 {
            return;
        }

        // Oldest access first
        let mut entries: Vec<_> = self
            .data
            .iter()
            .map(|entry| (entry.key().clone(), entry.last_accessed))
            .collect();
        entries.sort_by_key(|(_, last_accessed)| *last_accessed);

        for (key, _) in entries.into_iter().take(to_evict) {
            self.data.remove(&key);
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if let Some(mut entry) = self.data.get_mut(key) {
            if entry.is_expired() {
                drop(entry);
                self.data.remove_if(key, |_, e| e.is_expired());
                return Ok(None);
            }

            entry.touch();
            Ok(Some(entry.data.clone()))
        } else {
            Ok(None)
        }
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        if !self.data.contains_key(key) {
            self.evict_if_needed();
        }

        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);

        self.data
            .insert(key.to_string(), CacheEntry::new(value.to_vec(), expires_at));

        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self
            .data
            .get(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.remove(key);
        Ok(())
    }
}
