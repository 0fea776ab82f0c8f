use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{DispatchRegistry, HostStatusRegistry, SignalError, SignalResult};
use crate::{
    cache::{Cache, CacheError, CacheExt},
    config::SignalsConfig,
    models::Signal,
    observability::metrics,
};

/// Per-host signal queues.
///
/// The durable queue lives in the cache under `{prefix}{host_id}` and is the
/// source of truth; the live dispatch queue is a best-effort fast path for
/// connected agents. Writes to one host's durable queue are serialized by a
/// per-host lock.
pub struct SignalService {
    cache: Arc<dyn Cache>,
    key_prefix: String,
    ttl: Duration,
    locks: DashMap<String, Arc<Mutex<()>>>,
    dispatch: DispatchRegistry,
    status: HostStatusRegistry,
}

impl SignalService {
    pub fn new(cache: Arc<dyn Cache>, config: &SignalsConfig) -> Self {
        Self {
            cache,
            key_prefix: config.key_prefix.clone(),
            ttl: config.ttl(),
            locks: DashMap::new(),
            dispatch: DispatchRegistry::new(config.dispatch_capacity),
            status: HostStatusRegistry::new(),
        }
    }

    pub fn dispatch(&self) -> &DispatchRegistry {
        &self.dispatch
    }

    pub fn status(&self) -> &HostStatusRegistry {
        &self.status
    }

    fn key(&self, host_id: &str) -> String {
        format!("{}{}", self.key_prefix, host_id)
    }

    fn lock_for(&self, host_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(host_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, host_id: &str) -> SignalResult<Option<Vec<Signal>>> {
        match self.cache.get_json::<Vec<Signal>>(&self.key(host_id)).await {
            Ok(queue) => Ok(queue),
            Err(CacheError::Deserialization(e)) => {
                debug!(host_id, error = %e, "Signal queue has unexpected shape");
                Err(SignalError::BadDataType)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, host_id: &str, queue: &Vec<Signal>) -> SignalResult<()> {
        self.cache
            .set_json(&self.key(host_id), queue, self.ttl)
            .await?;
        Ok(())
    }

    /// Append a signal to the host's durable queue and return its new id.
    /// Refreshes the queue TTL.
    #[instrument(skip(self, signal))]
    pub async fn add_signal(&self, host_id: &str, mut signal: Signal) -> SignalResult<String> {
        let lock = self.lock_for(host_id);
        let _guard = lock.lock().await;

        let mut queue = self.load(host_id).await?.unwrap_or_default();
        let id = Uuid::new_v4().to_string();
        signal.set_id(id.clone());
        queue.push(signal);
        self.store(host_id, &queue).await?;

        metrics::record_signal("add");
        debug!(signal_id = %id, pending = queue.len(), "Signal queued");
        Ok(id)
    }

    /// Pending signals, oldest first. A missing queue is empty.
    pub async fn get_signals(&self, host_id: &str) -> SignalResult<Vec<Signal>> {
        Ok(self.load(host_id).await?.unwrap_or_default())
    }

    pub async fn get_signal(&self, host_id: &str, id: &str) -> SignalResult<Signal> {
        self.get_signals(host_id)
            .await?
            .into_iter()
            .find(|s| s.id() == Some(id))
            .ok_or(SignalError::NotFound)
    }

    /// Remove an acknowledged signal.
    #[instrument(skip(self))]
    pub async fn delete_signal(&self, host_id: &str, id: &str) -> SignalResult<()> {
        let lock = self.lock_for(host_id);
        let _guard = lock.lock().await;

        let mut queue = self.load(host_id).await?.ok_or(SignalError::NotFound)?;
        let before = queue.len();
        queue.retain(|s| s.id() != Some(id));
        if queue.len() == before {
            return Err(SignalError::NotFound);
        }

        self.store(host_id, &queue).await?;
        metrics::record_signal("delete");
        Ok(())
    }

    /// Push a queued signal onto the host's live dispatch queue.
    #[instrument(skip(self))]
    pub async fn notify_signal(&self, host_id: &str, id: &str) -> SignalResult<()> {
        let signal = self.get_signal(host_id, id).await?;
        self.dispatch.dispatch(host_id, signal)?;
        metrics::record_signal("notify");
        Ok(())
    }

    /// Drop the host's whole durable queue.
    pub async fn truncate_signals(&self, host_id: &str) -> SignalResult<()> {
        let lock = self.lock_for(host_id);
        let _guard = lock.lock().await;

        self.cache.delete(&self.key(host_id)).await?;
        metrics::record_signal("truncate");
        Ok(())
    }
}
