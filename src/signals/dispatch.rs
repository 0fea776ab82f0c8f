use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};

use super::SignalError;
use crate::models::Signal;

/// One host's live dispatch queue.
///
/// The receiver sits behind a mutex so at most one agent connection drains
/// it at a time; a second connection for the same host waits its turn.
pub struct DispatchQueue {
    tx: mpsc::Sender<Signal>,
    rx: Arc<Mutex<mpsc::Receiver<Signal>>>,
    capacity: usize,
}

impl DispatchQueue {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            capacity,
        }
    }

    pub fn receiver(&self) -> Arc<Mutex<mpsc::Receiver<Signal>>> {
        Arc::clone(&self.rx)
    }

    /// Signals queued but not yet taken by a connection.
    pub fn pending(&self) -> usize {
        self.capacity - self.tx.capacity()
    }
}

/// Per-host bounded in-memory queues, created lazily on first use.
pub struct DispatchRegistry {
    capacity: usize,
    queues: DashMap<String, Arc<DispatchQueue>>,
}

impl DispatchRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queues: DashMap::new(),
        }
    }

    /// Get or create the host's queue.
    pub fn queue(&self, host_id: &str) -> Arc<DispatchQueue> {
        self.queues
            .entry(host_id.to_string())
            .or_insert_with(|| Arc::new(DispatchQueue::new(self.capacity)))
            .clone()
    }

    /// Push without waiting. A full queue is reported, never blocked on.
    pub fn dispatch(&self, host_id: &str, signal: Signal) -> Result<(), SignalError> {
        self.queue(host_id)
            .tx
            .try_send(signal)
            // The registry owns the receiver, so only `Full` is reachable
            .map_err(|_| SignalError::DispatchQueueFull)
    }

    pub fn pending(&self, host_id: &str) -> usize {
        self.queues
            .get(host_id)
            .map(|q| q.pending())
            .unwrap_or(0)
    }
}
