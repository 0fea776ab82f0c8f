use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Liveness of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStatus {
    pub online: bool,
    pub last_seen: DateTime<Utc>,
}

/// Shared host liveness table. Every read and write goes through one lock.
#[derive(Default)]
pub struct HostStatusRegistry {
    hosts: Mutex<HashMap<String, HostStatus>>,
}

impl HostStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_online(&self, host_id: &str) {
        self.set(host_id, true);
    }

    pub fn mark_offline(&self, host_id: &str) {
        self.set(host_id, false);
    }

    /// Record activity from a connected host.
    pub fn touch(&self, host_id: &str) {
        if let Some(status) = self.hosts.lock().get_mut(host_id) {
            status.last_seen = Utc::now();
        }
    }

    pub fn is_online(&self, host_id: &str) -> bool {
        self.hosts
            .lock()
            .get(host_id)
            .is_some_and(|status| status.online)
    }

    pub fn online_count(&self) -> usize {
        self.hosts.lock().values().filter(|s| s.online).count()
    }

    pub fn snapshot(&self) -> HashMap<String, HostStatus> {
        self.hosts.lock().clone()
    }

    fn set(&self, host_id: &str, online: bool) {
        self.hosts.lock().insert(
            host_id.to_string(),
            HostStatus {
                online,
                last_seen: Utc::now(),
            },
        );
    }
}
