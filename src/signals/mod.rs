//! Signal delivery to remote agents.
//!
//! Each host has a durable queue in the cache and a live in-memory dispatch
//! queue. Agents connect over a WebSocket, receive signals as JSON text frames
//! and acknowledge them with `DONE <id>`. Delivery is at-least-once: a signal
//! stays in the durable queue until acknowledged or expired.

mod connection;
mod dispatch;
mod service;
mod status;

pub use connection::AgentConnection;
pub use dispatch::{DispatchQueue, DispatchRegistry};
pub use service::SignalService;
pub use status::{HostStatus, HostStatusRegistry};

use crate::cache::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("Signal not found")]
    NotFound,

    #[error("Signal queue holds data of an unexpected type")]
    BadDataType,

    #[error("Live dispatch queue is full")]
    DispatchQueueFull,

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type SignalResult<T> = Result<T, SignalError>;
