use std::{fmt::Display, sync::Arc, time::Duration};

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::Instant;

use super::{SignalError, SignalService};
use crate::{config::SignalsConfig, models::Signal, observability::metrics};

/// Acknowledgement prefix sent by agents.
const ACK_PREFIX: &str = "DONE ";

/// One live agent connection.
///
/// Generic over the socket halves so tests can drive it with channels.
pub struct AgentConnection<S> {
    host_id: String,
    service: Arc<SignalService>,
    sender: S,
    ping_interval: Duration,
    pong_timeout: Duration,
}

impl<S> AgentConnection<S>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    pub fn new(
        host_id: impl Into<String>,
        service: Arc<SignalService>,
        sender: S,
        config: &SignalsConfig,
    ) -> Self {
        Self {
            host_id: host_id.into(),
            service,
            sender,
            ping_interval: config.ping_interval(),
            pong_timeout: config.pong_timeout(),
        }
    }

    /// Run until the agent disconnects or stops answering pings.
    ///
    /// Waits for any earlier connection of the same host to release the live
    /// queue first. Entries parked there while the host was offline are
    /// dropped, since the replay of the durable queue covers them. The host is
    /// marked offline before the queue is released.
    #[tracing::instrument(skip_all, fields(host_id = %self.host_id))]
    pub async fn run<R, E>(mut self, mut receiver: R)
    where
        R: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let queue = self.service.dispatch().queue(&self.host_id);
        let mut live = queue.receiver().lock_owned().await;
        let stale = std::iter::from_fn(|| live.try_recv().ok()).count();
        if stale > 0 {
            tracing::debug!(stale, "Dropped live entries queued while offline");
        }

        self.service.status().mark_online(&self.host_id);
        metrics::set_agent_connections(self.service.status().online_count());
        tracing::info!("Agent connected");

        if self.replay_pending().await {
            let mut ping_interval = tokio::time::interval(self.ping_interval);
            let mut last_pong = Instant::now();

            loop {
                tokio::select! {
                    msg = receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                self.handle_text(text.as_str()).await;
                            }
                            Some(Ok(Message::Pong(_))) => {
                                last_pong = Instant::now();
                                self.service.status().touch(&self.host_id);
                            }
                            Some(Ok(Message::Close(_))) => {
                                tracing::debug!("Agent initiated close");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::debug!(error = %e, "WebSocket receive error");
                                break;
                            }
                            None => {
                                tracing::debug!("WebSocket stream ended");
                                break;
                            }
                            _ => {}
                        }
                    }

                    signal = live.recv() => {
                        let Some(signal) = signal else {
                            break;
                        };
                        if !self.still_queued(&signal).await {
                            continue;
                        }
                        if !self.deliver(&signal).await {
                            break;
                        }
                    }

                    _ = ping_interval.tick() => {
                        if last_pong.elapsed() > self.pong_timeout {
                            tracing::info!("Pong timeout, closing agent connection");
                            break;
                        }
                        if !self.send(Message::Ping(bytes::Bytes::new())).await {
                            break;
                        }
                    }
                }
            }
        }

        let _ = self.sender.close().await;
        self.service.status().mark_offline(&self.host_id);
        metrics::set_agent_connections(self.service.status().online_count());
        tracing::info!("Agent disconnected");
        drop(live);
    }

    /// Put everything still pending in the durable queue on the wire.
    async fn replay_pending(&mut self) -> bool {
        let pending = match self.service.get_signals(&self.host_id).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load pending signals, skipping replay");
                return true;
            }
        };

        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "Replaying pending signals");
        }
        for signal in &pending {
            if !self.deliver(signal).await {
                return false;
            }
        }
        true
    }

    /// Whether a live entry is still in the durable queue. Acked, deleted and
    /// expired signals are not sent.
    async fn still_queued(&self, signal: &Signal) -> bool {
        let Some(id) = signal.id() else {
            return true;
        };
        match self.service.get_signal(&self.host_id, id).await {
            Ok(_) => true,
            Err(SignalError::NotFound) => {
                tracing::debug!(signal_id = %id, "Signal no longer queued, skipping");
                false
            }
            Err(e) => {
                tracing::warn!(signal_id = %id, error = %e, "Failed to look up signal, delivering anyway");
                true
            }
        }
    }

    async fn handle_text(&self, text: &str) {
        let Some(id) = text.trim().strip_prefix(ACK_PREFIX) else {
            tracing::debug!(message = %text, "Ignoring unexpected agent message");
            return;
        };
        let id = id.trim();
        if id.is_empty() {
            tracing::debug!(message = %text, "Ignoring acknowledgement without id");
            return;
        }

        match self.service.delete_signal(&self.host_id, id).await {
            Ok(()) => {
                metrics::record_signal("ack");
                tracing::debug!(signal_id = %id, "Signal acknowledged");
            }
            Err(SignalError::NotFound) => {
                tracing::debug!(signal_id = %id, "Acknowledgement for unknown signal");
            }
            Err(e) => {
                tracing::warn!(signal_id = %id, error = %e, "Failed to remove acknowledged signal");
            }
        }
    }

    async fn deliver(&mut self, signal: &Signal) -> bool {
        let json = match serde_json::to_string(signal) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode signal, skipping");
                return true;
            }
        };
        let sent = self.send(Message::Text(json.into())).await;
        if sent {
            metrics::record_signal("deliver");
        }
        sent
    }

    /// Write one frame, bounded by the pong timeout.
    async fn send(&mut self, msg: Message) -> bool {
        match tokio::time::timeout(self.pong_timeout, self.sender.send(msg)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Error writing to agent");
                false
            }
            Err(_) => {
                tracing::debug!("Write to agent timed out");
                false
            }
        }
    }
}
