//! Streaming broadcast binding.
//!
//! [`SseHub`] is the connection registry behind `GET /mcp/sse`. Each open
//! connection owns a bounded outbound queue; a write that finds the queue
//! closed or full removes the connection. Delivery is at most once.

use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::Stream;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mcp::protocol::JsonRpcMessage;

/// Path clients post messages to, announced in the endpoint event.
pub const MESSAGE_ENDPOINT: &str = "/mcp/message";

/// One server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: &'static str,
    pub data: String,
}

impl SseFrame {
    fn endpoint(connection_id: &str) -> Self {
        Self {
            event: "endpoint",
            data: json!({
                "type": "endpoint",
                "uri": MESSAGE_ENDPOINT,
                "connectionId": connection_id,
            })
            .to_string(),
        }
    }

    fn message(msg: &JsonRpcMessage) -> Result<Self> {
        Ok(Self {
            event: "message",
            data: msg.to_json()?,
        })
    }

    fn heartbeat() -> Self {
        Self {
            event: "heartbeat",
            data: json!({ "type": "heartbeat" }).to_string(),
        }
    }

    pub fn into_event(self) -> Event {
        Event::default().event(self.event).data(self.data)
    }
}

struct Connection {
    created_at: DateTime<Utc>,
    sender: mpsc::Sender<SseFrame>,
}

/// Outcome of a fan-out to every open connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Registry of open streaming connections.
pub struct SseHub {
    connections: DashMap<String, Connection>,
    buffer: usize,
    shutdown: CancellationToken,
}

impl SseHub {
    /// Create a hub whose connections buffer at most `buffer` events each.
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            buffer: buffer.max(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Open a connection. The endpoint event is already queued on the
    /// returned receiver.
    pub fn open_connection(&self) -> Result<(String, mpsc::Receiver<SseFrame>)> {
        if self.shutdown.is_cancelled() {
            return Err(Error::Transport("SSE hub is shut down".to_string()));
        }

        let id = format!("mcp-{}", Uuid::new_v4());
        let (sender, receiver) = mpsc::channel(self.buffer);
        sender
            .try_send(SseFrame::endpoint(&id))
            .map_err(|e| Error::Transport(format!("failed to queue endpoint event: {}", e)))?;

        self.connections.insert(
            id.clone(),
            Connection {
                created_at: Utc::now(),
                sender,
            },
        );
        // A shutdown that cleared the map before this insert must still win.
        if self.shutdown.is_cancelled() {
            self.connections.remove(&id);
            return Err(Error::Transport("SSE hub is shut down".to_string()));
        }
        info!("SSE connection opened: {} (active: {})", id, self.connection_count());

        Ok((id, receiver))
    }

    /// Deliver a response to one connection.
    pub fn send(&self, connection_id: &str, msg: &JsonRpcMessage) -> Result<()> {
        let frame = SseFrame::message(msg)?;
        if self.deliver(connection_id, frame) {
            Ok(())
        } else {
            Err(Error::Transport(format!(
                "connection {} is not available",
                connection_id
            )))
        }
    }

    /// Fan a message out to every open connection.
    pub fn broadcast(&self, msg: &JsonRpcMessage) -> Result<BroadcastReport> {
        let frame = SseFrame::message(msg)?;
        Ok(self.fan_out(frame))
    }

    /// Push a heartbeat to every open connection.
    pub fn heartbeat(&self) -> BroadcastReport {
        self.fan_out(SseFrame::heartbeat())
    }

    fn fan_out(&self, frame: SseFrame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        // Snapshot the ids: delivery may remove entries.
        for id in self.connection_ids() {
            if self.deliver(&id, frame.clone()) {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    fn deliver(&self, connection_id: &str, frame: SseFrame) -> bool {
        // Clone the sender so the map guard is released before any removal.
        let sender = match self.connections.get(connection_id) {
            Some(conn) => conn.sender.clone(),
            None => return false,
        };

        match sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("SSE connection {} is not keeping up, closing it", connection_id);
                self.remove(connection_id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("SSE connection {} closed", connection_id);
                self.remove(connection_id);
                false
            }
        }
    }

    /// Remove a connection. Returns whether it was open.
    pub fn remove(&self, connection_id: &str) -> bool {
        match self.connections.remove(connection_id) {
            Some((id, conn)) => {
                let age = Utc::now() - conn.created_at;
                info!(
                    "SSE connection closed: {} after {}s (active: {})",
                    id,
                    age.num_seconds(),
                    self.connection_count()
                );
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connection_ids(&self) -> Vec<String> {
        self.connections.iter().map(|e| e.key().clone()).collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Close every connection and stop the background tasks.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        let closed = self.connection_count();
        // Dropping the senders ends each stream once its queue drains.
        self.connections.clear();
        info!("SSE hub shut down, closed {} connections", closed);
    }

    /// Start the heartbeat ticker. It stops on [`SseHub::shutdown`].
    pub fn spawn_heartbeat(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let hub = self.clone();
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let report = hub.heartbeat();
                        if report.failed > 0 {
                            debug!("Heartbeat dropped {} connections", report.failed);
                        }
                    }
                }
            }
            debug!("Heartbeat ticker stopped");
        })
    }

    /// Forward server notifications to every open connection until shutdown.
    pub fn spawn_notification_forwarder(
        self: &Arc<Self>,
        mut notifications: broadcast::Receiver<JsonRpcMessage>,
    ) -> JoinHandle<()> {
        let hub = self.clone();
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    note = notifications.recv() => match note {
                        Ok(msg) => {
                            if let Err(e) = hub.broadcast(&msg) {
                                warn!("Failed to broadcast notification: {}", e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Dropped {} server notifications", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        })
    }
}

/// Event stream for one connection. Dropping it (client disconnect) removes
/// the connection from the hub.
pub struct ConnectionStream {
    id: String,
    hub: Arc<SseHub>,
    inner: ReceiverStream<SseFrame>,
}

impl ConnectionStream {
    pub fn new(id: String, hub: Arc<SseHub>, receiver: mpsc::Receiver<SseFrame>) -> Self {
        Self {
            id,
            hub,
            inner: ReceiverStream::new(receiver),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Stream for ConnectionStream {
    type Item = std::result::Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|frame| frame.map(|f| Ok(f.into_event())))
    }
}

impl Drop for ConnectionStream {
    fn drop(&mut self) {
        self.hub.remove(&self.id);
    }
}
