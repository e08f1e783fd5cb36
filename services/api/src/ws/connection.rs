//! The outbound side of one WebSocket connection.
//!
//! All writes for a connection go through a single bounded queue drained by one
//! writer task, so a timer firing in the middle of a request can never
//! interleave its frame with the request's response. The connection also
//! carries an explicit open flag that is checked before every send.

use super::{protocol::ServerMessage, timer::TimerRegistry};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

/// Capacity of the per-connection outbound queue.
pub const OUTBOUND_CAPACITY: usize = 64;

/// Why an outbound message was not queued.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SendError {
    #[error("connection {0} is closed")]
    Closed(Uuid),
}

struct ConnectionInner {
    id: Uuid,
    open: AtomicBool,
    outbound: mpsc::Sender<ServerMessage>,
    timers: TimerRegistry,
}

/// A cheap, clonable handle to a live connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

/// A handle that does not keep the connection alive.
#[derive(Clone)]
pub struct WeakConnection {
    inner: Weak<ConnectionInner>,
}

impl Connection {
    /// Creates an open connection and the receiving end of its outbound queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let connection = Self {
            inner: Arc::new(ConnectionInner {
                id: Uuid::new_v4(),
                open: AtomicBool::new(true),
                outbound,
                timers: TimerRegistry::default(),
            }),
        };
        (connection, rx)
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Marks the connection closed. Later sends fail with `SendError::Closed`.
    pub fn close(&self) {
        self.inner.open.store(false, Ordering::Release);
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.inner.timers
    }

    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Queues `msg` for the writer task.
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed(self.id()));
        }
        if self.inner.outbound.send(msg).await.is_err() {
            // The writer is gone, so the transport is too.
            self.close();
            return Err(SendError::Closed(self.id()));
        }
        Ok(())
    }
}

impl WeakConnection {
    pub fn upgrade(&self) -> Option<Connection> {
        self.inner.upgrade().map(|inner| Connection { inner })
    }
}

/// Drains the outbound queue into the socket until the queue closes or a write fails.
pub async fn write_outbound(
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<ServerMessage>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        let serialized = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                error!(kind = msg.kind(), error = %e, "Failed to serialize outbound message");
                continue;
            }
        };
        if let Err(e) = socket_tx.send(Message::Text(serialized.into())).await {
            debug!(error = %e, "WebSocket send failed, client disconnected");
            break;
        }
    }
    let _ = socket_tx.close().await;
}

/// Splits `socket` and starts its writer task, returning the inbound half.
pub fn attach(
    socket: WebSocket,
) -> (
    Connection,
    futures_util::stream::SplitStream<WebSocket>,
    tokio::task::JoinHandle<()>,
) {
    let (socket_tx, socket_rx) = socket.split();
    let (connection, outbound_rx) = Connection::new(OUTBOUND_CAPACITY);
    let writer = tokio::spawn(write_outbound(socket_tx, outbound_rx));
    (connection, socket_rx, writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_queues_in_order() {
        let (conn, mut rx) = Connection::new(8);
        conn.send(ServerMessage::timer_complete(60)).await.unwrap();
        conn.send(ServerMessage::timer_complete(120)).await.unwrap();

        assert_eq!(rx.recv().await, Some(ServerMessage::timer_complete(60)));
        assert_eq!(rx.recv().await, Some(ServerMessage::timer_complete(120)));
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_sends() {
        let (conn, mut rx) = Connection::new(8);
        conn.close();
        assert!(!conn.is_open());
        assert_eq!(
            conn.send(ServerMessage::timer_complete(60)).await,
            Err(SendError::Closed(conn.id()))
        );
        drop(conn);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_writer_marks_connection_closed() {
        let (conn, rx) = Connection::new(8);
        drop(rx);
        assert!(conn.send(ServerMessage::timer_complete(60)).await.is_err());
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn test_weak_handle_does_not_keep_connection_alive() {
        let (conn, _rx) = Connection::new(8);
        let weak = conn.downgrade();
        assert_eq!(weak.upgrade().map(|c| c.id()), Some(conn.id()));
        drop(conn);
        assert!(weak.upgrade().is_none());
    }
}
