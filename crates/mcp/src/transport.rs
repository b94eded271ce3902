//! MCP transport layer.
//!
//! Defines the `McpTransport` trait for sending/receiving JSON-RPC messages.
//! [`SessionTransport`] carries one HTTP+SSE session: inbound messages arrive
//! from `POST /messages/` handlers, outbound messages leave as SSE frames.
//! [`ChannelTransport`] is an in-memory pair for tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::McpError;

/// Trait for MCP message transport.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Read the next JSON-RPC message from the transport.
    /// Returns `None` when the transport is closed.
    async fn receive(&mut self) -> Result<Option<String>, McpError>;

    /// Write a JSON-RPC message to the transport.
    async fn send(&mut self, message: &str) -> Result<(), McpError>;
}

// ── SSE session ─────────────────────────────────────────────────────

/// One frame on a session's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// `event: endpoint`, the URI the client must POST messages to.
    Endpoint(String),
    /// `event: message`, one serialized JSON-RPC message.
    Message(String),
}

impl SseFrame {
    pub fn event_name(&self) -> &'static str {
        match self {
            SseFrame::Endpoint(_) => "endpoint",
            SseFrame::Message(_) => "message",
        }
    }

    pub fn data(&self) -> &str {
        match self {
            SseFrame::Endpoint(d) | SseFrame::Message(d) => d,
        }
    }
}

/// Server end of an SSE session.
pub struct SessionTransport {
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<SseFrame>,
}

/// HTTP end of an SSE session: feed POSTed bodies into `inbound`, stream
/// `outbound` to the client.
pub struct SessionHandle {
    pub inbound: mpsc::Sender<String>,
    pub outbound: mpsc::Receiver<SseFrame>,
}

/// Create a connected session transport and its HTTP handle.
pub fn session_channel(capacity: usize) -> (SessionTransport, SessionHandle) {
    let (in_tx, in_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(capacity);
    (
        SessionTransport {
            inbound: in_rx,
            outbound: out_tx,
        },
        SessionHandle {
            inbound: in_tx,
            outbound: out_rx,
        },
    )
}

impl SessionTransport {
    /// Emit the initial `endpoint` event.
    pub async fn announce_endpoint(&self, uri: &str) -> Result<(), McpError> {
        self.outbound
            .send(SseFrame::Endpoint(uri.to_string()))
            .await
            .map_err(|_| McpError::SessionClosed)
    }
}

#[async_trait]
impl McpTransport for SessionTransport {
    /// Ends the session when either the POST side or the SSE stream is gone.
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        tokio::select! {
            biased;
            msg = self.inbound.recv() => Ok(msg),
            _ = self.outbound.closed() => Ok(None),
        }
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.outbound
            .send(SseFrame::Message(message.to_string()))
            .await
            .map_err(|_| McpError::SessionClosed)
    }
}

// ── In-memory pair ──────────────────────────────────────────────────

/// In-memory transport for testing, backed by channel pairs.
pub struct ChannelTransport {
    rx: mpsc::Receiver<String>,
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Create a pair of connected transports for testing.
    ///
    /// Messages sent on one transport are received by the other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = mpsc::channel(32);
        let (tx_b, rx_a) = mpsc::channel(32);
        (
            Self { rx: rx_a, tx: tx_a },
            Self { rx: rx_b, tx: tx_b },
        )
    }
}

#[async_trait]
impl McpTransport for ChannelTransport {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        Ok(self.rx.recv().await)
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.tx
            .send(message.to_string())
            .await
            .map_err(|_| McpError::SessionClosed)
    }
}
