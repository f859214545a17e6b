//! Transport seam: the per-connection delivery primitive the hub consumes.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure delivering text to one connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is closed.
    #[error("connection closed")]
    Closed,
    /// The connection's outbound buffer is full.
    #[error("outbound buffer full")]
    Backpressure,
    /// The underlying write failed.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// One open bidirectional channel, owned by the transport layer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Stable connection identifier.
    fn id(&self) -> &str;

    /// Address the connection originated from.
    fn origin_address(&self) -> &str;

    /// Whether the connection is still open.
    fn is_open(&self) -> bool;

    /// Send one text frame.
    async fn send_text(&self, payload: &str) -> Result<(), TransportError>;
}

/// Transport backed by a bounded `mpsc` channel.
///
/// The socket writer task owns the receiver and forwards each string as a
/// text frame; dropping the receiver closes the transport.
#[derive(Debug)]
pub struct ChannelTransport {
    /// Connection ID.
    id: String,
    /// Remote address.
    origin_address: String,
    /// Sender for outbound frames.
    sender: mpsc::Sender<String>,
    /// Cleared once the connection is known to be gone.
    alive: AtomicBool,
}

impl ChannelTransport {
    /// Creates a transport and the receiver the socket writer drains.
    pub fn new(
        id: impl Into<String>,
        origin_address: impl Into<String>,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let transport = Self {
            id: id.into(),
            origin_address: origin_address.into(),
            sender,
            alive: AtomicBool::new(true),
        };
        (transport, receiver)
    }

    /// Mark the connection as closed.
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn origin_address(&self) -> &str {
        &self.origin_address
    }

    fn is_open(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.sender.is_closed()
    }

    async fn send_text(&self, payload: &str) -> Result<(), TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        match self.sender.try_send(payload.to_string()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(TransportError::Backpressure),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                Err(TransportError::Closed)
            }
        }
    }
}
