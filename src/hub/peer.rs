//! # Peer Capability
//!
//! A peer is anything the hub can push frames to and shut down. The hub never
//! touches a socket directly; the websocket layer hands it an `Arc<dyn Peer>`
//! and the hub only ever calls `send` and `close` on it.
//!
//! ## Send Semantics:
//! `send` must not block. Transports enqueue the frame into a bounded outbound
//! queue owned by the connection and report `QueueFull` when that queue has no
//! room left. The broadcast engine treats any error as fatal for that peer.

use actix_web::web::Bytes;
use std::fmt;
use uuid::Uuid;

/// Identity of one live connection.
///
/// Minted once per upgraded socket. Two handles with the same id are the
/// same connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(Uuid);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A discrete outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Raw audio chunk (fan-out path)
    Binary(Bytes),

    /// UTF-8 transcript (bridge path)
    Text(String),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Binary(bytes) => bytes.len(),
            Frame::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why a frame could not be handed to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSendError {
    /// The outbound queue is at capacity; the peer is not keeping up.
    QueueFull,

    /// The connection is gone or already shutting down.
    Disconnected,
}

impl fmt::Display for PeerSendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerSendError::QueueFull => write!(f, "outbound queue full"),
            PeerSendError::Disconnected => write!(f, "peer disconnected"),
        }
    }
}

impl std::error::Error for PeerSendError {}

/// A sendable, closable bidirectional stream.
pub trait Peer: Send + Sync {
    fn id(&self) -> PeerId;

    /// Enqueue a frame without waiting for the peer.
    fn send(&self, frame: Frame) -> Result<(), PeerSendError>;

    /// Ask the transport to close the connection. Must be idempotent.
    fn close(&self);
}
