//! # Audio Fan-out Hub
//!
//! The hub owns the two connection pools and everything that moves audio
//! between them. It is transport-agnostic: connections arrive as
//! `Arc<dyn Peer>` handles, and the websocket layer is just one adapter.
//!
//! ## Key Components:
//! - **Peer**: the sendable/closable capability the hub talks to
//! - **Registry**: one mutex-guarded member map per pool
//! - **Broadcast**: rebroadcasts audio chunks to both pools with eviction
//! - **Window buffer**: per speech connection byte accumulator
//! - **Speech session**: ticker that drains the window into the transcription bridge
//!
//! ## Pools:
//! - **audio**: producers and listeners; receive every chunk except their own
//! - **speech**: transcription clients; receive every chunk and get text back

pub mod broadcast;
pub mod metrics;
pub mod peer;
pub mod registry;
pub mod speech;
pub mod window;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcast::FanoutReport;
pub use metrics::{HubMetrics, HubMetricsSnapshot};
pub use peer::{Frame, Peer, PeerId, PeerSendError};
pub use registry::{FanoutOutcome, PeerRegistry};
pub use speech::SpeechSession;
pub use window::WindowBuffer;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Role a connection plays, chosen by the endpoint it connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Audio,
    Speech,
}

impl Pool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pool::Audio => "audio",
            Pool::Speech => "speech",
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The peer already belongs to the other pool.
    AlreadyRegistered { peer: PeerId, pool: Pool },
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubError::AlreadyRegistered { peer, pool } => {
                write!(f, "peer {} is already registered in the {} pool", peer, pool)
            }
        }
    }
}

impl std::error::Error for HubError {}

/// Both connection pools plus shared counters.
///
/// ## Locking:
/// Each pool has its own lock. Anything that needs both (registration, with
/// its cross-pool check) takes them in a fixed order: audio, then speech.
pub struct Hub {
    audio: PeerRegistry,
    speech: PeerRegistry,
    metrics: Arc<HubMetrics>,
}

impl Hub {
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(HubMetrics::default()))
    }

    pub fn with_metrics(metrics: Arc<HubMetrics>) -> Self {
        Self {
            audio: PeerRegistry::new(Pool::Audio),
            speech: PeerRegistry::new(Pool::Speech),
            metrics,
        }
    }

    pub fn registry(&self, pool: Pool) -> &PeerRegistry {
        match pool {
            Pool::Audio => &self.audio,
            Pool::Speech => &self.speech,
        }
    }

    pub fn metrics(&self) -> &Arc<HubMetrics> {
        &self.metrics
    }

    /// Add `peer` to `pool`.
    ///
    /// Idempotent for the same pool. Fails if the peer sits in the other pool,
    /// which keeps "at most one pool per connection" true at all times.
    pub fn register(&self, pool: Pool, peer: Arc<dyn Peer>) -> Result<(), HubError> {
        let id = peer.id();
        let mut audio = self.audio.lock();
        let mut speech = self.speech.lock();

        let (target, other) = match pool {
            Pool::Audio => (&mut *audio, &*speech),
            Pool::Speech => (&mut *speech, &*audio),
        };

        if other.contains_key(&id) {
            return Err(HubError::AlreadyRegistered {
                peer: id,
                pool: match pool {
                    Pool::Audio => Pool::Speech,
                    Pool::Speech => Pool::Audio,
                },
            });
        }

        PeerRegistry::insert_locked(pool, target, peer);
        Ok(())
    }

    pub fn unregister(&self, pool: Pool, id: PeerId) -> bool {
        self.registry(pool).unregister(id)
    }

    /// Which pool, if any, currently holds `id`.
    pub fn pool_of(&self, id: PeerId) -> Option<Pool> {
        if self.audio.contains(id) {
            Some(Pool::Audio)
        } else if self.speech.contains(id) {
            Some(Pool::Speech)
        } else {
            None
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
