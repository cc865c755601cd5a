//! # Connection Registry
//!
//! One `PeerRegistry` per pool. Every mutation and every full iteration happens
//! under the registry's mutex, so a broadcast never observes a half-applied
//! add or remove. Late registrations simply miss the chunk in flight.

use crate::hub::peer::{Frame, Peer, PeerId};
use crate::hub::Pool;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of delivering one frame to one pool.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanoutOutcome {
    /// Members the frame was enqueued for
    pub delivered: usize,

    /// Members removed because the send failed
    pub evicted: Vec<PeerId>,
}

pub struct PeerRegistry {
    pool: Pool,
    members: Mutex<HashMap<PeerId, Arc<dyn Peer>>>,
}

impl PeerRegistry {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            members: Mutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> Pool {
        self.pool
    }

    /// Add a peer. Re-registering the same id replaces the handle.
    pub fn register(&self, peer: Arc<dyn Peer>) {
        let mut members = self.members.lock();
        Self::insert_locked(self.pool, &mut members, peer);
    }

    /// Remove a peer. Returns whether it was present.
    pub fn unregister(&self, id: PeerId) -> bool {
        let removed = self.members.lock().remove(&id).is_some();
        if removed {
            debug!(peer = %id, pool = %self.pool, "Peer unregistered");
        }
        removed
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.members.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Copy of the current membership. The lock is released before returning.
    pub fn snapshot(&self) -> Vec<Arc<dyn Peer>> {
        self.members.lock().values().cloned().collect()
    }

    /// Send `frame` to every member except `exclude`.
    ///
    /// ## Locking:
    /// The registry lock is held for the whole loop, including evictions, so
    /// broadcasts and registrations are mutually exclusive. `Peer::send` is
    /// non-blocking, which keeps the critical section short.
    ///
    /// ## Failure Handling:
    /// A failed send evicts and closes that member only; the loop carries on
    /// with everyone else.
    pub fn fan_out(&self, frame: &Frame, exclude: Option<PeerId>) -> FanoutOutcome {
        let mut members = self.members.lock();
        let mut outcome = FanoutOutcome::default();

        for (id, peer) in members.iter() {
            if Some(*id) == exclude {
                continue;
            }
            match peer.send(frame.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(err) => {
                    warn!(peer = %id, pool = %self.pool, error = %err, "Send failed, evicting peer");
                    outcome.evicted.push(*id);
                }
            }
        }

        for id in &outcome.evicted {
            if let Some(peer) = members.remove(id) {
                peer.close();
            }
        }

        outcome
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<PeerId, Arc<dyn Peer>>> {
        self.members.lock()
    }

    pub(crate) fn insert_locked(
        pool: Pool,
        members: &mut HashMap<PeerId, Arc<dyn Peer>>,
        peer: Arc<dyn Peer>,
    ) {
        let id = peer.id();
        if members.insert(id, peer).is_none() {
            debug!(peer = %id, pool = %pool, "Peer registered");
        }
    }
}
