//! # Speech Session
//!
//! Per-connection state for the speech pool: the connection's own window
//! buffer and the ticker that drains it.
//!
//! ## Lifecycle:
//! 1. **Open**: register in the speech pool, start the ticker
//! 2. **Accumulating**: the reader appends every inbound chunk
//! 3. **Draining**: on each tick the window is swapped out and, if non-empty,
//!    handed to the transcription bridge on its own task
//! 4. **Closed**: unregister, stop the ticker, cancel in-flight windows
//!
//! Ticks never wait for earlier windows. Results of overlapping windows may
//! arrive out of order.

use crate::hub::metrics::HubMetrics;
use crate::hub::peer::{Peer, PeerId};
use crate::hub::window::WindowBuffer;
use crate::hub::{Hub, HubError, Pool};
use crate::transcription::TranscriptionBridge;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

const MIN_WINDOW: Duration = Duration::from_millis(1);

pub struct SpeechSession {
    peer: Arc<dyn Peer>,
    hub: Arc<Hub>,
    buffer: Arc<WindowBuffer>,
    ticker: JoinHandle<()>,
}

impl SpeechSession {
    /// Register `peer` in the speech pool and start its window ticker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        hub: Arc<Hub>,
        peer: Arc<dyn Peer>,
        bridge: Arc<TranscriptionBridge>,
        window: Duration,
    ) -> Result<Self, HubError> {
        hub.register(Pool::Speech, peer.clone())?;

        let window = window.max(MIN_WINDOW);
        let buffer = Arc::new(WindowBuffer::new());
        let ticker = tokio::spawn(run_windows(
            peer.clone(),
            buffer.clone(),
            bridge,
            hub.metrics().clone(),
            window,
        ));

        info!(peer = %peer.id(), window_ms = window.as_millis() as u64, "Speech session opened");

        Ok(Self {
            peer,
            hub,
            buffer,
            ticker,
        })
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer.id()
    }

    /// Add an inbound chunk to the current window.
    pub fn append(&self, chunk: &[u8]) {
        let buffered = self.buffer.append(chunk);
        debug!(peer = %self.peer.id(), bytes = chunk.len(), buffered, "Audio buffered");
    }

    /// Tear down and close the underlying connection.
    pub fn close(self) {
        self.peer.close();
    }
}

impl Drop for SpeechSession {
    fn drop(&mut self) {
        self.ticker.abort();
        self.hub.unregister(Pool::Speech, self.peer.id());
        info!(peer = %self.peer.id(), "Speech session closed");
    }
}

async fn run_windows(
    peer: Arc<dyn Peer>,
    buffer: Arc<WindowBuffer>,
    bridge: Arc<TranscriptionBridge>,
    metrics: Arc<HubMetrics>,
    window: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + window, window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Dropped with this task on close, which aborts every window still running.
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let audio = buffer.take();
                if audio.is_empty() {
                    debug!(peer = %peer.id(), "No audio in window, skipping");
                    metrics.record_window_skipped();
                    continue;
                }

                metrics.record_window_submitted();
                debug!(peer = %peer.id(), bytes = audio.len(), "Submitting window");

                let bridge = bridge.clone();
                let peer = peer.clone();
                in_flight.spawn(async move {
                    bridge.process_window(peer.as_ref(), audio).await;
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    if err.is_panic() {
                        error!(peer = %peer.id(), "Window task panicked: {}", err);
                    }
                }
            }
        }
    }
}
