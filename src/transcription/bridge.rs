//! # Transcription Bridge
//!
//! Thin adapter between a drained window and the external transcriber.
//! Failures stop here: a failed call or a failed write drops that window's
//! text and nothing else. The connection is never torn down from this side;
//! a dead socket is reaped by its own reader.

use crate::hub::metrics::HubMetrics;
use crate::hub::peer::{Frame, Peer};
use crate::transcription::{Transcriber, TranscriptionError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Upper bound on windows being transcribed at once, across all sessions
    pub max_concurrent: usize,

    /// Per-window budget for the external call
    pub timeout: Duration,
}

/// How a single window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    /// Text was queued to the speaker
    Delivered,

    /// The backend recognized nothing; no frame sent
    Blank,

    /// The backend failed or timed out; window dropped
    TranscriptionFailed,

    /// Text was produced but the connection refused it
    DeliveryFailed,
}

pub struct TranscriptionBridge {
    transcriber: Arc<dyn Transcriber>,
    permits: Semaphore,
    timeout: Duration,
    metrics: Arc<HubMetrics>,
}

impl TranscriptionBridge {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        settings: BridgeSettings,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            transcriber,
            permits: Semaphore::new(settings.max_concurrent.max(1)),
            timeout: settings.timeout,
            metrics,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.transcriber.name()
    }

    /// Transcribe one window and write the text back to `peer`.
    pub async fn process_window(&self, peer: &dyn Peer, audio: Vec<u8>) -> WindowOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return WindowOutcome::TranscriptionFailed,
        };

        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.transcriber.transcribe(&audio)).await {
            Ok(result) => result,
            Err(_) => Err(TranscriptionError::Timeout(self.timeout)),
        };

        let text = match result {
            Ok(text) => {
                self.metrics.record_transcription(true);
                text
            }
            Err(err) => {
                self.metrics.record_transcription(false);
                warn!(
                    peer = %peer.id(),
                    backend = self.transcriber.name(),
                    bytes = audio.len(),
                    error = %err,
                    "Transcription failed, dropping window"
                );
                return WindowOutcome::TranscriptionFailed;
            }
        };

        if text.trim().is_empty() {
            debug!(peer = %peer.id(), bytes = audio.len(), "Blank transcript");
            return WindowOutcome::Blank;
        }

        let chars = text.len();
        match peer.send(Frame::Text(text)) {
            Ok(()) => {
                self.metrics.record_transcript_delivered();
                info!(
                    peer = %peer.id(),
                    bytes = audio.len(),
                    chars,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Transcript delivered"
                );
                WindowOutcome::Delivered
            }
            Err(err) => {
                warn!(peer = %peer.id(), error = %err, "Could not deliver transcript");
                WindowOutcome::DeliveryFailed
            }
        }
    }
}
