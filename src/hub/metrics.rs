//! Hub-wide counters, updated lock-free from the broadcast path, the speech
//! tickers and the transcription bridge.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct HubMetrics {
    chunks_received: AtomicU64,
    frames_delivered: AtomicU64,
    peers_evicted: AtomicU64,
    windows_submitted: AtomicU64,
    windows_skipped: AtomicU64,
    transcriptions_succeeded: AtomicU64,
    transcriptions_failed: AtomicU64,
    transcripts_delivered: AtomicU64,
}

/// Point-in-time copy for the metrics endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct HubMetricsSnapshot {
    pub chunks_received: u64,
    pub frames_delivered: u64,
    pub peers_evicted: u64,
    pub windows_submitted: u64,
    pub windows_skipped: u64,
    pub transcriptions_succeeded: u64,
    pub transcriptions_failed: u64,
    pub transcripts_delivered: u64,
}

impl HubMetrics {
    pub fn record_chunk(&self, delivered: usize, evicted: usize) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
        self.frames_delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.peers_evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn record_window_submitted(&self) {
        self.windows_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_skipped(&self) {
        self.windows_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transcription(&self, succeeded: bool) {
        if succeeded {
            self.transcriptions_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.transcriptions_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_transcript_delivered(&self) {
        self.transcripts_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            peers_evicted: self.peers_evicted.load(Ordering::Relaxed),
            windows_submitted: self.windows_submitted.load(Ordering::Relaxed),
            windows_skipped: self.windows_skipped.load(Ordering::Relaxed),
            transcriptions_succeeded: self.transcriptions_succeeded.load(Ordering::Relaxed),
            transcriptions_failed: self.transcriptions_failed.load(Ordering::Relaxed),
            transcripts_delivered: self.transcripts_delivered.load(Ordering::Relaxed),
        }
    }
}
