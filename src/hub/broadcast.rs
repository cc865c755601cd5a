//! # Broadcast Engine
//!
//! Rebroadcasts one inbound audio chunk to the audio pool (minus the sender)
//! and to the whole speech pool.
//!
//! ## Ordering:
//! Each chunk goes to the membership present when its fan-out takes the
//! registry lock. The transport calls this from the source's reader, so
//! chunks from one source keep their order. Nothing is promised across
//! different sources.

use crate::hub::peer::{Frame, PeerId};
use crate::hub::{Hub, Pool};
use actix_web::web::Bytes;
use tracing::debug;

/// What happened to a single chunk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    pub audio_delivered: usize,
    pub speech_delivered: usize,
    pub evicted: Vec<(Pool, PeerId)>,
}

impl FanoutReport {
    pub fn delivered(&self) -> usize {
        self.audio_delivered + self.speech_delivered
    }
}

impl Hub {
    /// Fan `chunk` out from `source` to both pools.
    ///
    /// Failed members are evicted from their registry and closed; the chunk
    /// still reaches everyone else. The two pools are locked one after the
    /// other, never together, so a registration in one pool is not stalled by
    /// a broadcast in the other.
    pub fn on_audio_chunk(&self, source: PeerId, chunk: Bytes) -> FanoutReport {
        let size = chunk.len();
        let frame = Frame::Binary(chunk);

        let audio = self.registry(Pool::Audio).fan_out(&frame, Some(source));
        let speech = self.registry(Pool::Speech).fan_out(&frame, None);

        let report = FanoutReport {
            audio_delivered: audio.delivered,
            speech_delivered: speech.delivered,
            evicted: audio
                .evicted
                .into_iter()
                .map(|id| (Pool::Audio, id))
                .chain(speech.evicted.into_iter().map(|id| (Pool::Speech, id)))
                .collect(),
        };

        self.metrics()
            .record_chunk(report.delivered(), report.evicted.len());

        debug!(
            source = %source,
            bytes = size,
            audio = report.audio_delivered,
            speech = report.speech_delivered,
            evicted = report.evicted.len(),
            "Chunk broadcast"
        );

        report
    }
}
