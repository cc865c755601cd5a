//! In-memory doubles for hub tests.

use crate::hub::peer::{Frame, Peer, PeerId, PeerSendError};
use crate::transcription::{Transcriber, TranscriptionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Peer that records every frame it accepts.
pub struct RecordingPeer {
    id: PeerId,
    frames: Mutex<Vec<Frame>>,
    failing: AtomicBool,
    closed: AtomicBool,
    attempts: AtomicUsize,
}

impl RecordingPeer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: PeerId::new(),
            frames: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        })
    }

    /// A peer whose every send fails.
    pub fn failing() -> Arc<Self> {
        let peer = Self::new();
        peer.failing.store(true, Ordering::SeqCst);
        peer
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    pub fn binary_frames(&self) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Frame::Binary(bytes) => Some(bytes.to_vec()),
                Frame::Text(_) => None,
            })
            .collect()
    }

    pub fn text_frames(&self) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => Some(text.clone()),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn send_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Peer for RecordingPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    fn send(&self, frame: Frame) -> Result<(), PeerSendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(PeerSendError::Disconnected);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PeerSendError::QueueFull);
        }
        self.frames.lock().push(frame);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Transcriber that replays a script, then falls back to "<n> bytes".
pub struct ScriptedTranscriber {
    script: Mutex<VecDeque<Result<String, TranscriptionError>>>,
    calls: Mutex<Vec<Vec<u8>>>,
    delay: Option<Duration>,
}

impl ScriptedTranscriber {
    pub fn new(
        script: Vec<Result<String, TranscriptionError>>,
        delay: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn echo_len() -> Arc<Self> {
        Self::new(Vec::new(), None)
    }

    pub fn scripted(script: Vec<Result<String, TranscriptionError>>) -> Arc<Self> {
        Self::new(script, None)
    }

    /// Echoes "<n> bytes" after sleeping for `delay` on every call.
    pub fn delayed(delay: Duration) -> Arc<Self> {
        Self::new(Vec::new(), Some(delay))
    }

    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        self.calls.lock().push(audio.to_vec());
        let scripted = self.script.lock().pop_front();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        scripted.unwrap_or_else(|| Ok(format!("{} bytes", audio.len())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
