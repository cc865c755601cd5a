//! # Transcription
//!
//! Everything between a drained audio window and the text frame sent back to
//! the speaker. The speech-to-text service itself is opaque: bytes in, text
//! out, or an error.
//!
//! ## Key Components:
//! - **Transcriber**: the seam to the external service
//! - **Bridge**: bounds concurrency, applies the timeout, delivers the text
//! - **Whisper API**: OpenAI-compatible `/audio/transcriptions` client
//! - **WAV**: wraps raw PCM16 windows for services that want a container
//!
//! ## Backends:
//! - **none**: every window fails with `NotConfigured` and is dropped
//! - **whisper_api**: multipart upload via reqwest

pub mod bridge;
pub mod wav;
pub mod whisper_api;

pub use bridge::{BridgeSettings, TranscriptionBridge, WindowOutcome};
pub use whisper_api::WhisperApiTranscriber;

use crate::config::{TranscriptionBackend, TranscriptionConfig};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why a window produced no text.
#[derive(Debug)]
pub enum TranscriptionError {
    /// No backend is configured
    NotConfigured,

    /// The window could not be packaged for the backend
    InvalidAudio(String),

    /// Transport-level failure talking to the backend
    Request(String),

    /// The backend answered with a non-success status
    Status { status: u16, body: String },

    /// The backend did not answer in time
    Timeout(Duration),
}

impl fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptionError::NotConfigured => write!(f, "no transcription backend configured"),
            TranscriptionError::InvalidAudio(msg) => write!(f, "invalid audio: {}", msg),
            TranscriptionError::Request(msg) => write!(f, "request failed: {}", msg),
            TranscriptionError::Status { status, body } => {
                write!(f, "backend returned status {}: {}", status, body)
            }
            TranscriptionError::Timeout(after) => {
                write!(f, "timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for TranscriptionError {}

/// Speech-to-text service. Potentially slow, potentially failing.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;
}

/// Backend used when none is configured.
pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::NotConfigured)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Build the backend selected in configuration.
pub fn build_transcriber(config: &TranscriptionConfig) -> anyhow::Result<Arc<dyn Transcriber>> {
    match config.backend {
        TranscriptionBackend::None => Ok(Arc::new(DisabledTranscriber)),
        TranscriptionBackend::WhisperApi => Ok(Arc::new(WhisperApiTranscriber::from_config(config)?)),
    }
}
