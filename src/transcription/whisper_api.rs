//! OpenAI-compatible speech-to-text over HTTP (`POST {base_url}/audio/transcriptions`).

use crate::config::{AudioFormat, TranscriptionConfig};
use crate::transcription::{wav, Transcriber, TranscriptionError};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::multipart;
use std::time::Duration;
use tracing::debug;

pub struct WhisperApiTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    language: Option<String>,
    format: AudioFormat,
    sample_rate: u32,
    channels: u16,
}

impl WhisperApiTranscriber {
    pub fn from_config(config: &TranscriptionConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("transcription.api_key is required for the whisper_api backend"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            language: config.language.clone(),
            format: config.audio_format,
            sample_rate: config.sample_rate,
            channels: config.channels,
        })
    }

    fn file_part(&self, audio: &[u8]) -> Result<multipart::Part, TranscriptionError> {
        let (bytes, file_name, mime) = match self.format {
            AudioFormat::WavPcm16 => (
                wav::wrap_pcm16(audio, self.sample_rate, self.channels)
                    .map_err(|e| TranscriptionError::InvalidAudio(e.to_string()))?,
                "window.wav",
                "audio/wav",
            ),
            AudioFormat::Raw => (audio.to_vec(), "window.bin", "application/octet-stream"),
        };

        multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| TranscriptionError::InvalidAudio(format!("mime: {}", e)))
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        let url = format!("{}/audio/transcriptions", self.base_url);

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", self.file_part(audio)?);
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        debug!(model = %self.model, bytes = audio.len(), "Sending window to transcription API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TranscriptionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| TranscriptionError::Request(format!("body: {}", e)))?;

        Ok(text.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "whisper_api"
    }
}
