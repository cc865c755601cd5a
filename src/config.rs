//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP__ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Special-cased environment variables (HOST, PORT, OPENAI_API_KEY)
//! 2. Environment variables (APP__SERVER__PORT, APP__HUB__WINDOW_MS, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impls)

use crate::transcription::BridgeSettings;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Upper bounds for `transcription.sample_rate` / `channels`.
const MAX_SAMPLE_RATE: u32 = 384_000;
const MAX_CHANNELS: u16 = 32;

/// Main application configuration that contains all settings.
///
/// ## Sections:
/// - **server**: where the HTTP listener binds
/// - **hub**: fan-out, windowing and connection liveness
/// - **transcription**: which speech-to-text backend to call and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub hub: HubConfig,
    pub transcription: TranscriptionConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Fan-out and speech-window tuning.
///
/// ## Fields:
/// - `window_ms`: how often each speech connection's buffer is drained
/// - `pacing_ms`: pause after each chunk before reading the next one from the
///   same audio source (0 disables)
/// - `outbound_queue_capacity`: frames a peer may have queued before it is
///   considered too slow and evicted
/// - `heartbeat_interval_secs` / `client_timeout_secs`: websocket liveness
/// - `max_frame_bytes`: largest inbound websocket frame accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub window_ms: u64,
    pub pacing_ms: u64,
    pub outbound_queue_capacity: usize,
    pub max_frame_bytes: usize,
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionBackend {
    None,
    WhisperApi,
}

/// How a window is packaged before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// Clients stream headerless PCM16LE; wrap each window in a WAV header
    WavPcm16,
    /// Send the window bytes exactly as received
    Raw,
}

/// Speech-to-text backend configuration.
///
/// ## Backends:
/// - `none`: windows are drained and dropped (useful for fan-out only deployments)
/// - `whisper_api`: OpenAI-compatible HTTP API; needs `api_key`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub backend: TranscriptionBackend,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub language: Option<String>,
    pub audio_format: AudioFormat,
    pub sample_rate: u32,
    pub channels: u16,
    pub timeout_ms: u64,
    pub max_concurrent: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            hub: HubConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            window_ms: 3_000,               // 3 second transcription windows
            pacing_ms: 10,
            outbound_queue_capacity: 256,
            max_frame_bytes: 1024 * 1024,   // 1MB audio chunks
            heartbeat_interval_secs: 30,
            client_timeout_secs: 60,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            backend: TranscriptionBackend::None,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            language: None,
            audio_format: AudioFormat::WavPcm16,
            sample_rate: 16_000,
            channels: 1,
            timeout_ms: 30_000,
            max_concurrent: 4,
        }
    }
}

impl HubConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

impl TranscriptionConfig {
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            max_concurrent: self.max_concurrent,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP__SERVER__HOST=0.0.0.0`: Override server host
    /// - `APP__HUB__WINDOW_MS=5000`: Five second transcription windows
    /// - `APP__TRANSCRIPTION__BACKEND=whisper_api`: Enable the HTTP backend
    /// - `HOST`, `PORT`: Special cases for deployment platforms
    /// - `OPENAI_API_KEY`: Picked up as `transcription.api_key`
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("transcription.api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        self.hub.validate()?;

        let transcription = &self.transcription;
        if transcription.max_concurrent == 0 {
            return Err(anyhow::anyhow!("Max concurrent transcriptions must be greater than 0"));
        }
        if transcription.timeout_ms == 0 {
            return Err(anyhow::anyhow!("Transcription timeout must be greater than 0"));
        }
        if transcription.sample_rate == 0 || transcription.channels == 0 {
            return Err(anyhow::anyhow!("Sample rate and channel count must be greater than 0"));
        }
        if transcription.sample_rate > MAX_SAMPLE_RATE || transcription.channels > MAX_CHANNELS {
            return Err(anyhow::anyhow!(
                "Sample rate must be at most {} Hz and channels at most {}",
                MAX_SAMPLE_RATE,
                MAX_CHANNELS
            ));
        }
        if transcription.backend == TranscriptionBackend::WhisperApi
            && transcription.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(anyhow::anyhow!("The whisper_api backend requires transcription.api_key"));
        }

        Ok(())
    }

    /// Apply a partial runtime update from JSON.
    ///
    /// Only the `hub` section can change at runtime; new connections pick up the
    /// new values, existing ones keep what they opened with. For example
    /// `{"hub": {"window_ms": 5000}}` changes only the window length.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(hub) = partial_config.get("hub") {
            if let Some(window) = hub.get("window_ms").and_then(|v| v.as_u64()) {
                self.hub.window_ms = window;
            }
            if let Some(pacing) = hub.get("pacing_ms").and_then(|v| v.as_u64()) {
                self.hub.pacing_ms = pacing;
            }
            if let Some(capacity) = hub.get("outbound_queue_capacity").and_then(|v| v.as_u64()) {
                self.hub.outbound_queue_capacity = capacity as usize;
            }
            if let Some(frame) = hub.get("max_frame_bytes").and_then(|v| v.as_u64()) {
                self.hub.max_frame_bytes = frame as usize;
            }
            if let Some(interval) = hub.get("heartbeat_interval_secs").and_then(|v| v.as_u64()) {
                self.hub.heartbeat_interval_secs = interval;
            }
            if let Some(timeout) = hub.get("client_timeout_secs").and_then(|v| v.as_u64()) {
                self.hub.client_timeout_secs = timeout;
            }
        }

        self.validate()?;
        Ok(())
    }
}

impl HubConfig {
    fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            return Err(anyhow::anyhow!("Window length must be greater than 0"));
        }
        if self.outbound_queue_capacity == 0 {
            return Err(anyhow::anyhow!("Outbound queue capacity must be greater than 0"));
        }
        if self.max_frame_bytes == 0 {
            return Err(anyhow::anyhow!("Max frame size must be greater than 0"));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(anyhow::anyhow!("Heartbeat interval must be greater than 0"));
        }
        if self.client_timeout_secs <= self.heartbeat_interval_secs {
            return Err(anyhow::anyhow!("Client timeout must be longer than the heartbeat interval"));
        }
        Ok(())
    }
}
