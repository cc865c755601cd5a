//! # Application State Management
//!
//! Shared state handed to every HTTP handler and every websocket actor.
//!
//! ## What lives here:
//! - **config**: runtime-updatable configuration (`Arc<RwLock<AppConfig>>`)
//! - **metrics**: per-endpoint HTTP request counters
//! - **hub**: the two connection pools and the broadcast engine
//! - **bridge**: the transcription bridge shared by every speech session
//!
//! ## Thread Safety Pattern:
//! Cloning `AppState` is cheap: every field is an `Arc` (or `Copy`), so all
//! workers see the same pools, counters and configuration.

use crate::config::AppConfig;
use crate::hub::{Hub, HubMetrics};
use crate::transcription::{build_transcriber, Transcriber, TranscriptionBridge};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// HTTP request metrics, updated by the metrics middleware
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,

    hub: Arc<Hub>,
    bridge: Arc<TranscriptionBridge>,
}

/// Request metrics collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Per-endpoint statistics, keyed like "GET /health"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Create the state, building the transcription backend from `config`.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let transcriber = build_transcriber(&config.transcription)?;
        Ok(Self::with_transcriber(config, transcriber))
    }

    /// Create the state around an already-built transcriber.
    pub fn with_transcriber(config: AppConfig, transcriber: Arc<dyn Transcriber>) -> Self {
        let hub_metrics = Arc::new(HubMetrics::default());
        let bridge = TranscriptionBridge::new(
            transcriber,
            config.transcription.bridge_settings(),
            hub_metrics.clone(),
        );

        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            hub: Arc::new(Hub::with_metrics(hub_metrics)),
            bridge: Arc::new(bridge),
        }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn bridge(&self) -> &Arc<TranscriptionBridge> {
        &self.bridge
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the lock immediately, so other threads aren't blocked.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Replace the configuration if the new one validates.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn increment_request_count(&self) {
        self.metrics.write().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics.write().error_count += 1;
    }

    /// Record timing and outcome for one request to `endpoint`.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Consistent copy of the request metrics, taken under the read lock.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
