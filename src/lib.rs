//! # walkie-hub
//!
//! Real-time audio fan-out hub. Producers stream binary audio over
//! `/ws/audio`; every chunk is rebroadcast to the other audio peers and to
//! every speech-processing peer on `/ws/speech`. Speech peers accumulate their
//! own inbound audio into fixed windows that are transcribed and returned to
//! them as text frames.
//!
//! ## Modules:
//! - **hub**: connection pools, broadcast, window buffers, speech sessions
//! - **transcription**: the external speech-to-text seam and its bridge
//! - **websocket**: actix actors that adapt sockets to hub peers
//! - **config / state / error**: ambient application plumbing
//! - **health / handlers / middleware**: REST surface

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod hub;
pub mod middleware;
pub mod state;
pub mod transcription;
pub mod websocket;

use actix_web::web;

/// Register every route on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws/audio", web::get().to(websocket::audio_websocket))
        .route("/ws/speech", web::get().to(websocket::speech_websocket))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health::health_check))
                .route("/metrics", web::get().to(health::detailed_metrics))
                .route("/config", web::get().to(handlers::get_config))
                .route("/config", web::put().to(handlers::update_config)),
        )
        .route("/health", web::get().to(health::health_check));
}
