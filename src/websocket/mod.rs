//! # WebSocket Endpoints
//!
//! HTTP upgrade handlers for the two pools. Each upgraded socket becomes an
//! actor that registers itself with the hub:
//! - `/ws/audio`: audio producers/listeners (`AudioSocket`)
//! - `/ws/speech`: speech-processing clients (`SpeechSocket`)
//!
//! ## Wire Format:
//! - **Client → Server**: binary audio chunks, opaque and headerless
//! - **Server → audio clients**: binary chunks from every other source
//! - **Server → speech clients**: binary chunks plus UTF-8 text transcripts

pub mod audio;
pub mod peer;
pub mod speech;

pub use audio::AudioSocket;
pub use peer::{ActorPeer, Outbound};
pub use speech::SpeechSocket;

use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use tracing::info;

/// Upgrade to an audio-pool connection.
pub async fn audio_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let settings = app_state.get_config().hub;
    let frame_size = settings.max_frame_bytes;
    let socket = AudioSocket::new(app_state.hub().clone(), settings);

    info!(
        peer = %socket.id(),
        remote = ?req.connection_info().peer_addr(),
        "Audio WebSocket connection request"
    );

    ws::WsResponseBuilder::new(socket, &req, stream)
        .frame_size(frame_size)
        .start()
}

/// Upgrade to a speech-pool connection.
pub async fn speech_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let settings = app_state.get_config().hub;
    let frame_size = settings.max_frame_bytes;
    let socket = SpeechSocket::new(
        app_state.hub().clone(),
        app_state.bridge().clone(),
        settings,
    );

    info!(
        peer = %socket.id(),
        remote = ?req.connection_info().peer_addr(),
        "Speech WebSocket connection request"
    );

    ws::WsResponseBuilder::new(socket, &req, stream)
        .frame_size(frame_size)
        .start()
}
