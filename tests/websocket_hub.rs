//! End-to-end tests against a real server on an ephemeral port.

use actix_web::{web, App, HttpServer};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use walkie_hub::config::AppConfig;
use walkie_hub::hub::Pool;
use walkie_hub::state::AppState;
use walkie_hub::transcription::{Transcriber, TranscriptionError};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const QUIET: Duration = Duration::from_millis(400);
const PATIENT: Duration = Duration::from_secs(3);

/// Answers "heard <n> bytes"; optionally fails the first window.
struct LengthTranscriber {
    fail_next: AtomicBool,
}

#[async_trait]
impl Transcriber for LengthTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TranscriptionError::Request("backend unavailable".to_string()));
        }
        Ok(format!("heard {} bytes", audio.len()))
    }

    fn name(&self) -> &'static str {
        "length"
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.hub.window_ms = 250;
    config.hub.pacing_ms = 0;
    config
}

fn state_with(config: AppConfig, fail_first: bool) -> AppState {
    AppState::with_transcriber(
        config,
        Arc::new(LengthTranscriber {
            fail_next: AtomicBool::new(fail_first),
        }),
    )
}

fn test_state(fail_first: bool) -> AppState {
    state_with(test_config(), fail_first)
}

async fn start_server(state: AppState) -> SocketAddr {
    let data = web::Data::new(state);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(walkie_hub::middleware::MetricsMiddleware)
            .configure(walkie_hub::configure)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind test server");

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = connect_async(format!("ws://{}{}", addr, path))
        .await
        .expect("websocket handshake");
    client
}

async fn wait_for_pools(state: &AppState, audio: usize, speech: usize) {
    wait_for_pools_within(state, audio, speech, PATIENT).await;
}

async fn wait_for_pools_within(state: &AppState, audio: usize, speech: usize, within: Duration) {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        let hub = state.hub();
        if hub.registry(Pool::Audio).len() == audio && hub.registry(Pool::Speech).len() == speech {
            return;
        }
        actix_web::rt::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("pools never reached audio={} speech={}", audio, speech);
}

async fn get_json(addr: SocketAddr, path: &str) -> serde_json::Value {
    let body = reqwest::get(format!("http://{}{}", addr, path))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    serde_json::from_str(&body).unwrap()
}

/// Next data frame (binary or text), skipping control frames.
async fn next_data(client: &mut Client, within: Duration) -> Option<Message> {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        match tokio::time::timeout_at(deadline, client.next()).await {
            Ok(Some(Ok(msg @ (Message::Binary(_) | Message::Text(_))))) => return Some(msg),
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

#[actix_web::test]
async fn test_audio_chunk_fans_out_to_everyone_but_the_source() {
    let state = test_state(false);
    let addr = start_server(state.clone()).await;

    let mut a = connect(addr, "/ws/audio").await;
    let mut b = connect(addr, "/ws/audio").await;
    let mut c = connect(addr, "/ws/speech").await;
    wait_for_pools(&state, 2, 1).await;

    a.send(Message::Binary(vec![0x01, 0x02])).await.unwrap();

    assert_eq!(next_data(&mut b, PATIENT).await, Some(Message::Binary(vec![0x01, 0x02])));
    assert_eq!(next_data(&mut c, PATIENT).await, Some(Message::Binary(vec![0x01, 0x02])));
    assert_eq!(next_data(&mut a, QUIET).await, None);
}

#[actix_web::test]
async fn test_speech_windows_are_transcribed_back_to_sender() {
    let state = test_state(false);
    let addr = start_server(state.clone()).await;

    let mut speech = connect(addr, "/ws/speech").await;
    wait_for_pools(&state, 0, 1).await;

    speech.send(Message::Binary(vec![0; 5])).await.unwrap();
    assert_eq!(
        next_data(&mut speech, PATIENT).await,
        Some(Message::Text("heard 5 bytes".to_string()))
    );

    speech.send(Message::Binary(vec![0; 3])).await.unwrap();
    assert_eq!(
        next_data(&mut speech, PATIENT).await,
        Some(Message::Text("heard 3 bytes".to_string()))
    );
}

#[actix_web::test]
async fn test_failed_transcription_keeps_connection_open() {
    let state = test_state(true);
    let addr = start_server(state.clone()).await;

    let mut speech = connect(addr, "/ws/speech").await;
    wait_for_pools(&state, 0, 1).await;

    speech.send(Message::Binary(vec![0; 4])).await.unwrap();
    assert_eq!(next_data(&mut speech, QUIET * 2).await, None);

    speech.send(Message::Binary(vec![0; 2])).await.unwrap();
    assert_eq!(
        next_data(&mut speech, PATIENT).await,
        Some(Message::Text("heard 2 bytes".to_string()))
    );
    assert_eq!(state.hub().metrics().snapshot().transcriptions_failed, 1);
}

#[actix_web::test]
async fn test_disconnected_peers_leave_their_pool() {
    let state = test_state(false);
    let addr = start_server(state.clone()).await;

    let mut a = connect(addr, "/ws/audio").await;
    let mut b = connect(addr, "/ws/audio").await;
    let mut c = connect(addr, "/ws/speech").await;
    wait_for_pools(&state, 2, 1).await;

    b.close(None).await.unwrap();
    c.close(None).await.unwrap();
    wait_for_pools(&state, 1, 0).await;

    a.send(Message::Binary(vec![9])).await.unwrap();
    assert_eq!(next_data(&mut a, QUIET).await, None);
}

#[actix_web::test]
async fn test_health_reports_pool_sizes() {
    let state = test_state(false);
    let addr = start_server(state.clone()).await;

    let _audio = connect(addr, "/ws/audio").await;
    let _speech = connect(addr, "/ws/speech").await;
    wait_for_pools(&state, 1, 1).await;

    let health = get_json(addr, "/api/v1/health").await;

    assert_eq!(health["status"], "healthy");
    assert_eq!(health["pools"]["audio"], 1);
    assert_eq!(health["pools"]["speech"], 1);
    assert_eq!(health["transcription"]["backend"], "length");
}

#[actix_web::test]
async fn test_paced_source_still_reaches_listeners_in_order() {
    let mut config = test_config();
    config.hub.pacing_ms = AppConfig::default().hub.pacing_ms;
    assert!(config.hub.pacing_ms > 0);
    let state = state_with(config, false);
    let addr = start_server(state.clone()).await;

    let mut a = connect(addr, "/ws/audio").await;
    let mut b = connect(addr, "/ws/audio").await;
    let mut c = connect(addr, "/ws/speech").await;
    wait_for_pools(&state, 2, 1).await;

    a.send(Message::Binary(vec![0x01, 0x02])).await.unwrap();
    a.send(Message::Binary(vec![0x03])).await.unwrap();
    a.send(Message::Binary(vec![0x04, 0x05, 0x06])).await.unwrap();

    for expected in [vec![0x01, 0x02], vec![0x03], vec![0x04, 0x05, 0x06]] {
        assert_eq!(next_data(&mut b, PATIENT).await, Some(Message::Binary(expected.clone())));
        assert_eq!(next_data(&mut c, PATIENT).await, Some(Message::Binary(expected)));
    }
    assert_eq!(next_data(&mut a, QUIET).await, None);
}

#[actix_web::test]
async fn test_listener_that_stops_reading_is_evicted() {
    let mut config = test_config();
    config.hub.outbound_queue_capacity = 16;
    let state = state_with(config, false);
    let addr = start_server(state.clone()).await;

    let mut source = connect(addr, "/ws/audio").await;
    // Never read from: its socket fills, then its mailbox.
    let _stalled = connect(addr, "/ws/audio").await;
    wait_for_pools(&state, 2, 0).await;

    let chunk = vec![0u8; 64 * 1024];
    let mut sent = 0;
    while state.hub().registry(Pool::Audio).len() == 2 && sent < 2_000 {
        source.send(Message::Binary(chunk.clone())).await.unwrap();
        sent += 1;
    }

    wait_for_pools(&state, 1, 0).await;
    let counters = state.hub().metrics().snapshot();
    assert_eq!(counters.peers_evicted, 1);
    assert!(counters.frames_delivered > 0);

    // The source keeps streaming into an empty room without being evicted itself.
    source.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    actix_web::rt::time::sleep(QUIET).await;
    assert_eq!(state.hub().registry(Pool::Audio).len(), 1);
    assert_eq!(state.hub().metrics().snapshot().peers_evicted, 1);
}

#[actix_web::test]
async fn test_silent_clients_are_dropped_after_heartbeat_timeout() {
    let mut config = test_config();
    config.hub.heartbeat_interval_secs = 1;
    config.hub.client_timeout_secs = 2;
    let state = state_with(config, false);
    let addr = start_server(state.clone()).await;

    // Neither client reads, so pings are never answered.
    let _audio = connect(addr, "/ws/audio").await;
    let _speech = connect(addr, "/ws/speech").await;
    wait_for_pools(&state, 1, 1).await;

    wait_for_pools_within(&state, 0, 0, Duration::from_secs(6)).await;
}

#[actix_web::test]
async fn test_metrics_and_config_endpoints() {
    let state = test_state(false);
    let addr = start_server(state.clone()).await;

    let mut a = connect(addr, "/ws/audio").await;
    let mut b = connect(addr, "/ws/audio").await;
    wait_for_pools(&state, 2, 0).await;

    a.send(Message::Binary(vec![7, 7])).await.unwrap();
    assert_eq!(next_data(&mut b, PATIENT).await, Some(Message::Binary(vec![7, 7])));

    let metrics = get_json(addr, "/api/v1/metrics").await;
    assert_eq!(metrics["hub"]["audio_peers"], 2);
    assert_eq!(metrics["hub"]["speech_peers"], 0);
    assert_eq!(metrics["hub"]["counters"]["chunks_received"], 1);
    assert_eq!(metrics["hub"]["counters"]["frames_delivered"], 1);
    assert!(metrics["overall"]["total_requests"].as_u64().unwrap() >= 2);

    let config = get_json(addr, "/api/v1/config").await;
    assert_eq!(config["config"]["hub"]["window_ms"], 250);
    assert_eq!(config["config"]["hub"]["pacing_ms"], 0);
    assert_eq!(config["config"]["transcription"]["backend"], "none");
    assert_eq!(config["config"]["transcription"]["api_key_set"], false);
    assert!(config["config"]["transcription"].get("api_key").is_none());
}
