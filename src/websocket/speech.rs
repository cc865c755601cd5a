//! Speech-pool connection actor.
//!
//! Receives the audio fan-out like any listener, and additionally owns a
//! `SpeechSession`: its own inbound frames fill the session window, and
//! transcripts come back as text frames.

use crate::config::HubConfig;
use crate::hub::{Hub, Peer, PeerId, SpeechSession};
use crate::transcription::TranscriptionBridge;
use crate::websocket::peer::{start_heartbeat, write_outbound, ActorPeer, Heartbeat, Outbound};
use actix::prelude::*;
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct SpeechSocket {
    id: PeerId,
    hub: Arc<Hub>,
    bridge: Arc<TranscriptionBridge>,
    settings: HubConfig,
    session: Option<SpeechSession>,
    last_heartbeat: Instant,
}

impl SpeechSocket {
    pub fn new(hub: Arc<Hub>, bridge: Arc<TranscriptionBridge>, settings: HubConfig) -> Self {
        Self {
            id: PeerId::new(),
            hub,
            bridge,
            settings,
            session: None,
            last_heartbeat: Instant::now(),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    fn on_chunk(&mut self, chunk: &[u8]) {
        self.last_heartbeat = Instant::now();
        if let Some(session) = &self.session {
            session.append(chunk);
        }
    }
}

impl Heartbeat for SpeechSocket {
    fn peer_id(&self) -> PeerId {
        self.id
    }

    fn last_heartbeat(&self) -> Instant {
        self.last_heartbeat
    }
}

impl Actor for SpeechSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.set_mailbox_capacity(self.settings.outbound_queue_capacity);
        start_heartbeat(ctx, self.settings.heartbeat_interval(), self.settings.client_timeout());

        let peer: Arc<dyn Peer> = Arc::new(ActorPeer::new(self.id, ctx.address().recipient()));
        match SpeechSession::open(self.hub.clone(), peer, self.bridge.clone(), self.settings.window()) {
            Ok(session) => {
                self.session = Some(session);
                info!(peer = %self.id, "New speech-processing client connected");
            }
            Err(err) => {
                error!(peer = %self.id, "Could not open speech session: {}", err);
                ctx.stop();
            }
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Dropping the session unregisters it and cancels its ticker.
        self.session.take();
        info!(peer = %self.id, "Speech-processing client disconnected");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SpeechSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Binary(data)) => self.on_chunk(&data),
            Ok(ws::Message::Text(text)) => self.on_chunk(text.as_bytes()),
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!(peer = %self.id, "Speech client closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!(peer = %self.id, "Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!(peer = %self.id, "Error receiving audio for transcription: {}", err);
                ctx.stop();
            }
        }
    }
}

impl Handler<Outbound> for SpeechSocket {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        write_outbound(msg, ctx);
    }
}
