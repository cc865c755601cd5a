//! Audio-pool connection actor.
//!
//! Every inbound frame is an audio chunk: it is rebroadcast right away from
//! the actor's stream handler, so one source's chunks go out in arrival
//! order. After each chunk the actor optionally pauses reading for
//! `hub.pacing_ms`.

use crate::config::HubConfig;
use crate::hub::{Hub, Peer, PeerId, Pool};
use crate::websocket::peer::{start_heartbeat, write_outbound, ActorPeer, Heartbeat, Outbound};
use actix::prelude::*;
use actix_web::web::Bytes;
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct AudioSocket {
    id: PeerId,
    hub: Arc<Hub>,
    settings: HubConfig,
    last_heartbeat: Instant,
}

impl AudioSocket {
    pub fn new(hub: Arc<Hub>, settings: HubConfig) -> Self {
        Self {
            id: PeerId::new(),
            hub,
            settings,
            last_heartbeat: Instant::now(),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    fn on_chunk(&mut self, chunk: Bytes, ctx: &mut ws::WebsocketContext<Self>) {
        self.last_heartbeat = Instant::now();
        self.hub.on_audio_chunk(self.id, chunk);

        let pacing = self.settings.pacing();
        if !pacing.is_zero() {
            ctx.wait(actix::clock::sleep(pacing).into_actor(self));
        }
    }
}

impl Heartbeat for AudioSocket {
    fn peer_id(&self) -> PeerId {
        self.id
    }

    fn last_heartbeat(&self) -> Instant {
        self.last_heartbeat
    }
}

impl Actor for AudioSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.set_mailbox_capacity(self.settings.outbound_queue_capacity);
        start_heartbeat(ctx, self.settings.heartbeat_interval(), self.settings.client_timeout());

        let peer: Arc<dyn Peer> = Arc::new(ActorPeer::new(self.id, ctx.address().recipient()));
        if let Err(err) = self.hub.register(Pool::Audio, peer) {
            error!(peer = %self.id, "Could not register audio peer: {}", err);
            ctx.stop();
            return;
        }

        info!(peer = %self.id, "New audio client connected");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.hub.unregister(Pool::Audio, self.id);
        info!(peer = %self.id, "Audio client disconnected");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for AudioSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Binary(data)) => self.on_chunk(data, ctx),
            // Frame type is not part of the protocol; text payloads are audio too.
            Ok(ws::Message::Text(text)) => self.on_chunk(text.into_bytes(), ctx),
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!(peer = %self.id, "Audio client closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                warn!(peer = %self.id, "Received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!(peer = %self.id, "WebSocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

impl Handler<Outbound> for AudioSocket {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        write_outbound(msg, ctx);
    }
}
