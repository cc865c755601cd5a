//! Actix adapter for the hub's `Peer` capability.
//!
//! Frames are pushed into the connection actor's mailbox with `try_send`. The
//! mailbox is bounded (`hub.outbound_queue_capacity`), so a peer that stops
//! draining it turns into `QueueFull` and is evicted by the broadcaster.

use crate::hub::{Frame, Peer, PeerId, PeerSendError};
use actix::prelude::*;
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tracing::warn;

/// Message delivered to a connection actor on behalf of the hub.
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub enum Outbound {
    Frame(Frame),
    Close,
}

pub struct ActorPeer {
    id: PeerId,
    recipient: Recipient<Outbound>,
}

impl ActorPeer {
    pub fn new(id: PeerId, recipient: Recipient<Outbound>) -> Self {
        Self { id, recipient }
    }
}

impl Peer for ActorPeer {
    fn id(&self) -> PeerId {
        self.id
    }

    fn send(&self, frame: Frame) -> Result<(), PeerSendError> {
        self.recipient
            .try_send(Outbound::Frame(frame))
            .map_err(|err| match err {
                SendError::Full(_) => PeerSendError::QueueFull,
                SendError::Closed(_) => PeerSendError::Disconnected,
            })
    }

    fn close(&self) {
        // Ignores mailbox capacity; a no-op once the actor is gone.
        self.recipient.do_send(Outbound::Close);
    }
}

/// Write an outbound message on the socket owned by `ctx`.
pub(crate) fn write_outbound<A>(msg: Outbound, ctx: &mut ws::WebsocketContext<A>)
where
    A: Actor<Context = ws::WebsocketContext<A>>,
{
    match msg {
        Outbound::Frame(Frame::Binary(bytes)) => ctx.binary(bytes),
        Outbound::Frame(Frame::Text(text)) => ctx.text(text),
        Outbound::Close => {
            ctx.close(Some(ws::CloseCode::Normal.into()));
            ctx.stop();
        }
    }
}

/// Implemented by connection actors that track client liveness.
pub(crate) trait Heartbeat {
    fn peer_id(&self) -> PeerId;
    fn last_heartbeat(&self) -> Instant;
}

/// Ping the client every `interval`; stop the actor if nothing was heard for `timeout`.
pub(crate) fn start_heartbeat<A>(ctx: &mut ws::WebsocketContext<A>, interval: Duration, timeout: Duration)
where
    A: Heartbeat + Actor<Context = ws::WebsocketContext<A>>,
{
    ctx.run_interval(interval, move |act, ctx| {
        if Instant::now().duration_since(act.last_heartbeat()) > timeout {
            warn!(peer = %act.peer_id(), "WebSocket heartbeat timeout, closing connection");
            ctx.stop();
            return;
        }
        ctx.ping(b"");
    });
}
