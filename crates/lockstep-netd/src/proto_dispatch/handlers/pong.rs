//! PongHandler - records round-trip time for the current ping key.

use lockstep_netproto::messages::session::{PlayerPingData, Pong};
use tracing::trace;

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::HandlerResult;
use crate::session::Session;

pub(crate) struct PongHandler;

impl Handler<Pong> for PongHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: Pong) -> HandlerResult {
        let elapsed = Session::ping_elapsed_ms(ctx.game);
        let key = ctx.game.ping_key;
        let Some(client) = ctx.reg.get_mut(ctx.pid) else {
            return Ok(());
        };
        // A stale key still triggers a report, with the previous value.
        if msg.key == key {
            client.ping_ms = elapsed;
        }
        trace!(pid = ctx.pid, ping_ms = client.ping_ms, "Pong");

        let data = PlayerPingData {
            pid: ctx.pid,
            ping_ms: client.ping_ms,
        };
        ctx.reg.broadcast(&data, Target::ALL);
        Ok(())
    }
}
