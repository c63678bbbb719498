use lockstep_netproto::messages::game::GameStatus;
use lockstep_netproto::messages::session::ClientCapabilities;
use tracing::debug;

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::HandlerResult;

/// Whether the client's copy of the game matches the selection.
pub(crate) struct GameStatusHandler;

impl Handler<GameStatus> for GameStatusHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: GameStatus) -> HandlerResult {
        if let Some(client) = ctx.reg.get_mut(ctx.pid) {
            client.game_status = msg.status;
        }
        ctx.reg.broadcast(
            &GameStatus {
                pid: ctx.pid,
                status: msg.status,
            },
            Target::ALL,
        );
        Ok(())
    }
}

pub(crate) struct CapabilitiesHandler;

impl Handler<ClientCapabilities> for CapabilitiesHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: ClientCapabilities) -> HandlerResult {
        debug!(
            pid = ctx.pid,
            ipl = msg.has_ipl_dump,
            fma = msg.has_hardware_fma,
            "Client capabilities"
        );
        if let Some(client) = ctx.reg.get_mut(ctx.pid) {
            client.has_ipl_dump = msg.has_ipl_dump;
            client.has_hardware_fma = msg.has_hardware_fma;
        }
        Ok(())
    }
}
