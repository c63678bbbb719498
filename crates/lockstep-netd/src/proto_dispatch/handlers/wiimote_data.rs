use lockstep_netproto::constants::MAX_WIIMOTE_STATE_LEN;
use lockstep_netproto::messages::input::WiimoteData;
use tracing::{trace, warn};

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::{HandlerError, HandlerResult};

/// Motion-controller state. Unlike pads there is no grace window: data for
/// a slot the sender does not own is a violation.
pub(crate) struct WiimoteDataHandler;

impl Handler<WiimoteData> for WiimoteDataHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: WiimoteData) -> HandlerResult {
        let stale = ctx
            .reg
            .get(ctx.pid)
            .is_none_or(|c| c.current_game != ctx.game.current_game);
        if stale {
            trace!(pid = ctx.pid, "Dropping motion data from a previous game");
            return Ok(());
        }

        let Some(owner) = ctx.reg.mappings.wiimote_owner(msg.slot as usize) else {
            return Err(HandlerError::InvalidSlot);
        };
        if owner != ctx.pid {
            warn!(pid = ctx.pid, slot = msg.slot, owner, "Motion data for a foreign slot");
            return Err(HandlerError::PermissionDenied);
        }
        if msg.data.len() > MAX_WIIMOTE_STATE_LEN {
            return Err(HandlerError::PayloadTooLarge);
        }

        ctx.reg.broadcast(&msg, Target::AllExcept(ctx.pid));
        Ok(())
    }
}
