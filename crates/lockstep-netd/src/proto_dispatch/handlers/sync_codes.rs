use lockstep_netproto::messages::sync::SyncCodes;
use tracing::warn;

use super::{Handler, HandlerContext};
use crate::proto_dispatch::error::{HandlerError, HandlerResult};
use crate::sync;

pub(crate) struct SyncCodesHandler;

impl Handler<SyncCodes> for SyncCodesHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: SyncCodes) -> HandlerResult {
        match msg {
            SyncCodes::Success => sync::on_code_success(ctx.session, ctx.game, ctx.reg, ctx.pid),
            SyncCodes::Failure => {
                sync::on_sync_failure(ctx.session, ctx.game, ctx.reg, ctx.pid, "codes")
            }
            _ => {
                warn!(pid = ctx.pid, "Server-bound code sync message from a client");
                return Err(HandlerError::UnexpectedMessage);
            }
        }
        Ok(())
    }
}
