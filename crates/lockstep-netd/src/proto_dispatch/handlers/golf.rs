//! Host input authority hand-over ("golf mode").
//!
//! A player asks for authority to move to `pid`; the server prepares the
//! target, the old golfer releases, and the target acquires.

use lockstep_netproto::messages::input::{
    GolfAcquire, GolfPrepare, GolfRelease, GolfRequest, GolfSwitch,
};
use tracing::{debug, info};

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::HandlerResult;

pub(crate) struct GolfRequestHandler;

impl Handler<GolfRequest> for GolfRequestHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: GolfRequest) -> HandlerResult {
        let target = msg.pid;
        let mappings = &ctx.reg.mappings;
        // Spectators cannot ask, and only connected players can receive.
        if !ctx.reg.contains(target) || !mappings.has_controller(ctx.pid) {
            debug!(pid = ctx.pid, target, "Ignoring golf request");
            return Ok(());
        }

        let game = &mut *ctx.game;
        if game.host_input_authority
            && game.settings.golf_mode
            && game.pending_golfer == 0
            && game.current_golfer != target
            && mappings.has_controller(target)
        {
            info!(pid = ctx.pid, target, "Preparing golf hand-over");
            game.pending_golfer = target;
            ctx.reg.send_to(target, &GolfPrepare);
        }
        Ok(())
    }
}

pub(crate) struct GolfReleaseHandler;

impl Handler<GolfRelease> for GolfReleaseHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, _msg: GolfRelease) -> HandlerResult {
        let pending = ctx.game.pending_golfer;
        if pending != 0 {
            ctx.reg.broadcast(&GolfSwitch { pid: pending }, Target::ALL);
        }
        Ok(())
    }
}

pub(crate) struct GolfAcquireHandler;

impl Handler<GolfAcquire> for GolfAcquireHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, _msg: GolfAcquire) -> HandlerResult {
        let game = &mut *ctx.game;
        if game.pending_golfer != 0 {
            info!(golfer = game.pending_golfer, "Golf hand-over complete");
            game.current_golfer = game.pending_golfer;
            game.pending_golfer = 0;
        }
        Ok(())
    }
}

/// The target is ready; nobody holds authority until it acquires.
pub(crate) struct GolfPrepareHandler;

impl Handler<GolfPrepare> for GolfPrepareHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, _msg: GolfPrepare) -> HandlerResult {
        if ctx.game.pending_golfer != 0 {
            ctx.game.current_golfer = 0;
            ctx.reg.broadcast(&GolfSwitch { pid: 0 }, Target::ALL);
        }
        Ok(())
    }
}
