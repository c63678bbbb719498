//! TimeBaseHandler - per-frame checksum comparison and desync blame.

use lockstep_netproto::messages::game::{DesyncDetected, TimeBase};
use tracing::{trace, warn};

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::HandlerResult;
use crate::session::desync::TimebaseOutcome;

pub(crate) struct TimeBaseHandler;

impl Handler<TimeBase> for TimeBaseHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: TimeBase) -> HandlerResult {
        let expected = ctx.reg.len();
        match ctx
            .game
            .timebase
            .record(ctx.pid, msg.frame, msg.value, expected)
        {
            TimebaseOutcome::Desync { blamed } => {
                warn!(frame = msg.frame, blamed, "Desync detected");
                ctx.reg.broadcast(
                    &DesyncDetected {
                        pid: blamed,
                        frame: msg.frame,
                    },
                    Target::ALL,
                );
                ctx.session.services.observer.on_desync(blamed, msg.frame);
            }
            TimebaseOutcome::Consistent => trace!(frame = msg.frame, "Timebase consistent"),
            TimebaseOutcome::Pending | TimebaseOutcome::Suppressed => {}
        }
        Ok(())
    }
}
