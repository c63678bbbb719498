use lockstep_netproto::messages::chunked::{ChunkedDataComplete, ChunkedDataProgress};
use tracing::debug;

use super::{Handler, HandlerContext};
use crate::proto_dispatch::error::HandlerResult;

pub(crate) struct ProgressHandler;

impl Handler<ChunkedDataProgress> for ProgressHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: ChunkedDataProgress) -> HandlerResult {
        ctx.session
            .services
            .observer
            .on_chunk_progress(ctx.pid, msg.id, msg.progress);
        Ok(())
    }
}

pub(crate) struct CompleteHandler;

impl Handler<ChunkedDataComplete> for CompleteHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: ChunkedDataComplete) -> HandlerResult {
        if !ctx.session.chunks.complete(msg.id, ctx.pid) {
            debug!(pid = ctx.pid, id = msg.id, "Completion for an unknown transfer");
        }
        Ok(())
    }
}
