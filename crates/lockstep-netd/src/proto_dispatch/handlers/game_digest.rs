//! Game digest reports are rebroadcast tagged with the reporting player.

use lockstep_netproto::messages::game::{GameDigestError, GameDigestProgress, GameDigestResult};

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::HandlerResult;

pub(crate) struct DigestProgressHandler;

impl Handler<GameDigestProgress> for DigestProgressHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: GameDigestProgress) -> HandlerResult {
        ctx.session
            .services
            .observer
            .on_game_digest_progress(ctx.pid, msg.progress);
        ctx.reg.broadcast(
            &GameDigestProgress {
                pid: ctx.pid,
                progress: msg.progress,
            },
            Target::ALL,
        );
        Ok(())
    }
}

pub(crate) struct DigestResultHandler;

impl Handler<GameDigestResult> for DigestResultHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: GameDigestResult) -> HandlerResult {
        ctx.session
            .services
            .observer
            .on_game_digest_result(ctx.pid, &msg.result);
        ctx.reg.broadcast(
            &GameDigestResult {
                pid: ctx.pid,
                result: msg.result,
            },
            Target::ALL,
        );
        Ok(())
    }
}

pub(crate) struct DigestErrorHandler;

impl Handler<GameDigestError> for DigestErrorHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: GameDigestError) -> HandlerResult {
        ctx.session
            .services
            .observer
            .on_game_digest_error(ctx.pid, &msg.error);
        ctx.reg.broadcast(
            &GameDigestError {
                pid: ctx.pid,
                error: msg.error,
            },
            Target::ALL,
        );
        Ok(())
    }
}
