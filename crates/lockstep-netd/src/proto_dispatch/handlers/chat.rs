//! ChatHandler - relays a chat line to everyone else, tagged with its author.

use lockstep_netproto::messages::session::ChatMessage;
use tracing::info;

use super::{Handler, HandlerContext};
use crate::async_queue::Target;
use crate::proto_dispatch::error::HandlerResult;

pub(crate) struct ChatHandler;

impl Handler<ChatMessage> for ChatHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: ChatMessage) -> HandlerResult {
        let name = ctx.reg.get(ctx.pid).map(|c| c.name.as_str()).unwrap_or_default();
        info!(pid = ctx.pid, %name, text = %msg.text, "Chat");
        ctx.session
            .services
            .observer
            .on_chat(&format!("{name}[{}]: {}", ctx.pid, msg.text));

        ctx.reg.broadcast(
            &ChatMessage {
                author: ctx.pid,
                text: msg.text,
            },
            Target::AllExcept(ctx.pid),
        );
        Ok(())
    }
}
