//! Message id to handler routing table.

use std::collections::HashMap;

use lockstep_netproto::messages::Message;
use lockstep_netproto::msg_id::MsgId;

use super::error::HandlerResult;
use super::handlers::{ErasedHandler, Handler, HandlerContext, TypedHandler};

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: HashMap<MsgId, Box<dyn ErasedHandler>>,
}

impl HandlerRegistry {
    /// Route every `M` to `handler`. Each id may be claimed once.
    pub(crate) fn on<M, H>(&mut self, handler: H) -> &mut Self
    where
        M: Message,
        H: Handler<M> + 'static,
    {
        let previous = self
            .handlers
            .insert(M::msg_id(), Box::new(TypedHandler::<M, H>::new(handler)));
        debug_assert!(previous.is_none(), "duplicate handler for {:?}", M::msg_id());
        self
    }

    /// Decode and handle one payload. `None` if nobody handles `msg_id`.
    pub(crate) fn dispatch(
        &self,
        msg_id: MsgId,
        ctx: &mut HandlerContext<'_>,
        payload: &[u8],
    ) -> Option<HandlerResult> {
        self.handlers
            .get(&msg_id)
            .map(|handler| handler.handle_erased(ctx, payload))
    }

    #[cfg(test)]
    pub(crate) fn has_handler(&self, msg_id: MsgId) -> bool {
        self.handlers.contains_key(&msg_id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }
}
