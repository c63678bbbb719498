//! Mapping and buffer change requests from participants.

use lockstep_netproto::constants::HOST_PLAYER_ID;
use lockstep_netproto::messages::input::{RequestBufferChange, RequestPadMappingChange};
use tracing::{info, warn};

use super::{Handler, HandlerContext};
use crate::proto_dispatch::error::{HandlerError, HandlerResult};

/// Replaces all three mapping tables. Host-only unless the server allows
/// participants to remap.
pub(crate) struct MappingChangeHandler;

impl Handler<RequestPadMappingChange> for MappingChangeHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: RequestPadMappingChange) -> HandlerResult {
        if ctx.pid != HOST_PLAYER_ID && !ctx.session.config().allow_client_mapping_changes {
            warn!(pid = ctx.pid, "Mapping change from a non-host participant");
            return Err(HandlerError::PermissionDenied);
        }
        info!(pid = ctx.pid, pads = ?msg.pads, wiimotes = ?msg.wiimotes, "Mapping change requested");
        ctx.session
            .apply_mapping_change(ctx.reg, msg.pads, msg.gba, msg.wiimotes);
        Ok(())
    }
}

pub(crate) struct BufferChangeHandler;

impl Handler<RequestBufferChange> for BufferChangeHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: RequestBufferChange) -> HandlerResult {
        let size = u32::try_from(msg.size).unwrap_or(0);
        info!(pid = ctx.pid, requested = msg.size, size, "Buffer change requested");
        ctx.session.apply_pad_buffer_size(ctx.game, size);
        Ok(())
    }
}
