//! Typed message handlers.
//!
//! Handlers run on the session loop with both session locks held, so they
//! see a consistent view of the registry and game state and never await.

use std::marker::PhantomData;

use lockstep_netproto::PlayerId;
use lockstep_netproto::codec::decode_message;
use lockstep_netproto::messages::Message;
use lockstep_netproto::messages::chunked::{ChunkedDataComplete, ChunkedDataProgress};
use lockstep_netproto::messages::game::{
    ClientInitialStateAck, GameDigestError, GameDigestProgress, GameDigestResult, GameStatus,
    PowerButton, RequestChangeGame, RequestChangeGameFull, RequestStartGame, StartGameAck,
    StopGame, TimeBase,
};
use lockstep_netproto::messages::input::{
    GolfAcquire, GolfPrepare, GolfRelease, GolfRequest, PadData, PadHostData,
    RequestBufferChange, RequestPadMappingChange, WiimoteData,
};
use lockstep_netproto::messages::session::{ChatMessage, ClientCapabilities, Pong};
use lockstep_netproto::messages::sync::{SyncCodes, SyncSaveData};
use tracing::warn;

use super::error::{HandlerError, HandlerResult};
use super::registry::HandlerRegistry;
use crate::net::framing::PacketOwned;
use crate::session::Session;
use crate::session::registry::Registry;
use crate::session::state::GameState;

mod change_game;
mod chat;
mod chunked;
mod client_state;
mod game_control;
mod game_digest;
mod golf;
mod mapping_change;
mod pad_data;
mod pong;
mod sync_codes;
mod sync_save_data;
mod timebase;
mod wiimote_data;

/// Everything a handler may touch while processing one message.
pub(crate) struct HandlerContext<'a> {
    pub session: &'a Session,
    pub game: &'a mut GameState,
    pub reg: &'a mut Registry,
    /// Sender of the message being handled.
    pub pid: PlayerId,
}

/// Handles one decoded message type.
pub(crate) trait Handler<M: Message>: Send + Sync {
    fn handle(&self, ctx: &mut HandlerContext<'_>, msg: M) -> HandlerResult;
}

/// Object-safe handler that decodes its own payload.
pub(crate) trait ErasedHandler: Send + Sync {
    fn handle_erased(&self, ctx: &mut HandlerContext<'_>, payload: &[u8]) -> HandlerResult;
}

/// Adapter from `Handler<M>` to `ErasedHandler`.
pub(crate) struct TypedHandler<M, H> {
    handler: H,
    _marker: PhantomData<fn(M)>,
}

impl<M, H> TypedHandler<M, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<M: Message, H: Handler<M>> ErasedHandler for TypedHandler<M, H> {
    fn handle_erased(&self, ctx: &mut HandlerContext<'_>, payload: &[u8]) -> HandlerResult {
        let msg: M = decode_message(payload).map_err(|e| {
            warn!(pid = ctx.pid, msg_id = ?M::msg_id(), error = %e, "Undecodable message");
            HandlerError::BadMessage
        })?;
        self.handler.handle(ctx, msg)
    }
}

/// Every message a registered client may send.
pub(crate) fn build_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::default();
    registry
        .on::<ChatMessage, _>(chat::ChatHandler)
        .on::<PadData, _>(pad_data::PadDataHandler)
        .on::<PadHostData, _>(pad_data::PadHostDataHandler)
        .on::<WiimoteData, _>(wiimote_data::WiimoteDataHandler)
        .on::<GolfRequest, _>(golf::GolfRequestHandler)
        .on::<GolfRelease, _>(golf::GolfReleaseHandler)
        .on::<GolfAcquire, _>(golf::GolfAcquireHandler)
        .on::<GolfPrepare, _>(golf::GolfPrepareHandler)
        .on::<Pong, _>(pong::PongHandler)
        .on::<StartGameAck, _>(game_control::StartGameAckHandler)
        .on::<StopGame, _>(game_control::StopGameHandler)
        .on::<PowerButton, _>(game_control::PowerButtonHandler)
        .on::<ClientInitialStateAck, _>(game_control::InitialStateAckHandler)
        .on::<RequestStartGame, _>(game_control::RequestStartGameHandler)
        .on::<GameStatus, _>(client_state::GameStatusHandler)
        .on::<ClientCapabilities, _>(client_state::CapabilitiesHandler)
        .on::<TimeBase, _>(timebase::TimeBaseHandler)
        .on::<GameDigestProgress, _>(game_digest::DigestProgressHandler)
        .on::<GameDigestResult, _>(game_digest::DigestResultHandler)
        .on::<GameDigestError, _>(game_digest::DigestErrorHandler)
        .on::<RequestPadMappingChange, _>(mapping_change::MappingChangeHandler)
        .on::<RequestBufferChange, _>(mapping_change::BufferChangeHandler)
        .on::<RequestChangeGame, _>(change_game::ChangeGameHandler)
        .on::<RequestChangeGameFull, _>(change_game::ChangeGameFullHandler)
        .on::<ChunkedDataProgress, _>(chunked::ProgressHandler)
        .on::<ChunkedDataComplete, _>(chunked::CompleteHandler)
        .on::<SyncSaveData, _>(sync_save_data::SyncSaveDataHandler)
        .on::<SyncCodes, _>(sync_codes::SyncCodesHandler);
    registry
}

impl Session {
    /// Run the handler for a packet from registered player `pid`.
    ///
    /// Messages nobody handles (server-to-client messages, a second `Hello`)
    /// are violations too.
    pub(crate) fn dispatch(&self, pid: PlayerId, packet: &PacketOwned) -> HandlerResult {
        let (mut game, mut reg) = self.lock();
        if !reg.contains(pid) {
            return Ok(());
        }
        let mut ctx = HandlerContext {
            session: self,
            game: &mut game,
            reg: &mut reg,
            pid,
        };
        self.handlers
            .dispatch(packet.msg_id, &mut ctx, &packet.payload)
            .unwrap_or_else(|| Err(HandlerError::UnexpectedMessage))
    }
}
