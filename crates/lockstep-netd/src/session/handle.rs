//! Host-side control surface.
//!
//! A [`SessionHandle`] can be cloned into any thread. Each call takes the
//! game lock, then the registry lock, mutates state and publishes the
//! resulting packets through the async queue. Mapping tables are the
//! exception: they go straight to the peers under the registry lock so they
//! stay ordered with the tables a join or leave sends.

use std::sync::Arc;

use lockstep_netproto::PlayerId;
use lockstep_netproto::messages::Message;
use lockstep_netproto::messages::game::{
    ComputeGameDigest, GameDigestAbort, NetSettings, PlayerGameStatus, StopGame, SyncIdentifier,
};
use lockstep_netproto::messages::input::{
    GbaConfigArray, HostInputAuthority, PadBuffer, PadMappingArray,
};
use lockstep_netproto::messages::session::ChatMessage;
use tracing::{info, warn};

use super::Session;
use super::mapping::sanitize;
use super::registry::Registry;
use super::state::{GameState, SelectedGame};
use crate::async_queue::Target;
use crate::catalog::WiiBlobs;
use crate::sync::{self, StartError};

/// Roster entry exposed to the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub pid: PlayerId,
    pub name: String,
    pub revision: String,
    pub ping_ms: u32,
    pub game_status: PlayerGameStatus,
}

#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Session>,
}

impl Session {
    /// Queue `msg` for `target`, logging encode failures.
    pub(crate) fn publish<T: Message>(&self, msg: &T, target: Target) {
        if let Err(e) = self.queue.send(msg, target) {
            warn!(msg_id = ?T::msg_id(), error = %e, "Failed to encode queued message");
        }
    }

    pub(crate) fn apply_pad_mapping(&self, reg: &mut Registry, pads: PadMappingArray) {
        reg.mappings.pads = sanitize(pads, |pid| reg.contains(pid));
        reg.broadcast(&reg.mappings.pad_message(), Target::ALL);
    }

    pub(crate) fn apply_gba_config(&self, reg: &mut Registry, gba: GbaConfigArray) {
        reg.mappings.gba = gba;
        reg.broadcast(&reg.mappings.gba_message(), Target::ALL);
    }

    pub(crate) fn apply_wiimote_mapping(&self, reg: &mut Registry, wiimotes: PadMappingArray) {
        reg.mappings.wiimotes = sanitize(wiimotes, |pid| reg.contains(pid));
        reg.broadcast(&reg.mappings.wiimote_message(), Target::ALL);
    }

    /// Replace all three tables at once, as a participant's remap request does.
    pub(crate) fn apply_mapping_change(
        &self,
        reg: &mut Registry,
        pads: PadMappingArray,
        gba: GbaConfigArray,
        wiimotes: PadMappingArray,
    ) {
        let connected = reg.pids();
        reg.mappings
            .replace(pads, gba, wiimotes, |pid| connected.contains(&pid));
        reg.broadcast_mappings();
    }

    /// Store the buffer depth; clients only hear about it without host authority.
    pub(crate) fn apply_pad_buffer_size(&self, game: &mut GameState, size: u32) {
        game.pad_buffer_size = size;
        if !game.host_input_authority {
            self.publish(&PadBuffer { size }, Target::ALL);
        }
    }

    pub(crate) fn apply_change_game(
        &self,
        game: &mut GameState,
        reg: &mut Registry,
        sync_identifier: SyncIdentifier,
        netplay_name: String,
        content: WiiBlobs,
    ) {
        info!(
            name = %netplay_name,
            game_id = %sync_identifier.game_id,
            hash = %hex::encode(sync_identifier.sync_hash),
            "Changing game"
        );
        let selected = SelectedGame {
            sync_identifier,
            netplay_name,
        };
        self.install_content(&selected.sync_identifier.game_id, content);
        self.publish(&selected.message(), Target::ALL);
        game.selected_game = Some(selected);
        reg.readiness.reset_except_host();
    }

    /// Hand `content` to the installer on a blocking task. Empty content is
    /// skipped.
    fn install_content(&self, game_id: &str, content: WiiBlobs) {
        if content.is_empty() {
            return;
        }
        let installer = self.services.installer.clone();
        let game_id = game_id.to_string();
        self.tasks.spawn_blocking(move || {
            match installer.install(&game_id, &content) {
                Ok(()) => info!(%game_id, "Installed title content"),
                Err(e) => warn!(%game_id, error = %e, "Failed to install title content"),
            }
        });
    }
}

impl SessionHandle {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn players(&self) -> Vec<PlayerInfo> {
        self.session
            .registry
            .read()
            .clients()
            .map(|c| PlayerInfo {
                pid: c.pid,
                name: c.name.clone(),
                revision: c.revision.clone(),
                ping_ms: c.ping_ms,
                game_status: c.game_status,
            })
            .collect()
    }

    pub fn pad_mapping(&self) -> PadMappingArray {
        self.session.registry.read().mappings.pads
    }

    pub fn gba_config(&self) -> GbaConfigArray {
        self.session.registry.read().mappings.gba.clone()
    }

    pub fn wiimote_mapping(&self) -> PadMappingArray {
        self.session.registry.read().mappings.wiimotes
    }

    pub fn is_running(&self) -> bool {
        self.session.game.lock().is_running
    }

    pub fn is_start_pending(&self) -> bool {
        self.session.game.lock().start_pending
    }

    pub fn set_pad_mapping(&self, pads: PadMappingArray) {
        let (_game, mut reg) = self.session.lock();
        self.session.apply_pad_mapping(&mut reg, pads);
    }

    pub fn set_gba_config(&self, gba: GbaConfigArray) {
        let (_game, mut reg) = self.session.lock();
        self.session.apply_gba_config(&mut reg, gba);
    }

    pub fn set_wiimote_mapping(&self, wiimotes: PadMappingArray) {
        let (_game, mut reg) = self.session.lock();
        self.session.apply_wiimote_mapping(&mut reg, wiimotes);
    }

    pub fn adjust_pad_buffer_size(&self, size: u32) {
        let mut game = self.session.game.lock();
        self.session.apply_pad_buffer_size(&mut game, size);
    }

    /// Toggle host input authority. Turning it off re-sends the buffer depth.
    pub fn set_host_input_authority(&self, enabled: bool) {
        let mut game = self.session.game.lock();
        game.host_input_authority = enabled;
        self.session
            .publish(&HostInputAuthority { enabled }, Target::ALL);
        if !enabled {
            let size = game.pad_buffer_size;
            self.session.apply_pad_buffer_size(&mut game, size);
        }
    }

    pub fn set_golf_mode(&self, enabled: bool) {
        self.session.game.lock().settings.golf_mode = enabled;
    }

    /// Replace the host's emulation settings used for the next start.
    pub fn set_settings(&self, settings: NetSettings) {
        self.session.game.lock().settings = settings;
    }

    /// Select a game for the lobby. Ignored while a game is running or starting.
    pub fn change_game(&self, sync_identifier: SyncIdentifier, netplay_name: impl Into<String>) {
        let (mut game, mut reg) = self.session.lock();
        if game.is_busy() {
            warn!(game_id = %sync_identifier.game_id, "Ignoring game change while a game is running");
            return;
        }
        self.session
            .apply_change_game(
                &mut game,
                &mut reg,
                sync_identifier,
                netplay_name.into(),
                WiiBlobs::default(),
            );
    }

    pub fn compute_game_digest(&self, sync_identifier: SyncIdentifier) {
        self.session
            .publish(&ComputeGameDigest { sync_identifier }, Target::ALL);
    }

    pub fn abort_game_digest(&self) {
        self.session.publish(&GameDigestAbort, Target::ALL);
    }

    /// Chat from the host, authored by the server (id 0).
    pub fn send_chat_message(&self, text: impl Into<String>) {
        self.session.publish(
            &ChatMessage {
                author: 0,
                text: text.into(),
            },
            Target::ALL,
        );
    }

    pub fn send_private_chat(&self, target: PlayerId, author: PlayerId, text: impl Into<String>) {
        self.session.publish(
            &ChatMessage {
                author,
                text: text.into(),
            },
            Target::Only(target),
        );
    }

    pub fn request_start_game(&self) -> Result<(), StartError> {
        let (mut game, mut reg) = self.session.lock();
        sync::request_start(&self.session, &mut game, &mut reg)
    }

    pub fn abort_game_start(&self) {
        let mut game = self.session.game.lock();
        sync::abort_start(&self.session, &mut game);
    }

    pub fn stop_game(&self) {
        let (mut game, mut reg) = self.session.lock();
        if !game.is_running {
            return;
        }
        info!("Stopping game");
        game.is_running = false;
        reg.readiness.reset_except_host();
        self.session.publish(&StopGame, Target::ALL);
    }

    /// Forcibly disconnect `pid`.
    pub fn kick_player(&self, pid: PlayerId) {
        self.session.queue.kick(pid, "kicked by host");
    }
}
