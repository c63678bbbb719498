use std::collections::BTreeSet;

use lockstep_netproto::PlayerId;
use lockstep_netproto::messages::game::{ChangeGame, NetSettings, SyncIdentifier};

use super::desync::TimebaseLedger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedGame {
    pub sync_identifier: SyncIdentifier,
    pub netplay_name: String,
}

impl SelectedGame {
    pub fn message(&self) -> ChangeGame {
        ChangeGame {
            sync_identifier: self.sync_identifier.clone(),
            netplay_name: self.netplay_name.clone(),
        }
    }
}

/// Progress of the pre-start handshake phases.
#[derive(Debug, Default)]
pub struct SyncProgress {
    pub saves_synced: bool,
    pub codes_synced: bool,
    /// Non-host players that reported a successful save sync.
    pub save_acks: BTreeSet<PlayerId>,
    pub code_acks: BTreeSet<PlayerId>,
}

impl SyncProgress {
    /// Both phases vacuously satisfied; a phase that gets enabled clears its flag.
    pub fn reset(&mut self) {
        *self = SyncProgress {
            saves_synced: true,
            codes_synced: true,
            ..SyncProgress::default()
        };
    }

    pub fn all_synced(&self) -> bool {
        self.saves_synced && self.codes_synced
    }
}

/// Game selection, configuration and lifecycle flags. Guarded by the game lock.
#[derive(Debug)]
pub struct GameState {
    pub selected_game: Option<SelectedGame>,
    /// Host configuration, copied into `snapshot` on every start attempt.
    pub settings: NetSettings,
    pub snapshot: Option<NetSettings>,
    pub is_running: bool,
    pub start_pending: bool,
    pub pad_buffer_size: u32,
    pub host_input_authority: bool,
    pub current_golfer: PlayerId,
    pub pending_golfer: PlayerId,
    /// Token of the most recent start.
    pub current_game: u32,
    /// Consecutive mismatched pad frames relayed so far.
    pub grace_counter: u32,
    pub timebase: TimebaseLedger,
    pub sync: SyncProgress,
    pub ping_key: u32,
    pub ping_sent_at: Option<std::time::Instant>,
}

impl GameState {
    pub fn new(settings: NetSettings, pad_buffer_size: u32) -> Self {
        Self {
            selected_game: None,
            settings,
            snapshot: None,
            is_running: false,
            start_pending: false,
            pad_buffer_size,
            host_input_authority: false,
            current_golfer: 1,
            pending_golfer: 0,
            current_game: 0,
            grace_counter: 0,
            timebase: TimebaseLedger::default(),
            sync: SyncProgress::default(),
            ping_key: 0,
            ping_sent_at: None,
        }
    }

    /// A game is running or about to.
    pub fn is_busy(&self) -> bool {
        self.is_running || self.start_pending
    }
}
