//! Collaborators the session consumes but does not implement: save storage,
//! content installation, payload compression, code lists and the host UI.
//!
//! Embedders plug their own implementations into [`Services`]; the defaults
//! keep everything in memory and report through `tracing`.

use std::collections::HashMap;
use std::sync::Arc;

use lockstep_netproto::PlayerId;
use lockstep_netproto::messages::game::SyncIdentifier;
use lockstep_netproto::messages::sync::{CodeLine, SaveBundle};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::WiiBlobs;

/// Size of the memory-card seed sent with `StartGame`.
pub const SRAM_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("title {0:016x} is not writable")]
    ReadOnly(u64),
    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Memory-card slot state collected for save sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryCard {
    /// A raw card image.
    Raw {
        region: String,
        size_override: i32,
        image: Vec<u8>,
    },
    /// A folder of GCI files, `(name, contents)`.
    GciFolder { files: Vec<(String, Vec<u8>)> },
}

/// Save-data storage for the emulated console.
pub trait SaveStorage: Send + Sync {
    fn read_save(&self, title_id: u64) -> Option<SaveBundle>;

    fn write_save(&self, title_id: u64, bundle: SaveBundle) -> Result<(), StorageError>;

    fn delete_save(&self, title_id: u64) -> Result<(), StorageError>;

    /// Persistent-storage title for `game`, if it is a title that owns one.
    fn title_for(&self, _game: &SyncIdentifier) -> Option<u64> {
        None
    }

    /// Every title with a save, for "sync all" mode.
    fn installed_titles(&self) -> Vec<u64> {
        Vec::new()
    }

    fn memory_card(&self, _slot_a: bool) -> Option<MemoryCard> {
        None
    }

    fn gba_save(&self, _slot: usize) -> Option<Vec<u8>> {
        None
    }

    fn mii_data(&self) -> Option<Vec<u8>> {
        None
    }

    fn sram(&self) -> Vec<u8> {
        vec![0; SRAM_LEN]
    }
}

/// Installs a title's ticket, TMD and certificate chain into the emulated
/// console's storage. Whether the title is already present is the
/// implementation's concern.
pub trait ContentInstaller: Send + Sync {
    fn install(&self, game_id: &str, content: &WiiBlobs) -> Result<(), StorageError>;
}

/// Packs payloads for transfer.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Vec<u8>;

    /// `None` if `data` is not a valid packed payload.
    fn decompress(&self, data: &[u8]) -> Option<Vec<u8>>;
}

/// A cheat code as configured by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheatCode {
    pub name: String,
    pub enabled: bool,
    pub lines: Vec<CodeLine>,
}

/// Source of Gecko / Action Replay code lists.
pub trait CodeProvider: Send + Sync {
    fn gecko_codes(&self, game: &SyncIdentifier) -> Vec<CheatCode>;

    fn ar_codes(&self, game: &SyncIdentifier) -> Vec<CheatCode>;

    /// Policy gate applied before the enabled filter.
    fn is_approved(&self, _code: &CheatCode) -> bool {
        true
    }
}

/// Host UI notifications.
pub trait SessionObserver: Send + Sync {
    fn on_game_start_aborted(&self) {}

    fn on_chat(&self, _text: &str) {}

    fn on_chunk_progress(&self, _pid: PlayerId, _id: u32, _progress: u64) {}

    fn on_desync(&self, _pid: PlayerId, _frame: u64) {}

    fn on_game_digest_progress(&self, _pid: PlayerId, _progress: i32) {}

    fn on_game_digest_result(&self, _pid: PlayerId, _result: &str) {}

    fn on_game_digest_error(&self, _pid: PlayerId, _error: &str) {}
}

/// Everything the session consumes from its embedder.
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn SaveStorage>,
    pub installer: Arc<dyn ContentInstaller>,
    pub compressor: Arc<dyn Compressor>,
    pub codes: Arc<dyn CodeProvider>,
    pub observer: Arc<dyn SessionObserver>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            storage: Arc::new(MemorySaveStore::default()),
            installer: Arc::new(NoInstall),
            compressor: Arc::new(Lz4Compressor),
            codes: Arc::new(NoCodes),
            observer: Arc::new(LogObserver),
        }
    }
}

/// Largest payload a peer may ask us to unpack.
pub const MAX_UNPACKED_LEN: usize = 64 * 1024 * 1024;

pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn compress(&self, data: &[u8]) -> Vec<u8> {
        lz4_flex::compress_prepend_size(data)
    }

    fn decompress(&self, data: &[u8]) -> Option<Vec<u8>> {
        let declared = data.get(..4)?;
        let declared = u32::from_le_bytes(declared.try_into().ok()?) as usize;
        if declared > MAX_UNPACKED_LEN {
            return None;
        }
        lz4_flex::decompress_size_prepended(data).ok()
    }
}

/// Installer for hosts without console storage.
pub struct NoInstall;

impl ContentInstaller for NoInstall {
    fn install(&self, game_id: &str, _content: &WiiBlobs) -> Result<(), StorageError> {
        debug!(%game_id, "No content installer configured");
        Ok(())
    }
}

pub struct NoCodes;

impl CodeProvider for NoCodes {
    fn gecko_codes(&self, _game: &SyncIdentifier) -> Vec<CheatCode> {
        Vec::new()
    }

    fn ar_codes(&self, _game: &SyncIdentifier) -> Vec<CheatCode> {
        Vec::new()
    }
}

/// Observer that only logs.
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_game_start_aborted(&self) {
        warn!("Game start aborted");
    }

    fn on_chat(&self, text: &str) {
        info!(%text, "chat");
    }

    fn on_desync(&self, pid: PlayerId, frame: u64) {
        warn!(pid, frame, "Desync detected");
    }

    fn on_game_digest_result(&self, pid: PlayerId, result: &str) {
        info!(pid, %result, "Game digest");
    }

    fn on_game_digest_error(&self, pid: PlayerId, error: &str) {
        warn!(pid, %error, "Game digest failed");
    }
}

/// In-memory save storage.
#[derive(Default)]
pub struct MemorySaveStore {
    saves: Mutex<HashMap<u64, SaveBundle>>,
    cards: Mutex<HashMap<bool, MemoryCard>>,
    gba: Mutex<HashMap<usize, Vec<u8>>>,
    titles: Mutex<HashMap<String, u64>>,
}

impl MemorySaveStore {
    pub fn set_memory_card(&self, slot_a: bool, card: MemoryCard) {
        self.cards.lock().insert(slot_a, card);
    }

    pub fn set_gba_save(&self, slot: usize, data: Vec<u8>) {
        self.gba.lock().insert(slot, data);
    }

    /// Associate a game code with a persistent-storage title.
    pub fn register_title(&self, game_id: &str, title_id: u64) {
        self.titles.lock().insert(game_id.to_string(), title_id);
    }
}

impl SaveStorage for MemorySaveStore {
    fn read_save(&self, title_id: u64) -> Option<SaveBundle> {
        self.saves.lock().get(&title_id).cloned()
    }

    fn write_save(&self, title_id: u64, bundle: SaveBundle) -> Result<(), StorageError> {
        self.saves.lock().insert(title_id, bundle);
        Ok(())
    }

    fn delete_save(&self, title_id: u64) -> Result<(), StorageError> {
        self.saves.lock().remove(&title_id);
        Ok(())
    }

    fn title_for(&self, game: &SyncIdentifier) -> Option<u64> {
        self.titles.lock().get(&game.game_id).copied()
    }

    fn installed_titles(&self) -> Vec<u64> {
        let mut titles: Vec<u64> = self.saves.lock().keys().copied().collect();
        titles.sort_unstable();
        titles
    }

    fn memory_card(&self, slot_a: bool) -> Option<MemoryCard> {
        self.cards.lock().get(&slot_a).cloned()
    }

    fn gba_save(&self, slot: usize) -> Option<Vec<u8>> {
        self.gba.lock().get(&slot).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lz4_round_trips_and_rejects_garbage() {
        let c = Lz4Compressor;
        let data = vec![7u8; 10_000];
        let packed = c.compress(&data);
        assert!(packed.len() < data.len());
        assert_eq!(c.decompress(&packed).unwrap(), data);
        assert!(c.decompress(&[0xFF, 0xFF, 0xFF, 0x7F, 1]).is_none());
    }
}
