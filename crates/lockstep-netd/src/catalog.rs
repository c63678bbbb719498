//! Persisted game catalog (`games_list.json`).
//!
//! Read on every lookup; learning a new game appends an entry and rewrites
//! the whole document with a fresh `generated_at` timestamp. Entries this
//! server does not understand are carried through untouched.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lockstep_netproto::constants::SYNC_HASH_LEN;
use lockstep_netproto::messages::game::{DiscRegion, SyncIdentifier};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog i/o: {0}")]
    Io(#[from] io::Error),
    #[error("catalog json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct CatalogDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generated_at: Option<String>,
    #[serde(default)]
    games: Vec<serde_json::Value>,
}

/// Nested identity object stored alongside each entry.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSyncIdentifier {
    #[serde(default)]
    pub dol_elf_size: u64,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub revision: u16,
    #[serde(default)]
    pub disc_number: u8,
    #[serde(default)]
    pub is_datel: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    #[serde(default)]
    pub netplay_name: String,
    pub game_id: String,
    #[serde(default)]
    pub revision: u16,
    #[serde(default)]
    pub disc_number: u8,
    /// Hex content hash; compared case-insensitively.
    pub sync_hash: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub sync_identifier: Option<CatalogSyncIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmd_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
}

/// Optional installable-content blobs for a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WiiBlobs {
    pub tmd: Option<Vec<u8>>,
    pub ticket: Option<Vec<u8>>,
    pub cert: Option<Vec<u8>>,
}

impl WiiBlobs {
    pub fn is_empty(&self) -> bool {
        [&self.tmd, &self.ticket, &self.cert]
            .iter()
            .all(|b| b.as_ref().is_none_or(|b| b.is_empty()))
    }
}

impl CatalogEntry {
    pub fn new(
        sync_identifier: &SyncIdentifier,
        netplay_name: &str,
        region: DiscRegion,
        blobs: &WiiBlobs,
    ) -> Self {
        let non_empty = |b: &Option<Vec<u8>>| b.as_ref().filter(|b| !b.is_empty()).map(hex::encode);
        Self {
            netplay_name: netplay_name.to_string(),
            game_id: sync_identifier.game_id.clone(),
            revision: sync_identifier.revision,
            disc_number: sync_identifier.disc_number,
            sync_hash: hex::encode(sync_identifier.sync_hash),
            region: region.name().to_string(),
            sync_identifier: Some(CatalogSyncIdentifier {
                dol_elf_size: sync_identifier.dol_elf_size,
                game_id: sync_identifier.game_id.clone(),
                revision: sync_identifier.revision,
                disc_number: sync_identifier.disc_number,
                is_datel: sync_identifier.is_datel,
            }),
            tmd: non_empty(&blobs.tmd),
            tmd_size: blobs
                .tmd
                .as_ref()
                .filter(|b| !b.is_empty())
                .map(|b| b.len() as u64),
            ticket: non_empty(&blobs.ticket),
            cert: non_empty(&blobs.cert),
        }
    }

    /// Stored content blobs. Fields that fail to decode are left out.
    pub fn wii_blobs(&self) -> WiiBlobs {
        let decode = |b: &Option<String>| b.as_deref().and_then(|b| hex::decode(b).ok());
        WiiBlobs {
            tmd: decode(&self.tmd),
            ticket: decode(&self.ticket),
            cert: decode(&self.cert),
        }
    }

    pub fn matches(&self, game_id: &str, sync_hash: &[u8; SYNC_HASH_LEN]) -> bool {
        self.game_id == game_id && self.sync_hash.eq_ignore_ascii_case(&hex::encode(sync_hash))
    }

    /// Display name, falling back to the game code.
    pub fn display_name(&self) -> &str {
        if self.netplay_name.is_empty() {
            &self.game_id
        } else {
            &self.netplay_name
        }
    }

    pub fn to_sync_identifier(&self, sync_hash: [u8; SYNC_HASH_LEN]) -> SyncIdentifier {
        let nested = self.sync_identifier.clone().unwrap_or_default();
        SyncIdentifier {
            dol_elf_size: nested.dol_elf_size,
            game_id: self.game_id.clone(),
            revision: self.revision,
            disc_number: self.disc_number,
            is_datel: nested.is_datel,
            sync_hash,
        }
    }
}

pub struct GameCatalog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl GameCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<CatalogDocument, CatalogError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CatalogDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Find the entry for `(game_id, sync_hash)`. A missing file is an empty catalog.
    pub fn lookup(
        &self,
        game_id: &str,
        sync_hash: &[u8; SYNC_HASH_LEN],
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let doc = self.load()?;
        Ok(doc
            .games
            .into_iter()
            .filter_map(|v| serde_json::from_value::<CatalogEntry>(v).ok())
            .find(|e| e.matches(game_id, sync_hash)))
    }

    /// Append `entry` unless one with the same code and hash exists.
    /// Returns `true` if the file was rewritten.
    pub fn register(&self, entry: CatalogEntry) -> Result<bool, CatalogError> {
        let _guard = self.write_lock.lock();
        let mut doc = self.load()?;

        let exists = doc
            .games
            .iter()
            .filter_map(|v| serde_json::from_value::<CatalogEntry>(v.clone()).ok())
            .any(|e| e.game_id == entry.game_id && e.sync_hash.eq_ignore_ascii_case(&entry.sync_hash));
        if exists {
            debug!(game_id = %entry.game_id, hash = %entry.sync_hash, "Game already in catalog");
            return Ok(false);
        }

        info!(game_id = %entry.game_id, hash = %entry.sync_hash, "Adding game to catalog");
        doc.games.push(serde_json::to_value(&entry)?);
        doc.generated_at = Some(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&doc)?)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identifier(game_id: &str, hash: u8) -> SyncIdentifier {
        SyncIdentifier {
            dol_elf_size: 0x1234,
            game_id: game_id.to_string(),
            revision: 1,
            disc_number: 0,
            is_datel: false,
            sync_hash: [hash; SYNC_HASH_LEN],
        }
    }

    #[test]
    fn missing_file_is_an_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = GameCatalog::new(dir.path().join("games_list.json"));
        assert_eq!(catalog.lookup("GALE01", &[0; SYNC_HASH_LEN]).unwrap(), None);
    }

    #[test]
    fn registered_entries_are_found_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("games_list.json");
        let catalog = GameCatalog::new(&path);
        let id = identifier("RSBE01", 0xAB);

        let entry = CatalogEntry::new(
            &id,
            "Brawl",
            DiscRegion::NtscU,
            &WiiBlobs {
                tmd: Some(vec![1, 2, 3]),
                ticket: Some(Vec::new()),
                cert: None,
            },
        );
        assert!(catalog.register(entry.clone()).unwrap());
        assert!(!catalog.register(entry).unwrap());

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw["generated_at"].as_str().unwrap().ends_with('Z'));
        let game = &raw["games"][0];
        assert_eq!(game["sync_hash"], "abababababababababababababababababababab");
        assert_eq!(game["region"], "NTSC-U");
        assert_eq!(game["tmd"], "010203");
        assert_eq!(game["tmd_size"], 3);
        assert!(game.get("ticket").is_none());
        assert_eq!(game["sync_identifier"]["dol_elf_size"], 0x1234);

        let found = catalog.lookup("RSBE01", &[0xAB; SYNC_HASH_LEN]).unwrap().unwrap();
        assert_eq!(found.display_name(), "Brawl");
        assert_eq!(found.to_sync_identifier([0xAB; SYNC_HASH_LEN]), id);
        assert!(catalog.lookup("RSBE01", &[0xAC; SYNC_HASH_LEN]).unwrap().is_none());
    }

    #[test]
    fn foreign_entries_survive_a_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games_list.json");
        std::fs::write(
            &path,
            r#"{"generated_at":"2020-01-01T00:00:00Z","games":[
                "not an object",
                {"game_id":"GALE01","sync_hash":"ABABABABABABABABABABABABABABABABABABABAB"}
            ]}"#,
        )
        .unwrap();
        let catalog = GameCatalog::new(&path);

        let found = catalog.lookup("GALE01", &[0xAB; SYNC_HASH_LEN]).unwrap().unwrap();
        assert_eq!(found.display_name(), "GALE01");

        let entry = CatalogEntry::new(&identifier("GZLE01", 1), "Wind Waker", DiscRegion::Pal, &WiiBlobs::default());
        assert!(catalog.register(entry).unwrap());

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["games"].as_array().unwrap().len(), 3);
        assert_eq!(raw["games"][0], "not an object");
    }
}
