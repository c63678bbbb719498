use serde::{Deserialize, Serialize};

use crate::messages::define_messages;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFileKind {
    File,
    Directory,
}

/// One entry of a title's save file list. `data` is compressed on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    pub path: String,
    pub mode: u8,
    pub attributes: u8,
    pub kind: SaveFileKind,
    pub data: Option<Vec<u8>>,
}

/// Header, metadata and file list for one title's save.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveBundle {
    pub header: Vec<u8>,
    pub metadata: Vec<u8>,
    pub files: Vec<SaveFile>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TitleSave {
    pub title_id: u64,
    /// `None` when the title has no save; the receiver deletes its own.
    pub save: Option<SaveBundle>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GciFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// Save-data synchronization sub-protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum SyncSaveData {
    /// Number of save pieces that will follow.
    Notify { save_count: u8 },
    /// Raw memory card image for slot A or B; `data` is compressed.
    RawData {
        is_slot_a: bool,
        region: String,
        size_override: i32,
        data: Option<Vec<u8>>,
    },
    /// GCI folder contents for slot A or B; each file is compressed.
    GciData { is_slot_a: bool, files: Vec<GciFile> },
    /// Persistent-storage saves for every title involved.
    WiiData {
        mii: Option<Vec<u8>>,
        titles: Vec<TitleSave>,
    },
    /// Handheld save for one slot; `data` is compressed.
    GbaData { slot: u8, data: Option<Vec<u8>> },
    UploadIntent,
    AllowUpload,
    Success,
    Failure,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLine {
    pub address: u32,
    pub data: u32,
}

/// Code-list synchronization sub-protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum SyncCodes {
    Notify,
    NotifyGecko { lines: u16 },
    GeckoData { codes: Vec<CodeLine> },
    NotifyAr { lines: u16 },
    ArData { codes: Vec<CodeLine> },
    Success,
    Failure,
}

define_messages! {
    SyncSaveData => SyncSaveData,
    SyncCodes => SyncCodes,
}
