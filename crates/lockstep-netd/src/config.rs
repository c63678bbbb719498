use std::path::PathBuf;
use std::time::Duration;

use lockstep_netproto::constants::{
    CHUNKED_DATA_UNIT_SIZE, DEFAULT_PAD_BUFFER_SIZE, PAD_MAPPING_GRACE_FRAMES,
};

/// Chunked transfer tuning.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Bytes per payload unit.
    pub unit_size: usize,
    /// Bandwidth cap in kilobits per second. `None` streams as fast as possible.
    pub rate_limit_kbps: Option<u32>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            unit_size: CHUNKED_DATA_UNIT_SIZE,
            rate_limit_kbps: None,
        }
    }
}

/// Lobby idle eviction.
#[derive(Debug, Clone)]
pub struct IdleConfig {
    /// How often the supervisor sweeps.
    pub check_interval: Duration,
    /// Sweeps a non-host client may stay in the lobby before eviction.
    pub max_idle_ticks: u32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(1),
            max_idle_ticks: 600,
        }
    }
}

/// Session server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Display name used in server-originated notices.
    pub server_name: String,
    /// Where the game catalog JSON lives.
    pub catalog_path: PathBuf,
    pub ping_interval: Duration,
    pub pad_buffer_size: u32,
    pub pad_mapping_grace_frames: u32,
    /// Let non-host participants rewrite the mapping tables.
    pub allow_client_mapping_changes: bool,
    pub chunk: ChunkConfig,
    /// `None` disables lobby idle eviction.
    pub idle: Option<IdleConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "lockstep".to_string(),
            catalog_path: PathBuf::from("games_list.json"),
            ping_interval: Duration::from_secs(1),
            pad_buffer_size: DEFAULT_PAD_BUFFER_SIZE,
            pad_mapping_grace_frames: PAD_MAPPING_GRACE_FRAMES,
            allow_client_mapping_changes: false,
            chunk: ChunkConfig::default(),
            idle: Some(IdleConfig::default()),
        }
    }
}
