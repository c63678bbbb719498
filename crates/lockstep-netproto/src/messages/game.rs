use serde::{Deserialize, Serialize};

use crate::PlayerId;
use crate::constants::SYNC_HASH_LEN;
use crate::messages::define_messages;

/// Identifies exactly which game build everyone must run.
///
/// Field order is the wire order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SyncIdentifier {
    pub dol_elf_size: u64,
    pub game_id: String,
    pub revision: u16,
    pub disc_number: u8,
    pub is_datel: bool,
    pub sync_hash: [u8; SYNC_HASH_LEN],
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscRegion {
    NtscJ = 0,
    NtscU = 1,
    Pal = 2,
    #[default]
    Unknown = 3,
    NtscK = 4,
}

impl DiscRegion {
    /// Human-readable region name, as stored in the game catalog.
    pub const fn name(self) -> &'static str {
        match self {
            DiscRegion::NtscJ => "NTSC-J",
            DiscRegion::NtscU => "NTSC-U",
            DiscRegion::Pal => "PAL",
            DiscRegion::NtscK => "NTSC-K",
            DiscRegion::Unknown => "Unknown",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    #[default]
    GameCubeDisc = 0,
    WiiDisc = 1,
    WiiWad = 2,
    ElfOrDol = 3,
}

/// Whether a client found the selected game locally.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerGameStatus {
    #[default]
    Unknown = 0,
    Ok = 1,
    NotFound = 2,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuCore {
    Interpreter = 0,
    #[default]
    Jit64 = 1,
    JitArm64 = 4,
    CachedInterpreter = 5,
}

/// Emulation settings every participant must share bit-for-bit.
///
/// Captured once per start attempt and broadcast inside [`StartGame`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NetSettings {
    // CPU
    pub cpu_thread: bool,
    pub cpu_core: CpuCore,
    pub enable_cheats: bool,
    pub oc_enable: bool,
    pub oc_factor: f32,
    pub vi_oc_enable: bool,
    pub vi_oc_factor: f32,
    pub mmu: bool,
    pub fastmem: bool,
    pub fprf: bool,
    pub accurate_nans: bool,
    pub float_exceptions: bool,
    pub divide_by_zero_exceptions: bool,
    pub disable_icache: bool,
    pub sync_on_skip_idle: bool,
    pub sync_gpu: bool,
    pub sync_gpu_max_distance: i32,
    pub sync_gpu_min_distance: i32,
    pub sync_gpu_overclock: f32,
    pub jit_follow_branch: bool,
    pub fast_disc_speed: bool,

    // Memory
    pub ram_override_enable: bool,
    pub mem1_size: u32,
    pub mem2_size: u32,

    // System
    pub selected_language: i32,
    pub override_region_settings: bool,
    pub fallback_region: DiscRegion,
    pub dsp_hle: bool,
    pub dsp_enable_jit: bool,
    pub allow_sd_writes: bool,
    pub wii_language: u32,
    pub wii_screensaver: bool,
    pub wii_aspect_ratio_wide: bool,
    pub exi_devices: [u8; 3],

    // Graphics hacks that affect determinism
    pub efb_access_enable: bool,
    pub bbox_enable: bool,
    pub force_progressive: bool,
    pub efb_to_texture_enable: bool,
    pub xfb_to_texture_enable: bool,
    pub disable_copy_to_vram: bool,
    pub immediate_xfb_enable: bool,
    pub efb_emulate_format_changes: bool,
    pub safe_texture_cache_color_samples: i32,
    pub perf_queries_enable: bool,
    pub vertex_rounding: bool,
    pub internal_resolution: u32,
    pub efb_scaled_copy: bool,
    pub fast_depth_calc: bool,
    pub enable_pixel_lighting: bool,
    pub widescreen_hack: bool,

    // Boot
    pub skip_ipl: bool,
    pub load_ipl_dump: bool,
    pub use_fma: bool,

    // Session policy
    pub savedata_load: bool,
    pub savedata_write: bool,
    pub savedata_sync_all_wii: bool,
    pub strict_settings_sync: bool,
    pub sync_codes: bool,
    pub golf_mode: bool,
    pub hide_remote_gbas: bool,
    pub save_data_region: String,
}

impl Default for NetSettings {
    fn default() -> Self {
        Self {
            cpu_thread: true,
            cpu_core: CpuCore::default(),
            enable_cheats: false,
            oc_enable: false,
            oc_factor: 1.0,
            vi_oc_enable: false,
            vi_oc_factor: 1.0,
            mmu: false,
            fastmem: true,
            fprf: false,
            accurate_nans: false,
            float_exceptions: false,
            divide_by_zero_exceptions: false,
            disable_icache: false,
            sync_on_skip_idle: true,
            sync_gpu: false,
            sync_gpu_max_distance: 200_000,
            sync_gpu_min_distance: -200_000,
            sync_gpu_overclock: 1.0,
            jit_follow_branch: true,
            fast_disc_speed: false,
            ram_override_enable: false,
            mem1_size: 0x0180_0000,
            mem2_size: 0x0400_0000,
            selected_language: 0,
            override_region_settings: false,
            fallback_region: DiscRegion::NtscJ,
            dsp_hle: true,
            dsp_enable_jit: true,
            allow_sd_writes: false,
            wii_language: 1,
            wii_screensaver: false,
            wii_aspect_ratio_wide: true,
            exi_devices: [0, 0, 0],
            efb_access_enable: true,
            bbox_enable: false,
            force_progressive: false,
            efb_to_texture_enable: true,
            xfb_to_texture_enable: true,
            disable_copy_to_vram: false,
            immediate_xfb_enable: false,
            efb_emulate_format_changes: false,
            safe_texture_cache_color_samples: 128,
            perf_queries_enable: false,
            vertex_rounding: false,
            internal_resolution: 1,
            efb_scaled_copy: true,
            fast_depth_calc: true,
            enable_pixel_lighting: false,
            widescreen_hack: false,
            skip_ipl: true,
            load_ipl_dump: false,
            use_fma: false,
            savedata_load: true,
            savedata_write: true,
            savedata_sync_all_wii: false,
            strict_settings_sync: false,
            sync_codes: true,
            golf_mode: false,
            hide_remote_gbas: false,
            save_data_region: "USA".to_string(),
        }
    }
}

/// Select a game for the session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChangeGame {
    pub sync_identifier: SyncIdentifier,
    pub netplay_name: String,
}

/// Ask the server to select the catalog entry with this code and hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestChangeGame {
    pub game_id: String,
    pub sync_hash: [u8; SYNC_HASH_LEN],
}

/// Like [`RequestChangeGame`], but carries enough metadata to register the
/// game in the catalog when it is not known yet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestChangeGameFull {
    pub sync_identifier: SyncIdentifier,
    pub netplay_name: String,
    pub region: DiscRegion,
    pub platform: Platform,
    pub has_wii_data: bool,
    pub tmd: Option<Vec<u8>>,
    pub ticket: Option<Vec<u8>>,
    pub cert: Option<Vec<u8>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChangeGameNotFound {
    pub game_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStatus {
    pub pid: PlayerId,
    pub status: PlayerGameStatus,
}

/// Everything a client needs to boot the session in lockstep.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StartGame {
    /// Fresh per-start token; input from older starts is ignored.
    pub game_token: u32,
    pub settings: NetSettings,
    pub initial_rtc: u64,
    pub region: String,
    pub sram: Vec<u8>,
}

/// Client reports it booted the game started with `game_token`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartGameAck {
    pub game_token: u32,
}

/// Client asks the host to begin the start sequence.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestStartGame;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopGame;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisableGame;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerButton;

/// Client reports whether it loaded the session's initial state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInitialStateAck {
    pub has_initial_state: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseSimulation;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeSimulation;

/// Running simulation checksum for `frame`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub value: u64,
    pub frame: u64,
}

/// `pid == 0` when the divergence has no unique outlier.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesyncDetected {
    pub pid: PlayerId,
    pub frame: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ComputeGameDigest {
    pub sync_identifier: SyncIdentifier,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameDigestProgress {
    pub pid: PlayerId,
    pub progress: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameDigestResult {
    pub pid: PlayerId,
    pub result: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GameDigestError {
    pub pid: PlayerId,
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameDigestAbort;

define_messages! {
    ChangeGame => ChangeGame,
    RequestChangeGame => RequestChangeGame,
    RequestChangeGameFull => RequestChangeGameFull,
    ChangeGameNotFound => ChangeGameNotFound,
    GameStatus => GameStatus,
    StartGame => StartGame,
    StartGameAck => StartGameAck,
    RequestStartGame => RequestStartGame,
    StopGame => StopGame,
    DisableGame => DisableGame,
    PowerButton => PowerButton,
    ClientInitialStateAck => ClientInitialStateAck,
    PauseSimulation => PauseSimulation,
    ResumeSimulation => ResumeSimulation,
    TimeBase => TimeBase,
    DesyncDetected => DesyncDetected,
    ComputeGameDigest => ComputeGameDigest,
    GameDigestProgress => GameDigestProgress,
    GameDigestResult => GameDigestResult,
    GameDigestError => GameDigestError,
    GameDigestAbort => GameDigestAbort,
}
