use serde::{Deserialize, Serialize};

use crate::PlayerId;
use crate::constants::{MAX_PAD_SLOTS, SYNC_HASH_LEN};
use crate::messages::define_messages;

/// Slot -> owner table for standard pads or motion controllers. `0` = unmapped.
pub type PadMappingArray = [PlayerId; MAX_PAD_SLOTS];

/// Per-slot handheld (GBA) configuration, parallel to the pad table.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GbaSlotConfig {
    pub enabled: bool,
    pub has_rom: bool,
    pub title: String,
    pub hash: [u8; SYNC_HASH_LEN],
}

pub type GbaConfigArray = [GbaSlotConfig; MAX_PAD_SLOTS];

/// Analog state. Omitted for slots driven by a handheld.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PadAnalog {
    pub analog_a: u8,
    pub analog_b: u8,
    pub stick_x: u8,
    pub stick_y: u8,
    pub substick_x: u8,
    pub substick_y: u8,
    pub trigger_left: u8,
    pub trigger_right: u8,
    pub is_connected: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadEntry {
    pub slot: u8,
    pub button: u16,
    pub analog: Option<PadAnalog>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PadData {
    pub entries: Vec<PadEntry>,
}

/// Input from the host-authority golfer, or relayed to it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PadHostData {
    pub entries: Vec<PadEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WiimoteData {
    pub slot: u8,
    pub data: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadMapping {
    pub pads: PadMappingArray,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GbaConfig {
    pub slots: GbaConfigArray,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WiimoteMapping {
    pub wiimotes: PadMappingArray,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestPadMappingChange {
    pub pads: PadMappingArray,
    pub gba: GbaConfigArray,
    pub wiimotes: PadMappingArray,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadBuffer {
    pub size: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestBufferChange {
    pub size: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInputAuthority {
    pub enabled: bool,
}

/// Ask for input authority to be handed to `pid`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolfRequest {
    pub pid: PlayerId,
}

/// Announce the new golfer (`0` while a hand-over is in progress).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolfSwitch {
    pub pid: PlayerId,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolfAcquire;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolfRelease;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolfPrepare;

define_messages! {
    PadData => PadData,
    PadHostData => PadHostData,
    WiimoteData => WiimoteData,
    PadMapping => PadMapping,
    GbaConfig => GbaConfig,
    WiimoteMapping => WiimoteMapping,
    RequestPadMappingChange => RequestPadMappingChange,
    PadBuffer => PadBuffer,
    RequestBufferChange => RequestBufferChange,
    HostInputAuthority => HostInputAuthority,
    GolfRequest => GolfRequest,
    GolfSwitch => GolfSwitch,
    GolfAcquire => GolfAcquire,
    GolfRelease => GolfRelease,
    GolfPrepare => GolfPrepare,
}
