//! Payload size limits, enforced on both encode and decode.

use crate::constants::HEADER_LEN;
use crate::msg_id::MsgId;

pub const MAX_CONTROL_PAYLOAD: usize = 4 * 1024;
pub const MAX_DATA_PAYLOAD: usize = 2 * 1024 * 1024;
/// Save uploads arrive as one frame rather than a chunked transfer.
pub const MAX_SYNC_PAYLOAD: usize = 32 * 1024 * 1024;

pub const MAX_TCP_FRAME: usize = HEADER_LEN + MAX_SYNC_PAYLOAD;

/// Bytes a connection may buffer while waiting for a frame to complete.
pub const TCP_RX_BUFFER_SIZE: usize = MAX_TCP_FRAME + 64 * 1024;

/// Size class of a message's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadClass {
    /// Handshake, roster, input relay, pings and other small messages.
    Control,
    /// Chunk units, game start and catalog registrations with content blobs.
    Data,
    /// Save and code synchronization.
    Sync,
}

impl PayloadClass {
    pub const fn of(msg_id: MsgId) -> Self {
        match msg_id {
            MsgId::SyncSaveData | MsgId::SyncCodes => Self::Sync,
            MsgId::ChunkedDataPayload
            | MsgId::StartGame
            | MsgId::RequestChangeGameFull
            | MsgId::GameDigestResult => Self::Data,
            _ => Self::Control,
        }
    }

    pub const fn limit(self) -> usize {
        match self {
            Self::Control => MAX_CONTROL_PAYLOAD,
            Self::Data => MAX_DATA_PAYLOAD,
            Self::Sync => MAX_SYNC_PAYLOAD,
        }
    }
}

#[inline]
pub const fn max_payload_for(msg_id: MsgId) -> usize {
    PayloadClass::of(msg_id).limit()
}
