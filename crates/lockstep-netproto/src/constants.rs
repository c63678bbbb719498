use crate::PlayerId;

/// Magic bytes at the beginning of every packet.
/// Used to quickly reject unrelated or corrupted data.
pub const MAGIC: [u8; 2] = *b"LS";

/// Wire-format version.
/// Bump this only for breaking changes to the header layout or message formats.
pub const VERSION: u8 = 1;

/// Fixed header length in bytes (wire format).
pub const HEADER_LEN: usize = 10;

/// TCP framing prefix length in bytes.
///
/// TCP is a byte stream, so each packet is framed as:
/// `[u32 frame_len_le][Header][Payload]`,
/// where `frame_len_le` is the length of `[Header][Payload]` in bytes.
pub const TCP_LEN_PREFIX: usize = 4;

/// Version string exchanged in the connection handshake. Peers must match exactly.
pub const PROTOCOL_VERSION: &str = concat!("lockstep-", env!("CARGO_PKG_VERSION"));

/// Identity reserved for the hosting participant.
pub const HOST_PLAYER_ID: PlayerId = 1;

/// Maximum number of simultaneously connected identities.
pub const MAX_PLAYERS: usize = 255;

/// Display name budget, in Unicode code points.
pub const MAX_NAME_LENGTH: usize = 30;

/// Number of virtual controller ports per mapping table.
pub const MAX_PAD_SLOTS: usize = 4;

/// Upper bound for a serialized motion-controller state.
pub const MAX_WIIMOTE_STATE_LEN: usize = 24;

/// Size of the content hash carried by a `SyncIdentifier`.
pub const SYNC_HASH_LEN: usize = 20;

/// Payload bytes per `ChunkedDataPayload` message.
pub const CHUNKED_DATA_UNIT_SIZE: usize = 16 * 1024;

/// Consecutive mismatched input frames relayed while a mapping change settles.
pub const PAD_MAPPING_GRACE_FRAMES: u32 = 22;

/// Default input buffering depth, in frames.
pub const DEFAULT_PAD_BUFFER_SIZE: u32 = 5;
