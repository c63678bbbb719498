pub mod channel;
pub mod codec;
pub mod constants;
pub mod error;
pub mod header;
pub mod limits;
pub mod messages;
pub mod msg_id;
pub mod packet;

/// Session identity of a connected participant. `0` means "nobody" in mapping
/// tables and golf state; `1` is the host by convention.
pub type PlayerId = u8;
