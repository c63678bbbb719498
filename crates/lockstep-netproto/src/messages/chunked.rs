//! Framing for large payloads streamed on the bulk channel.
//!
//! A transfer is `Start`, zero or more `Payload` units, then `End` (or `Abort`).
//! Receivers report `Progress` while reassembling and `Complete` once the
//! payload has been handled.

use serde::{Deserialize, Serialize};

use crate::messages::define_messages;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDataStart {
    pub id: u32,
    pub title: String,
    pub total_len: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDataPayload {
    pub id: u32,
    pub data: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedDataEnd {
    pub id: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedDataAbort {
    pub id: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedDataProgress {
    pub id: u32,
    pub progress: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedDataComplete {
    pub id: u32,
}

define_messages! {
    ChunkedDataStart => ChunkedDataStart,
    ChunkedDataPayload => ChunkedDataPayload,
    ChunkedDataEnd => ChunkedDataEnd,
    ChunkedDataAbort => ChunkedDataAbort,
    ChunkedDataProgress => ChunkedDataProgress,
    ChunkedDataComplete => ChunkedDataComplete,
}
