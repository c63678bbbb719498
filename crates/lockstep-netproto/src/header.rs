//! Fixed 10-byte frame header.
//!
//! ```text
//! 0..2   magic "LS"
//! 2      wire version
//! 3      msg id
//! 4      channel tag
//! 5      zero
//! 6..10  payload length, u32 LE
//! ```

use crate::channel::{ChannelKind, channel_for_msg};
use crate::constants::{HEADER_LEN, MAGIC, VERSION};
use crate::error::ProtoError;
use crate::msg_id::MsgId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    /// Raw id; frame decoding maps it onto [`MsgId`].
    pub msg_id: u8,
    pub channel: ChannelKind,
    pub payload_len: u32,
}

impl Header {
    pub const LEN: usize = HEADER_LEN;

    /// Header for a `payload_len`-byte payload of `msg_id`, tagged with its
    /// preferred channel.
    pub fn for_payload(msg_id: MsgId, payload_len: usize) -> Result<Self, ProtoError> {
        let payload_len =
            u32::try_from(payload_len).map_err(|_| ProtoError::PayloadTooLarge(payload_len))?;
        Ok(Self {
            version: VERSION,
            msg_id: msg_id as u8,
            channel: channel_for_msg(msg_id),
            payload_len,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..2].copy_from_slice(&MAGIC);
        out[2] = self.version;
        out[3] = self.msg_id;
        out[4] = self.channel as u8;
        out[6..].copy_from_slice(&self.payload_len.to_le_bytes());
        out
    }

    /// Split a `[Header][Payload]` frame. The declared payload length must
    /// account for every remaining byte.
    pub fn split(frame: &[u8]) -> Result<(Self, &[u8]), ProtoError> {
        let (head, payload) = frame
            .split_first_chunk::<HEADER_LEN>()
            .ok_or(ProtoError::TooShort)?;

        let [m0, m1, version, msg_id, channel, _, l0, l1, l2, l3] = *head;
        if [m0, m1] != MAGIC {
            return Err(ProtoError::BadMagic);
        }
        if version != VERSION {
            return Err(ProtoError::UnsupportedVersion(version));
        }
        let channel = ChannelKind::from_repr(channel).ok_or(ProtoError::UnknownChannel(channel))?;
        let payload_len = u32::from_le_bytes([l0, l1, l2, l3]);
        if payload.len() != payload_len as usize {
            return Err(ProtoError::LengthMismatch);
        }

        Ok((
            Self {
                version,
                msg_id,
                channel,
                payload_len,
            },
            payload,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(msg_id: MsgId, payload: &[u8]) -> Vec<u8> {
        let mut out = Header::for_payload(msg_id, payload.len())
            .unwrap()
            .to_bytes()
            .to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn wire_layout() {
        let bytes = Header::for_payload(MsgId::PadData, 0x0102).unwrap().to_bytes();
        assert_eq!(
            bytes,
            [
                b'L',
                b'S',
                VERSION,
                MsgId::PadData as u8,
                ChannelKind::Input as u8,
                0,
                0x02,
                0x01,
                0,
                0
            ]
        );
    }

    #[test]
    fn split_returns_the_payload() {
        let f = frame(MsgId::ChatMessage, b"abc");
        let (h, payload) = Header::split(&f).unwrap();
        assert_eq!(h.msg_id, MsgId::ChatMessage as u8);
        assert_eq!(h.channel, ChannelKind::Control);
        assert_eq!(payload, b"abc");
    }

    #[test]
    fn split_rejects_malformed_frames() {
        let good = frame(MsgId::Ping, &[7, 7]);

        assert!(matches!(
            Header::split(&good[..HEADER_LEN - 1]),
            Err(ProtoError::TooShort)
        ));
        assert!(matches!(
            Header::split(&good[..good.len() - 1]),
            Err(ProtoError::LengthMismatch)
        ));

        let mut extra = good.clone();
        extra.push(0);
        assert!(matches!(
            Header::split(&extra),
            Err(ProtoError::LengthMismatch)
        ));

        let mut magic = good.clone();
        magic[1] = b'X';
        assert!(matches!(Header::split(&magic), Err(ProtoError::BadMagic)));

        let mut version = good.clone();
        version[2] = VERSION + 1;
        assert!(matches!(
            Header::split(&version),
            Err(ProtoError::UnsupportedVersion(v)) if v == VERSION + 1
        ));

        let mut channel = good;
        channel[4] = 9;
        assert!(matches!(
            Header::split(&channel),
            Err(ProtoError::UnknownChannel(9))
        ));
    }
}
