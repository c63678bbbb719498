use bytes::{Bytes, BytesMut};
use lockstep_netproto::codec::decode_tcp_frame;
use lockstep_netproto::error::ProtoError;
use lockstep_netproto::header::Header;
use lockstep_netproto::limits::TCP_RX_BUFFER_SIZE;
use lockstep_netproto::msg_id::MsgId;
use tokio_util::codec::Decoder;

/// A decoded packet owning its payload.
#[derive(Debug, Clone)]
pub struct PacketOwned {
    pub header: Header,
    pub msg_id: MsgId,
    pub payload: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Proto(#[from] ProtoError),
    #[error("{0} buffered bytes without a complete frame")]
    Overflow(usize),
}

/// Splits a TCP byte stream into packets.
///
/// Each packet's payload is a slice of the frame it arrived in, so no copy is
/// made past the socket read.
#[derive(Debug, Default)]
pub struct PacketDecoder;

impl Decoder for PacketDecoder {
    type Item = PacketOwned;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<PacketOwned>, FrameError> {
        let Some((view, used)) = decode_tcp_frame(src)? else {
            if src.len() > TCP_RX_BUFFER_SIZE {
                return Err(FrameError::Overflow(src.len()));
            }
            return Ok(None);
        };
        let (header, msg_id, payload_len) = (view.header, view.msg_id, view.payload.len());

        let frame = src.split_to(used).freeze();
        Ok(Some(PacketOwned {
            header,
            msg_id,
            payload: frame.slice(used - payload_len..),
        }))
    }
}

#[cfg(test)]
mod tests {
    use lockstep_netproto::codec::{decode_message, encode_message};
    use lockstep_netproto::messages::session::{Ping, PlayerLeave};

    use super::*;

    #[test]
    fn decodes_back_to_back_frames() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encode_message(&Ping { key: 123 }).unwrap());
        buf.extend_from_slice(&encode_message(&PlayerLeave { pid: 4 }).unwrap());

        let mut dec = PacketDecoder;
        let first = dec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.msg_id, MsgId::Ping);
        assert_eq!(decode_message::<Ping>(&first.payload).unwrap().key, 123);

        let second = dec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decode_message::<PlayerLeave>(&second.payload).unwrap().pid, 4);
        assert!(buf.is_empty());
        assert!(dec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn partial_frame_stays_buffered() {
        let bytes = encode_message(&Ping { key: 9 }).unwrap();
        let mut buf = BytesMut::from(&bytes[..5]);
        let mut dec = PacketDecoder;

        assert!(dec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 5);

        buf.extend_from_slice(&bytes[5..]);
        assert!(dec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        let mut buf = BytesMut::from(&[0xFFu8; 16][..]);
        assert!(matches!(
            PacketDecoder.decode(&mut buf),
            Err(FrameError::Proto(ProtoError::FrameTooLarge(_)))
        ));
    }
}
