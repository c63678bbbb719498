use crate::{
    constants::{HEADER_LEN, TCP_LEN_PREFIX},
    error::ProtoError,
    header::Header,
    limits::{MAX_TCP_FRAME, max_payload_for},
    messages::Message,
    msg_id::MsgId,
    packet::PacketView,
};

/// Encode `payload` as a length-prefixed TCP frame, enforcing the per-message
/// payload limit from [`max_payload_for`].
pub fn encode_message<T: Message>(payload: &T) -> Result<Vec<u8>, ProtoError> {
    let msg_id = T::msg_id();
    let max_payload = max_payload_for(msg_id);

    let payload_bytes = postcard::to_stdvec(payload)?;
    if payload_bytes.len() > max_payload {
        return Err(ProtoError::PayloadTooLarge(payload_bytes.len()));
    }

    let header = Header::for_payload(msg_id, payload_bytes.len())?;
    let frame_len = HEADER_LEN + payload_bytes.len();
    if frame_len > MAX_TCP_FRAME {
        return Err(ProtoError::FrameTooLarge(frame_len));
    }

    let mut out = Vec::with_capacity(TCP_LEN_PREFIX + frame_len);
    out.extend_from_slice(&(frame_len as u32).to_le_bytes());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&payload_bytes);
    Ok(out)
}

/// Decode a payload into its typed message. The whole payload must be consumed.
pub fn decode_message<T: Message>(payload: &[u8]) -> Result<T, ProtoError> {
    let (msg, rest) = postcard::take_from_bytes::<T>(payload)?;
    if !rest.is_empty() {
        return Err(ProtoError::TrailingBytes(rest.len()));
    }
    Ok(msg)
}

/// Decode the first frame in `buf`, returning it with the number of bytes it
/// spans (length prefix included). `Ok(None)` means more bytes are needed.
pub fn decode_tcp_frame(buf: &[u8]) -> Result<Option<(PacketView<'_>, usize)>, ProtoError> {
    let Some((prefix, rest)) = buf.split_first_chunk::<TCP_LEN_PREFIX>() else {
        return Ok(None);
    };
    let frame_len = u32::from_le_bytes(*prefix) as usize;
    if frame_len < HEADER_LEN {
        return Err(ProtoError::LengthMismatch);
    }
    if frame_len > MAX_TCP_FRAME {
        return Err(ProtoError::FrameTooLarge(frame_len));
    }
    let Some(frame) = rest.get(..frame_len) else {
        return Ok(None);
    };

    let (header, payload) = Header::split(frame)?;
    let msg_id = MsgId::from_repr(header.msg_id).ok_or(ProtoError::UnknownMsgId(header.msg_id))?;
    if payload.len() > max_payload_for(msg_id) {
        return Err(ProtoError::PayloadTooLarge(payload.len()));
    }
    Ok(Some((
        PacketView::new(header, msg_id, payload),
        TCP_LEN_PREFIX + frame_len,
    )))
}

/// Decode every complete frame in `buf`. Returns the packets and the bytes
/// consumed; a trailing partial frame is left for the caller.
pub fn try_decode_tcp_frames(buf: &[u8]) -> Result<(Vec<PacketView<'_>>, usize), ProtoError> {
    let mut frames = Vec::new();
    let mut consumed = 0;
    while let Some((view, used)) = decode_tcp_frame(&buf[consumed..])? {
        frames.push(view);
        consumed += used;
    }
    Ok((frames, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;
    use crate::messages::chunked::ChunkedDataPayload;
    use crate::messages::session::{Ping, PlayerLeave};

    #[test]
    fn frames_split_across_reads_are_reassembled() {
        let mut stream = encode_message(&PlayerLeave { pid: 3 }).unwrap();
        stream.extend(encode_message(&Ping { key: 77 }).unwrap());

        let cut = stream.len() - 2;
        let (frames, consumed) = try_decode_tcp_frames(&stream[..cut]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_id, MsgId::PlayerLeave);

        let (rest, _) = try_decode_tcp_frames(&stream[consumed..]).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].msg_id, MsgId::Ping);
        assert_eq!(rest[0].header.channel, ChannelKind::Unreliable);
        let ping: Ping = decode_message(rest[0].payload).unwrap();
        assert_eq!(ping.key, 77);
    }

    #[test]
    fn single_frame_decode_waits_for_the_whole_frame() {
        let frame = encode_message(&Ping { key: 5 }).unwrap();
        assert!(decode_tcp_frame(&frame[..frame.len() - 1]).unwrap().is_none());
        assert!(decode_tcp_frame(&frame[..2]).unwrap().is_none());

        let (view, used) = decode_tcp_frame(&frame).unwrap().unwrap();
        assert_eq!(used, frame.len());
        assert_eq!(view.msg_id, MsgId::Ping);
    }

    #[test]
    fn undersized_length_prefix_is_rejected() {
        let bytes = 3u32.to_le_bytes();
        assert!(matches!(
            decode_tcp_frame(&bytes),
            Err(ProtoError::LengthMismatch)
        ));
    }

    #[test]
    fn unknown_msg_id_is_rejected() {
        let mut frame = encode_message(&PlayerLeave { pid: 1 }).unwrap();
        frame[TCP_LEN_PREFIX + 3] = 0xFF;
        assert!(matches!(
            try_decode_tcp_frames(&frame),
            Err(ProtoError::UnknownMsgId(0xFF))
        ));
    }

    #[test]
    fn oversized_control_payload_is_rejected() {
        let msg = crate::messages::session::ChatMessage {
            author: 0,
            text: "x".repeat(crate::limits::MAX_CONTROL_PAYLOAD + 1),
        };
        assert!(matches!(
            encode_message(&msg),
            Err(ProtoError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn trailing_bytes_fail_typed_decode() {
        let mut payload = postcard::to_stdvec(&PlayerLeave { pid: 2 }).unwrap();
        payload.push(0);
        assert!(matches!(
            decode_message::<PlayerLeave>(&payload),
            Err(ProtoError::TrailingBytes(1))
        ));
    }

    #[test]
    fn chunk_payload_rides_the_bulk_channel() {
        let frame = encode_message(&ChunkedDataPayload {
            id: 1,
            data: vec![0xAB; 32],
        })
        .unwrap();
        let (frames, _) = try_decode_tcp_frames(&frame).unwrap();
        assert_eq!(frames[0].header.channel, ChannelKind::Bulk);
    }
}
