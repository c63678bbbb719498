use crate::codec::decode_message;
use crate::error::ProtoError;
use crate::header::Header;
use crate::messages::Message;
use crate::msg_id::MsgId;

/// A decoded frame borrowing its payload from the receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'a> {
    pub header: Header,
    pub msg_id: MsgId,
    pub payload: &'a [u8],
}

impl<'a> PacketView<'a> {
    pub fn new(header: Header, msg_id: MsgId, payload: &'a [u8]) -> Self {
        Self {
            header,
            msg_id,
            payload,
        }
    }

    /// Decode the payload as `T`, which must be the message this frame carries.
    pub fn decode<T: Message>(&self) -> Result<T, ProtoError> {
        if self.msg_id != T::msg_id() {
            return Err(ProtoError::WrongMessage {
                expected: T::msg_id(),
                actual: self.msg_id,
            });
        }
        decode_message(self.payload)
    }
}
