use thiserror::Error;

use crate::msg_id::MsgId;

/// Everything that can go wrong turning bytes into messages and back.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("frame does not start with the protocol magic")]
    BadMagic,
    #[error("wire version {0} is not supported")]
    UnsupportedVersion(u8),
    #[error("buffer too short")]
    TooShort,
    #[error("declared length disagrees with the frame")]
    LengthMismatch,
    #[error("{0} unread bytes after the message")]
    TrailingBytes(usize),
    #[error("payload of {0} bytes exceeds the limit for its message")]
    PayloadTooLarge(usize),
    #[error("frame of {0} bytes exceeds the transport limit")]
    FrameTooLarge(usize),
    #[error("unknown channel tag {0}")]
    UnknownChannel(u8),
    #[error("unknown msg id: {0:#04x}")]
    UnknownMsgId(u8),
    #[error("expected {expected:?}, got {actual:?}")]
    WrongMessage { expected: MsgId, actual: MsgId },
    #[error("payload encoding: {0}")]
    Postcard(#[from] postcard::Error),
}
