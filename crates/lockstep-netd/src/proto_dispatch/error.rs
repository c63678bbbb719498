//! Handler errors. Each one is a protocol violation: the session loop logs it
//! and disconnects the sender.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("malformed message")]
    BadMessage,
    #[error("message not expected from a client")]
    UnexpectedMessage,
    #[error("permission denied")]
    PermissionDenied,
    #[error("controller slot out of range")]
    InvalidSlot,
    #[error("input from a player without authority")]
    NotGolfer,
    #[error("payload too large")]
    PayloadTooLarge,
}

pub type HandlerResult = Result<(), HandlerError>;
