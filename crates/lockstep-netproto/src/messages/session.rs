use serde::{Deserialize, Serialize};

use crate::PlayerId;
use crate::messages::define_messages;

/// First message on a new connection.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Hello {
    /// Must equal the server's `PROTOCOL_VERSION`.
    pub netplay_version: String,
    pub revision: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSuccessful {
    pub pid: PlayerId,
}

/// Reasons a handshake is refused. The peer is never registered.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    VersionMismatch = 1,
    GameRunning = 2,
    ServerFull = 3,
    NameTooLong = 4,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRejected {
    pub error: ConnectionError,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerJoin {
    pub pid: PlayerId,
    pub name: String,
    pub revision: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLeave {
    pub pid: PlayerId,
}

/// Chat line. `author` is filled in by the server; `0` is the server itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: PlayerId,
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCapabilities {
    pub has_ipl_dump: bool,
    pub has_hardware_fma: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub key: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub key: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerPingData {
    pub pid: PlayerId,
    pub ping_ms: u32,
}

define_messages! {
    Hello => Hello,
    ConnectionSuccessful => ConnectionSuccessful,
    ConnectionRejected => ConnectionRejected,
    PlayerJoin => PlayerJoin,
    PlayerLeave => PlayerLeave,
    ChatMessage => ChatMessage,
    ClientCapabilities => ClientCapabilities,
    Ping => Ping,
    Pong => Pong,
    PlayerPingData => PlayerPingData,
}
