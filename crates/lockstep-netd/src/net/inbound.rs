use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use super::framing::PacketOwned;
use super::outbound::PeerOutbound;

/// Transport-level connection identity, never reused within a process.
pub type ConnId = u64;

pub fn allocate_conn_id() -> ConnId {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// What the session needs to talk to, and forcibly close, a new connection.
#[derive(Debug)]
pub struct PeerLink {
    pub conn_id: ConnId,
    pub addr: SocketAddr,
    pub outbound: PeerOutbound,
    pub close: CancellationToken,
}

/// Why a connection's reader stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    Eof,
    Timeout,
    Closed,
    Io(String),
    Protocol(String),
    SessionGone,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => f.write_str("connection closed by peer"),
            Self::Timeout => f.write_str("peer timed out"),
            Self::Closed => f.write_str("closed by server"),
            Self::Io(e) => write!(f, "read error: {e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::SessionGone => f.write_str("session stopped"),
        }
    }
}

/// Per-connection events, delivered to the session loop in order.
#[derive(Debug)]
pub enum InboundEvent {
    Connected(PeerLink),
    Packet {
        conn_id: ConnId,
        packet: PacketOwned,
    },
    Disconnected {
        conn_id: ConnId,
        reason: DisconnectReason,
    },
}
