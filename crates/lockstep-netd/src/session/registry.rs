use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;

use bytes::Bytes;
use lockstep_netproto::PlayerId;
use lockstep_netproto::channel::{ChannelKind, channel_for_msg};
use lockstep_netproto::codec::encode_message;
use lockstep_netproto::constants::MAX_PLAYERS;
use lockstep_netproto::messages::Message;
use lockstep_netproto::messages::game::PlayerGameStatus;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use super::mapping::MappingTables;
use super::readiness::Readiness;
use crate::async_queue::Target;
use crate::net::inbound::ConnId;
use crate::net::outbound::PeerOutbound;

/// One registered participant.
#[derive(Debug)]
pub struct Client {
    pub pid: PlayerId,
    pub conn_id: ConnId,
    pub addr: SocketAddr,
    pub outbound: PeerOutbound,
    pub cancel_token: CancellationToken,
    pub name: String,
    pub revision: String,
    pub ping_ms: u32,
    /// Token of the last game this client booted.
    pub current_game: u32,
    pub has_ipl_dump: bool,
    pub has_hardware_fma: bool,
    pub game_status: PlayerGameStatus,
    /// Idle supervisor sweeps since this client last made progress.
    pub idle_ticks: u32,
}

/// A connection that has not completed the handshake yet.
#[derive(Debug)]
pub struct PendingPeer {
    pub addr: SocketAddr,
    pub outbound: PeerOutbound,
    pub cancel_token: CancellationToken,
}

/// Connected participants plus the state that must change atomically with
/// membership (mapping tables, readiness).
#[derive(Debug, Default)]
pub struct Registry {
    clients: BTreeMap<PlayerId, Client>,
    by_conn: HashMap<ConnId, PlayerId>,
    pub mappings: MappingTables,
    pub readiness: Readiness,
}

impl Registry {
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= MAX_PLAYERS
    }

    pub fn contains(&self, pid: PlayerId) -> bool {
        self.clients.contains_key(&pid)
    }

    pub fn get(&self, pid: PlayerId) -> Option<&Client> {
        self.clients.get(&pid)
    }

    pub fn get_mut(&mut self, pid: PlayerId) -> Option<&mut Client> {
        self.clients.get_mut(&pid)
    }

    pub fn pid_for(&self, conn_id: ConnId) -> Option<PlayerId> {
        self.by_conn.get(&conn_id).copied()
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn clients_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.values_mut()
    }

    pub fn pids(&self) -> Vec<PlayerId> {
        self.clients.keys().copied().collect()
    }

    /// Lowest positive identity not held by a connected client.
    pub fn next_free_id(&self) -> Option<PlayerId> {
        (1..=PlayerId::MAX).find(|pid| !self.clients.contains_key(pid))
    }

    pub fn insert(&mut self, client: Client) {
        self.by_conn.insert(client.conn_id, client.pid);
        self.readiness.activate(client.pid);
        self.clients.insert(client.pid, client);
    }

    /// Remove `pid` from the roster and readiness table. Mapping tables are
    /// cleared separately so the caller can broadcast what changed.
    pub fn remove(&mut self, pid: PlayerId) -> Option<Client> {
        let client = self.clients.remove(&pid)?;
        self.by_conn.remove(&client.conn_id);
        self.readiness.deactivate(pid);
        Some(client)
    }

    /// Encode `msg` once and queue it for `pid`.
    pub fn send_to<T: Message>(&self, pid: PlayerId, msg: &T) {
        self.broadcast(msg, Target::Only(pid));
    }

    /// Encode `msg` once and queue it for every client `target` selects.
    pub fn broadcast<T: Message>(&self, msg: &T, target: Target) {
        match encode_message(msg) {
            Ok(frame) => {
                self.send_frame(Bytes::from(frame), channel_for_msg(T::msg_id()), target)
            }
            Err(e) => error!(msg_id = ?T::msg_id(), error = %e, "Failed to encode message"),
        }
    }

    /// Queue an already-encoded frame.
    pub fn send_frame(&self, frame: Bytes, channel: ChannelKind, target: Target) {
        let recipients: Box<dyn Iterator<Item = &Client>> = match target {
            Target::Only(pid) => Box::new(self.clients.get(&pid).into_iter()),
            Target::AllExcept(skip) => Box::new(self.clients.values().filter(move |c| c.pid != skip)),
        };
        for client in recipients {
            if !client.outbound.send_frame(channel, frame.clone()) && channel.is_reliable() {
                trace!(pid = client.pid, "Outbound queue closed");
            }
        }
    }

    /// Broadcast all three mapping tables.
    pub fn broadcast_mappings(&self) {
        self.broadcast(&self.mappings.pad_message(), Target::ALL);
        self.broadcast(&self.mappings.gba_message(), Target::ALL);
        self.broadcast(&self.mappings.wiimote_message(), Target::ALL);
    }
}
