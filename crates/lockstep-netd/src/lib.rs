//! Lockstep netplay session server.
//!
//! The network layer turns sockets into [`InboundEvent`]s; [`run_server`]
//! owns the session loop that performs handshakes, dispatches messages,
//! delivers the async queue and drives the ping cadence.

use std::collections::HashMap;
use std::sync::Arc;

use lockstep_netproto::codec::decode_message;
use lockstep_netproto::messages::session::{ConnectionRejected, Hello};
use lockstep_netproto::msg_id::MsgId;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::net::framing::PacketOwned;
use crate::net::inbound::{ConnId, InboundEvent};
use crate::session::registry::PendingPeer;
use crate::session::{Session, SessionRuntime};

pub mod async_queue;
pub mod catalog;
pub mod chunked;
pub mod config;
pub mod idle;
pub mod net;
pub mod proto_dispatch;
pub mod services;
pub mod session;
pub mod sync;

/// Run the session loop until `shutdown` fires or the network layer goes away.
///
/// Spawns the chunk worker and, when configured, the idle supervisor on the
/// session's task tracker; both are joined before this returns.
pub async fn run_server(
    session: Arc<Session>,
    mut runtime: SessionRuntime,
    mut rx: mpsc::Receiver<InboundEvent>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let worker = session.clone();
    session.tasks.spawn(async move {
        worker
            .chunks
            .run(&*worker, &worker.queue, &worker.shutdown)
            .await;
    });
    if let Some(idle_config) = session.config().idle.clone() {
        session.tasks.spawn(idle::run(
            session.clone(),
            idle_config,
            session.shutdown.clone(),
        ));
    }

    let mut pending: HashMap<ConnId, PendingPeer> = HashMap::new();
    let mut ping_timer = tokio::time::interval(session.config().ping_interval);
    ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(server_name = %session.config().server_name, "Session loop started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            ev = rx.recv() => {
                let Some(ev) = ev else {
                    break;
                };
                match ev {
                    InboundEvent::Connected(link) => {
                        debug!(conn_id = link.conn_id, addr = %link.addr, "Awaiting handshake");
                        pending.insert(
                            link.conn_id,
                            PendingPeer {
                                addr: link.addr,
                                outbound: link.outbound,
                                cancel_token: link.close,
                            },
                        );
                    }
                    InboundEvent::Packet { conn_id, packet } => {
                        handle_packet(&session, &mut pending, conn_id, packet);
                    }
                    InboundEvent::Disconnected { conn_id, reason } => {
                        if let Some(peer) = pending.remove(&conn_id) {
                            debug!(conn_id, addr = %peer.addr, %reason, "Connection closed before handshake");
                            continue;
                        }
                        let pid = session.registry.read().pid_for(conn_id);
                        if let Some(pid) = pid {
                            session.disconnect(pid, &reason.to_string());
                        }
                    }
                }
            }
            Some(item) = runtime.queue_rx.recv() => session.deliver(item),
            _ = ping_timer.tick() => session.send_pings(),
        }
    }

    info!("Session loop stopping");
    session.shutdown().await;
    Ok(())
}

fn handle_packet(
    session: &Session,
    pending: &mut HashMap<ConnId, PendingPeer>,
    conn_id: ConnId,
    packet: PacketOwned,
) {
    let pid = session.registry.read().pid_for(conn_id);
    if let Some(pid) = pid {
        if let Err(e) = session.dispatch(pid, &packet) {
            warn!(pid, msg_id = ?packet.msg_id, error = %e, "Protocol violation; disconnecting");
            session.disconnect(pid, "protocol violation");
        }
        return;
    }

    let Some(peer) = pending.remove(&conn_id) else {
        return;
    };
    if packet.msg_id != MsgId::Hello {
        warn!(conn_id, addr = %peer.addr, msg_id = ?packet.msg_id, "Expected Hello; dropping connection");
        peer.cancel_token.cancel();
        return;
    }
    let hello: Hello = match decode_message(&packet.payload) {
        Ok(hello) => hello,
        Err(e) => {
            warn!(conn_id, addr = %peer.addr, error = %e, "Malformed Hello; dropping connection");
            peer.cancel_token.cancel();
            return;
        }
    };

    let outbound = peer.outbound.clone();
    let cancel_token = peer.cancel_token.clone();
    let addr = peer.addr;
    match session.connect(conn_id, peer, hello) {
        Ok(_) => session.send_pings(),
        Err(error) => {
            info!(conn_id, %addr, ?error, "Handshake refused");
            if let Err(e) = outbound.send(&ConnectionRejected { error }) {
                warn!(conn_id, error = %e, "Failed to encode rejection");
            }
            cancel_token.cancel();
        }
    }
}
