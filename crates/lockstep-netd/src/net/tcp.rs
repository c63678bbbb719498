use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::framing::{FrameError, PacketDecoder};
use super::inbound::{ConnId, DisconnectReason, InboundEvent, PeerLink, allocate_conn_id};
use super::outbound::{peer_channels, spawn_writer};

const READ_BUFFER: usize = 8 * 1024;

/// Bind `bind` and serve connections until the accept loop fails.
pub async fn run_tcp_listener(
    bind: SocketAddr,
    tx: mpsc::Sender<InboundEvent>,
    peer_timeout: Duration,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    run_tcp_listener_with_listener(listener, tx, peer_timeout).await
}

pub async fn run_tcp_listener_with_listener(
    listener: TcpListener,
    tx: mpsc::Sender<InboundEvent>,
    peer_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        tokio::spawn(serve_connection(
            stream,
            addr,
            allocate_conn_id(),
            tx.clone(),
            peer_timeout,
        ));
    }
}

/// Own one connection: announce it, forward its packets in order, and
/// report why it ended.
async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    conn_id: ConnId,
    tx: mpsc::Sender<InboundEvent>,
    peer_timeout: Duration,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(conn_id, %addr, error = %e, "set_nodelay failed");
    }

    let (read, write) = stream.into_split();
    let mut packets = FramedRead::with_capacity(read, PacketDecoder, READ_BUFFER);
    let (outbound, out_rx) = peer_channels();
    let writer = spawn_writer(FramedWrite::new(write, BytesCodec::new()), out_rx);
    let close = CancellationToken::new();

    let link = PeerLink {
        conn_id,
        addr,
        outbound,
        close: close.clone(),
    };
    if tx.send(InboundEvent::Connected(link)).await.is_err() {
        return;
    }
    debug!(conn_id, %addr, "Connection accepted");

    let reason = loop {
        let next = tokio::select! {
            _ = close.cancelled() => break DisconnectReason::Closed,
            next = tokio::time::timeout(peer_timeout, packets.next()) => next,
        };
        let packet = match next {
            Err(_) => break DisconnectReason::Timeout,
            Ok(None) => break DisconnectReason::Eof,
            Ok(Some(Err(FrameError::Io(e)))) => break DisconnectReason::Io(e.to_string()),
            Ok(Some(Err(e))) => {
                warn!(conn_id, %addr, error = %e, "Undecodable stream; closing connection");
                break DisconnectReason::Protocol(e.to_string());
            }
            Ok(Some(Ok(packet))) => packet,
        };
        if tx
            .send(InboundEvent::Packet { conn_id, packet })
            .await
            .is_err()
        {
            break DisconnectReason::SessionGone;
        }
    };

    debug!(conn_id, %addr, %reason, "Connection ended");
    // Best effort: the session may already be gone.
    let _ = tx
        .send(InboundEvent::Disconnected { conn_id, reason })
        .await;

    // The writer finishes once the session drops its sender as well.
    if let Ok(Err(e)) = writer.await {
        debug!(conn_id, %addr, error = %e, "Writer stopped with error");
    }
}
