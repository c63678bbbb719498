//! Shared harness: a real TCP listener on loopback plus a minimal client.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lockstep_netd::config::ServerConfig;
use lockstep_netd::net::tcp::run_tcp_listener_with_listener;
use lockstep_netd::run_server;
use lockstep_netd::services::Services;
use lockstep_netd::session::{Session, SessionHandle};
use lockstep_netproto::PlayerId;
use lockstep_netproto::codec::{decode_message, encode_message, try_decode_tcp_frames};
use lockstep_netproto::constants::PROTOCOL_VERSION;
use lockstep_netproto::messages::Message;
use lockstep_netproto::messages::game::NetSettings;
use lockstep_netproto::messages::session::{ConnectionSuccessful, Hello};
use lockstep_netproto::msg_id::MsgId;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const RECV_TIMEOUT: Duration = Duration::from_secs(3);

pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: SessionHandle,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub async fn spawn_test_server(
    config: ServerConfig,
    settings: NetSettings,
    services: Services,
) -> anyhow::Result<TestServer> {
    let (event_tx, event_rx) = mpsc::channel(1024);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = run_tcp_listener_with_listener(listener, event_tx, Duration::from_secs(10)).await;
    });

    let (session, runtime) = Session::new(config, settings, services);
    let handle = session.handle();
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        let _ = run_server(session, runtime, event_rx, token).await;
    });

    Ok(TestServer {
        addr,
        handle,
        shutdown,
    })
}

/// Settings with both pre-start phases disabled, so a start is immediate.
pub fn quick_start_settings() -> NetSettings {
    NetSettings {
        savedata_load: false,
        sync_codes: false,
        ..NetSettings::default()
    }
}

pub struct TestClient {
    stream: TcpStream,
    buf: Vec<u8>,
    inbox: VecDeque<(MsgId, Vec<u8>)>,
    pub pid: PlayerId,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            buf: Vec::new(),
            inbox: VecDeque::new(),
            pid: 0,
        })
    }

    /// Connect, handshake and wait for the assigned id.
    pub async fn join(addr: SocketAddr, name: &str) -> anyhow::Result<Self> {
        let mut client = Self::connect(addr).await?;
        client.send(&hello(name)).await?;
        let ok: ConnectionSuccessful = client.recv().await?;
        client.pid = ok.pid;
        Ok(client)
    }

    pub async fn send<T: Message>(&mut self, msg: &T) -> anyhow::Result<()> {
        let frame = encode_message(msg)?;
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    /// Next packet of any kind. `None` once the server closed the socket.
    pub async fn next_packet(&mut self) -> anyhow::Result<Option<(MsgId, Vec<u8>)>> {
        loop {
            if let Some(p) = self.inbox.pop_front() {
                return Ok(Some(p));
            }
            let mut chunk = vec![0u8; 64 * 1024];
            let n = timeout(RECV_TIMEOUT, self.stream.read(&mut chunk)).await??;
            if n == 0 {
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
            let (packets, consumed) = try_decode_tcp_frames(&self.buf)?;
            for p in packets {
                self.inbox.push_back((p.msg_id, p.payload.to_vec()));
            }
            self.buf.drain(..consumed);
        }
    }

    /// Skip packets until one of type `T` arrives.
    pub async fn recv<T: Message>(&mut self) -> anyhow::Result<T> {
        loop {
            let Some((msg_id, payload)) = self.next_packet().await? else {
                anyhow::bail!("connection closed while waiting for {:?}", T::msg_id());
            };
            if msg_id == T::msg_id() {
                return Ok(decode_message(&payload)?);
            }
        }
    }

    /// Drain until the server closes the connection.
    pub async fn expect_closed(&mut self) -> anyhow::Result<Vec<MsgId>> {
        let mut seen = Vec::new();
        while let Some((msg_id, _)) = self.next_packet().await? {
            seen.push(msg_id);
        }
        Ok(seen)
    }

    /// Ids received within `window`, without failing on silence.
    pub async fn collect_for(&mut self, window: Duration) -> Vec<MsgId> {
        let mut seen = Vec::new();
        let _ = timeout(window, async {
            while let Ok(Some((msg_id, _))) = self.next_packet().await {
                seen.push(msg_id);
            }
        })
        .await;
        seen
    }
}

pub fn hello(name: &str) -> Hello {
    Hello {
        netplay_version: PROTOCOL_VERSION.to_string(),
        revision: "test".to_string(),
        name: name.to_string(),
    }
}
