use lockstep_netproto::PlayerId;
use lockstep_netproto::constants::{HOST_PLAYER_ID, MAX_NAME_LENGTH, PROTOCOL_VERSION};
use lockstep_netproto::error::ProtoError;
use lockstep_netproto::messages::game::{DesyncDetected, DisableGame, GameStatus};
use lockstep_netproto::messages::input::{HostInputAuthority, PadBuffer};
use lockstep_netproto::messages::session::{
    ConnectionError, ConnectionSuccessful, Hello, PlayerJoin, PlayerLeave,
};
use tracing::{info, warn};

use super::Session;
use super::registry::{Client, PendingPeer};
use crate::async_queue::Target;
use crate::net::inbound::ConnId;

impl Session {
    /// Validate a handshake and register the peer.
    ///
    /// The mapping broadcast happens under the same registry write lock as
    /// the insertion, so nobody observes a table naming an unknown player.
    pub(crate) fn connect(
        &self,
        conn_id: ConnId,
        peer: PendingPeer,
        hello: Hello,
    ) -> Result<PlayerId, ConnectionError> {
        let (game, mut registry) = self.lock();

        if hello.netplay_version != PROTOCOL_VERSION {
            return Err(ConnectionError::VersionMismatch);
        }
        if game.is_busy() {
            return Err(ConnectionError::GameRunning);
        }
        let Some(pid) = registry.next_free_id() else {
            return Err(ConnectionError::ServerFull);
        };
        if hello.name.chars().count() > MAX_NAME_LENGTH {
            return Err(ConnectionError::NameTooLong);
        }

        let pad = registry.mappings.assign_free_pad(pid);
        info!(pid, conn_id, addr = %peer.addr, name = %hello.name, ?pad, "Player joined");

        registry.broadcast(
            &PlayerJoin {
                pid,
                name: hello.name.clone(),
                revision: hello.revision.clone(),
            },
            Target::ALL,
        );

        let outbound = peer.outbound;
        let send = |msg_result: Result<bool, ProtoError>| {
            if let Err(e) = msg_result {
                warn!(pid, error = %e, "Failed to encode handshake message");
            }
        };
        send(outbound.send(&ConnectionSuccessful { pid }));
        if let Some(selected) = &game.selected_game {
            send(outbound.send(&selected.message()));
        }
        if !game.host_input_authority {
            send(outbound.send(&PadBuffer {
                size: game.pad_buffer_size,
            }));
        }
        send(outbound.send(&HostInputAuthority {
            enabled: game.host_input_authority,
        }));
        for existing in registry.clients() {
            send(outbound.send(&PlayerJoin {
                pid: existing.pid,
                name: existing.name.clone(),
                revision: existing.revision.clone(),
            }));
            send(outbound.send(&GameStatus {
                pid: existing.pid,
                status: existing.game_status,
            }));
        }

        registry.insert(Client {
            pid,
            conn_id,
            addr: peer.addr,
            outbound,
            cancel_token: peer.cancel_token,
            name: hello.name,
            revision: hello.revision,
            ping_ms: 0,
            current_game: 0,
            has_ipl_dump: false,
            has_hardware_fma: false,
            game_status: Default::default(),
            idle_ticks: 0,
        });
        registry.broadcast_mappings();

        Ok(pid)
    }

    /// Remove `pid` from the session and close its connection. Unknown ids
    /// are ignored.
    pub(crate) fn disconnect(&self, pid: PlayerId, reason: &str) {
        let (mut game, mut registry) = self.lock();
        if !registry.contains(pid) {
            return;
        }

        if game.is_running && pid != HOST_PLAYER_ID && registry.mappings.holds_pad(pid) {
            warn!(pid, "Player holding a pad left; halting the game");
            game.is_running = false;
            registry.broadcast(&DisableGame, Target::ALL);
        }

        if game.start_pending {
            warn!(pid, "Player left during the start sequence; aborting");
            self.services.observer.on_game_start_aborted();
            self.chunks.abort();
            game.start_pending = false;
        }

        let Some(client) = registry.remove(pid) else {
            return;
        };
        info!(pid, conn_id = client.conn_id, name = %client.name, reason, "Player left");
        registry.broadcast(&PlayerLeave { pid }, Target::ALL);

        let cleared = registry.mappings.clear_player(pid);
        if cleared.pads {
            registry.broadcast(&registry.mappings.pad_message(), Target::ALL);
            registry.broadcast(&registry.mappings.gba_message(), Target::ALL);
        }
        if cleared.wiimotes {
            registry.broadcast(&registry.mappings.wiimote_message(), Target::ALL);
        }

        if let Some((frame, blamed)) = game.timebase.forget_player(pid, registry.len())
            && game.is_running
        {
            warn!(frame, blamed, "Desync detected");
            registry.broadcast(&DesyncDetected { pid: blamed, frame }, Target::ALL);
            self.services.observer.on_desync(blamed, frame);
        }

        if registry.len() <= 1 {
            registry.readiness.reset_except_host();
        }
        if game.current_golfer == pid {
            game.current_golfer = 0;
        }
        if game.pending_golfer == pid {
            game.pending_golfer = 0;
        }

        self.chunks.on_player_left();
        client.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use lockstep_netproto::messages::game::NetSettings;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::config::ServerConfig;
    use crate::net::outbound::{PeerOutboundRx, peer_channels};
    use crate::services::Services;

    fn hello(name: &str) -> Hello {
        Hello {
            netplay_version: PROTOCOL_VERSION.to_string(),
            revision: "test".to_string(),
            name: name.to_string(),
        }
    }

    fn pending() -> (PendingPeer, PeerOutboundRx, CancellationToken) {
        let (outbound, rx) = peer_channels();
        let token = CancellationToken::new();
        (
            PendingPeer {
                addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
                outbound,
                cancel_token: token.clone(),
            },
            rx,
            token,
        )
    }

    fn join(session: &Session, conn_id: ConnId, name: &str) -> (PlayerId, PeerOutboundRx, CancellationToken) {
        let (peer, rx, token) = pending();
        let pid = session.connect(conn_id, peer, hello(name)).unwrap();
        (pid, rx, token)
    }

    #[test]
    fn handshake_validation_order() {
        let (session, _rt) = Session::new(ServerConfig::default(), NetSettings::default(), Services::default());

        let (peer, _rx, _) = pending();
        let mut bad = hello(&"x".repeat(MAX_NAME_LENGTH + 1));
        bad.netplay_version = "other".to_string();
        assert_eq!(session.connect(1, peer, bad), Err(ConnectionError::VersionMismatch));

        session.game.lock().start_pending = true;
        let (peer, _rx, _) = pending();
        assert_eq!(
            session.connect(2, peer, hello(&"x".repeat(MAX_NAME_LENGTH + 1))),
            Err(ConnectionError::GameRunning)
        );
        session.game.lock().start_pending = false;

        let (peer, _rx, _) = pending();
        assert_eq!(
            session.connect(3, peer, hello(&"x".repeat(MAX_NAME_LENGTH + 1))),
            Err(ConnectionError::NameTooLong)
        );

        // Code points, not bytes.
        let (peer, _rx, _) = pending();
        assert!(session.connect(4, peer, hello(&"é".repeat(MAX_NAME_LENGTH))).is_ok());
        assert!(session.registry.read().readiness.status(1).is_some());
    }

    #[test]
    fn identities_are_reused_lowest_first_and_mappings_cleared() {
        let (session, _rt) = Session::new(ServerConfig::default(), NetSettings::default(), Services::default());
        let (p1, _rx1, _) = join(&session, 1, "host");
        let (p2, _rx2, t2) = join(&session, 2, "b");
        let (p3, _rx3, _) = join(&session, 3, "c");
        assert_eq!((p1, p2, p3), (1, 2, 3));
        assert_eq!(session.registry.read().mappings.pads, [1, 2, 3, 0]);

        session.disconnect(2, "test");
        assert!(t2.is_cancelled());
        {
            let reg = session.registry.read();
            assert_eq!(reg.mappings.pads, [1, 0, 3, 0]);
            assert!(reg.mappings.owners_valid(|pid| reg.contains(pid)));
        }

        let (p, _rx, _) = join(&session, 4, "d");
        assert_eq!(p, 2);
        assert_eq!(session.registry.read().mappings.pads, [1, 2, 3, 0]);
    }

    #[test]
    fn pad_holder_leaving_halts_a_running_game() {
        let (session, _rt) = Session::new(ServerConfig::default(), NetSettings::default(), Services::default());
        let _host = join(&session, 1, "host");
        let _guest = join(&session, 2, "guest");
        session.game.lock().is_running = true;

        session.disconnect(2, "test");
        assert!(!session.game.lock().is_running);
    }

    #[test]
    fn queued_mapping_change_never_outlives_a_departure() {
        use lockstep_netproto::codec::{decode_message, try_decode_tcp_frames};
        use lockstep_netproto::messages::input::PadMapping;
        use lockstep_netproto::msg_id::MsgId;

        let (session, mut rt) = Session::new(ServerConfig::default(), NetSettings::default(), Services::default());
        let (_, mut host_rx, _) = join(&session, 1, "host");
        let _b = join(&session, 2, "b");
        let _c = join(&session, 3, "c");

        session.handle().set_pad_mapping([1, 2, 3, 0]);
        session.disconnect(3, "test");
        while let Ok(item) = rt.queue_rx.try_recv() {
            session.deliver(item);
        }

        let last = host_rx
            .drain_frames()
            .iter()
            .flat_map(|frame| {
                let (views, _) = try_decode_tcp_frames(frame).unwrap();
                views
                    .into_iter()
                    .filter(|v| v.msg_id == MsgId::PadMapping)
                    .map(|v| decode_message::<PadMapping>(v.payload).unwrap())
                    .collect::<Vec<_>>()
            })
            .last()
            .unwrap();
        assert_eq!(last.pads, [1, 2, 0, 0]);
    }

    #[test]
    fn departure_releases_pending_timebase_frames() {
        let (session, _rt) = Session::new(ServerConfig::default(), NetSettings::default(), Services::default());
        let _host = join(&session, 1, "host");
        let _b = join(&session, 2, "b");
        let _c = join(&session, 3, "c");
        {
            let mut game = session.game.lock();
            game.timebase.record(1, 30, 4, 3);
            game.timebase.record(2, 30, 4, 3);
            game.timebase.record(3, 31, 4, 3);
        }

        session.disconnect(3, "test");
        let game = session.game.lock();
        assert_eq!(game.timebase.pending_frames(), 0);
        assert!(!game.timebase.desync_detected());
    }

    #[test]
    fn leaving_mid_start_aborts_the_start() {
        let (session, _rt) = Session::new(ServerConfig::default(), NetSettings::default(), Services::default());
        let _host = join(&session, 1, "host");
        let _guest = join(&session, 2, "guest");
        session.game.lock().start_pending = true;

        session.disconnect(2, "test");
        assert!(!session.game.lock().start_pending);
        session.disconnect(2, "again");
    }
}
