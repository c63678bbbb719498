//! Input relay once a game is running.

mod common;

use common::{TestClient, TestServer, quick_start_settings, spawn_test_server};
use lockstep_netd::config::ServerConfig;
use lockstep_netd::services::Services;
use lockstep_netproto::constants::SYNC_HASH_LEN;
use lockstep_netproto::messages::game::{RequestStartGame, StartGame, StartGameAck, SyncIdentifier};
use lockstep_netproto::messages::input::{PadAnalog, PadData, PadEntry};
use lockstep_netproto::messages::session::{PlayerJoin, PlayerLeave};

fn game() -> SyncIdentifier {
    SyncIdentifier {
        dol_elf_size: 0,
        game_id: "GALE01".to_string(),
        revision: 2,
        disc_number: 0,
        is_datel: false,
        sync_hash: [9; SYNC_HASH_LEN],
    }
}

fn entry(slot: u8, button: u16) -> PadEntry {
    PadEntry {
        slot,
        button,
        analog: Some(PadAnalog {
            is_connected: true,
            ..PadAnalog::default()
        }),
    }
}

/// Host and guest joined, game selected and started, both acknowledged.
async fn running_pair() -> anyhow::Result<(TestServer, TestClient, TestClient)> {
    let config = ServerConfig {
        idle: None,
        ..ServerConfig::default()
    };
    let server = spawn_test_server(config, quick_start_settings(), Services::default()).await?;
    let mut host = TestClient::join(server.addr, "host").await?;
    let mut guest = TestClient::join(server.addr, "guest").await?;
    let _: PlayerJoin = host.recv().await?;

    server.handle.change_game(game(), "Melee");
    host.send(&RequestStartGame).await?;

    let start: StartGame = host.recv().await?;
    let guest_start: StartGame = guest.recv().await?;
    assert_eq!(start.game_token, guest_start.game_token);
    assert!(server.handle.is_running());

    let ack = StartGameAck {
        game_token: start.game_token,
    };
    host.send(&ack).await?;
    guest.send(&ack).await?;
    Ok((server, host, guest))
}

#[tokio::test]
async fn guest_input_reaches_the_host() -> anyhow::Result<()> {
    let (_server, mut host, mut guest) = running_pair().await?;

    guest
        .send(&PadData {
            entries: vec![entry(1, 0x0100)],
        })
        .await?;
    let relayed: PadData = host.recv().await?;
    assert_eq!(relayed.entries.len(), 1);
    assert_eq!(relayed.entries[0].slot, 1);
    assert_eq!(relayed.entries[0].button, 0x0100);

    host.send(&PadData {
        entries: vec![entry(0, 0x0001)],
    })
    .await?;
    let relayed: PadData = guest.recv().await?;
    assert_eq!(relayed.entries[0].slot, 0);
    Ok(())
}

#[tokio::test]
async fn input_for_an_unmapped_slot_disconnects_the_sender() -> anyhow::Result<()> {
    let (server, mut host, mut guest) = running_pair().await?;

    guest
        .send(&PadData {
            entries: vec![entry(3, 0)],
        })
        .await?;
    guest.expect_closed().await?;

    let left: PlayerLeave = host.recv().await?;
    assert_eq!(left.pid, 2);
    // The guest held a pad, so the running game is halted.
    assert!(!server.handle.is_running());
    Ok(())
}
