//! Game selection through the catalog and the pre-start sync phases.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{TestClient, TestServer, spawn_test_server};
use lockstep_netd::config::ServerConfig;
use lockstep_netd::services::{MemoryCard, MemorySaveStore, Services};
use lockstep_netproto::constants::SYNC_HASH_LEN;
use lockstep_netproto::messages::chunked::{
    ChunkedDataComplete, ChunkedDataEnd, ChunkedDataPayload, ChunkedDataStart,
};
use lockstep_netproto::messages::game::{
    ChangeGame, DiscRegion, NetSettings, Platform, RequestChangeGameFull, RequestStartGame,
    StartGame, SyncIdentifier,
};
use lockstep_netproto::messages::session::PlayerJoin;
use lockstep_netproto::messages::sync::{SyncCodes, SyncSaveData};
use lockstep_netproto::msg_id::MsgId;

fn full_change() -> RequestChangeGameFull {
    RequestChangeGameFull {
        sync_identifier: SyncIdentifier {
            dol_elf_size: 1234,
            game_id: "GALE01".to_string(),
            revision: 2,
            disc_number: 0,
            is_datel: false,
            sync_hash: [5; SYNC_HASH_LEN],
        },
        netplay_name: "Super Smash Bros. Melee".to_string(),
        region: DiscRegion::NtscU,
        platform: Platform::GameCubeDisc,
        has_wii_data: false,
        tmd: None,
        ticket: None,
        cert: None,
    }
}

async fn lobby(
    dir: &tempfile::TempDir,
    services: Services,
) -> anyhow::Result<(TestServer, TestClient, TestClient)> {
    let config = ServerConfig {
        catalog_path: dir.path().join("games_list.json"),
        idle: None,
        ..ServerConfig::default()
    };
    let server = spawn_test_server(config, NetSettings::default(), services).await?;
    let mut host = TestClient::join(server.addr, "host").await?;
    let mut guest = TestClient::join(server.addr, "guest").await?;
    let _: PlayerJoin = host.recv().await?;

    host.send(&full_change()).await?;
    let change: ChangeGame = guest.recv().await?;
    assert_eq!(change.netplay_name, "Super Smash Bros. Melee");
    Ok((server, host, guest))
}

/// Consume the code sync burst a guest receives.
async fn recv_code_sync(guest: &mut TestClient) -> anyhow::Result<()> {
    assert_eq!(guest.recv::<SyncCodes>().await?, SyncCodes::Notify);
    assert_eq!(
        guest.recv::<SyncCodes>().await?,
        SyncCodes::NotifyGecko { lines: 0 }
    );
    Ok(())
}

#[tokio::test]
async fn full_change_records_the_game_in_the_catalog() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (_server, _host, _guest) = lobby(&dir, Services::default()).await?;

    // The catalog is written off the session loop.
    let path = dir.path().join("games_list.json");
    let mut doc = serde_json::Value::Null;
    for _ in 0..100 {
        if let Ok(text) = std::fs::read_to_string(&path)
            && let Ok(parsed) = serde_json::from_str(&text)
        {
            doc = parsed;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let games = doc["games"].as_array().cloned().unwrap_or_default();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0]["game_id"], "GALE01");
    assert_eq!(games[0]["sync_hash"], hex::encode([5u8; SYNC_HASH_LEN]));
    Ok(())
}

#[tokio::test]
async fn start_waits_for_both_sync_phases() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (server, mut host, mut guest) = lobby(&dir, Services::default()).await?;

    host.send(&RequestStartGame).await?;
    assert_eq!(
        guest.recv::<SyncSaveData>().await?,
        SyncSaveData::Notify { save_count: 0 }
    );
    recv_code_sync(&mut guest).await?;
    assert!(server.handle.is_start_pending());
    assert!(!server.handle.is_running());

    guest.send(&SyncSaveData::Success).await?;
    let early = guest.collect_for(Duration::from_millis(200)).await;
    assert!(!early.contains(&MsgId::StartGame));

    guest.send(&SyncCodes::Success).await?;
    let start: StartGame = guest.recv().await?;
    let host_start: StartGame = host.recv().await?;
    assert_eq!(start.game_token, host_start.game_token);
    assert!(server.handle.is_running());
    Ok(())
}

#[tokio::test]
async fn a_single_failure_aborts_the_attempt() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (server, mut host, mut guest) = lobby(&dir, Services::default()).await?;

    host.send(&RequestStartGame).await?;
    recv_code_sync(&mut guest).await?;
    guest.send(&SyncCodes::Failure).await?;
    guest.send(&SyncSaveData::Success).await?;

    let seen = host.collect_for(Duration::from_millis(300)).await;
    assert!(!seen.contains(&MsgId::StartGame));
    assert!(!server.handle.is_start_pending());
    assert!(!server.handle.is_running());
    Ok(())
}

#[tokio::test]
async fn memory_card_is_streamed_to_guests_in_chunks() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(MemorySaveStore::default());
    store.set_memory_card(
        true,
        MemoryCard::Raw {
            region: "USA".to_string(),
            size_override: -1,
            image: vec![0xAB; 64 * 1024],
        },
    );
    let services = Services {
        storage: store,
        ..Services::default()
    };
    let (server, mut host, mut guest) = lobby(&dir, services).await?;

    host.send(&RequestStartGame).await?;
    assert_eq!(
        guest.recv::<SyncSaveData>().await?,
        SyncSaveData::Notify { save_count: 1 }
    );

    let start: ChunkedDataStart = guest.recv().await?;
    assert_eq!(start.title, "Memory Card A Synchronization");
    let mut received = 0u64;
    while received < start.total_len {
        let payload: ChunkedDataPayload = guest.recv().await?;
        assert_eq!(payload.id, start.id);
        received += payload.data.len() as u64;
    }
    let end: ChunkedDataEnd = guest.recv().await?;
    assert_eq!(end.id, start.id);

    guest.send(&ChunkedDataComplete { id: start.id }).await?;
    guest.send(&SyncSaveData::Success).await?;
    guest.send(&SyncCodes::Success).await?;
    let _: StartGame = host.recv().await?;
    assert!(server.handle.is_running());
    Ok(())
}
