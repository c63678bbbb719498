//! Handshake, roster broadcasts and disconnect handling over real sockets.

mod common;

use std::time::Duration;

use common::{TestClient, hello, spawn_test_server};
use lockstep_netd::config::ServerConfig;
use lockstep_netd::services::Services;
use lockstep_netproto::messages::game::NetSettings;
use lockstep_netproto::messages::input::PadMapping;
use lockstep_netproto::messages::session::{
    ChatMessage, ConnectionError, ConnectionRejected, Hello, PlayerJoin, PlayerLeave,
};
use lockstep_netproto::msg_id::MsgId;

fn no_idle() -> ServerConfig {
    ServerConfig {
        idle: None,
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn first_client_is_host_and_second_is_announced() -> anyhow::Result<()> {
    let server = spawn_test_server(no_idle(), NetSettings::default(), Services::default()).await?;

    let mut host = TestClient::join(server.addr, "host").await?;
    assert_eq!(host.pid, 1);
    let mapping: PadMapping = host.recv().await?;
    assert_eq!(mapping.pads, [1, 0, 0, 0]);

    let mut guest = TestClient::join(server.addr, "guest").await?;
    assert_eq!(guest.pid, 2);

    // The newcomer learns about the host.
    let existing: PlayerJoin = guest.recv().await?;
    assert_eq!(existing.pid, 1);
    assert_eq!(existing.name, "host");

    // The host learns about the newcomer, then the refreshed pad table.
    let joined: PlayerJoin = host.recv().await?;
    assert_eq!(joined.pid, 2);
    assert_eq!(joined.name, "guest");
    let mapping: PadMapping = host.recv().await?;
    assert_eq!(mapping.pads, [1, 2, 0, 0]);

    let names: Vec<String> = server.handle.players().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["host".to_string(), "guest".to_string()]);
    Ok(())
}

#[tokio::test]
async fn version_mismatch_is_rejected_and_closed() -> anyhow::Result<()> {
    let server = spawn_test_server(no_idle(), NetSettings::default(), Services::default()).await?;

    let mut client = TestClient::connect(server.addr).await?;
    client
        .send(&Hello {
            netplay_version: "lockstep-0.0.0-other".to_string(),
            ..hello("old")
        })
        .await?;

    let rejected: ConnectionRejected = client.recv().await?;
    assert_eq!(rejected.error, ConnectionError::VersionMismatch);
    client.expect_closed().await?;
    assert!(server.handle.players().is_empty());
    Ok(())
}

#[tokio::test]
async fn overlong_names_are_rejected() -> anyhow::Result<()> {
    let server = spawn_test_server(no_idle(), NetSettings::default(), Services::default()).await?;

    let mut client = TestClient::connect(server.addr).await?;
    client.send(&hello(&"x".repeat(31))).await?;
    let rejected: ConnectionRejected = client.recv().await?;
    assert_eq!(rejected.error, ConnectionError::NameTooLong);
    Ok(())
}

#[tokio::test]
async fn anything_but_hello_first_drops_the_connection() -> anyhow::Result<()> {
    let server = spawn_test_server(no_idle(), NetSettings::default(), Services::default()).await?;

    let mut client = TestClient::connect(server.addr).await?;
    client
        .send(&ChatMessage {
            author: 0,
            text: "hi".to_string(),
        })
        .await?;
    let seen = client.expect_closed().await?;
    assert!(!seen.contains(&MsgId::ConnectionSuccessful));
    Ok(())
}

#[tokio::test]
async fn leaving_player_is_announced_and_unmapped() -> anyhow::Result<()> {
    let server = spawn_test_server(no_idle(), NetSettings::default(), Services::default()).await?;

    let mut host = TestClient::join(server.addr, "host").await?;
    let guest = TestClient::join(server.addr, "guest").await?;
    let _: PlayerJoin = host.recv().await?;
    drop(guest);

    let left: PlayerLeave = host.recv().await?;
    assert_eq!(left.pid, 2);
    let mapping: PadMapping = host.recv().await?;
    assert_eq!(mapping.pads, [1, 0, 0, 0]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.handle.players().len(), 1);
    Ok(())
}
