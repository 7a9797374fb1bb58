//! Integration tests for the relay server, handler, and full connection flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use seatrelay::prelude::*;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns its address and engine.
async fn start_server() -> (String, Arc<RelayEngine>) {
    let server = RelayServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let engine = server.engine();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, engine)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send should succeed");
}

/// Reads the next text frame and decodes it.
async fn recv_msg(ws: &mut ClientWs) -> ServerMessage {
    let deadline = Duration::from_secs(2);
    loop {
        let frame = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str())
                    .expect("server sent valid json");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn join(ws: &mut ClientWs, room: &str) -> Role {
    send_json(ws, json!({"type": "join", "room": room})).await;
    match recv_msg(ws).await {
        ServerMessage::Joined { color, .. } => color,
        other => panic!("expected joined, got {other:?}"),
    }
}

fn room(name: &str) -> RoomId {
    RoomId::parse(name, MAX_ROOM_ID_LEN).expect("valid room name")
}

// =========================================================================
// Server lifecycle
// =========================================================================

#[tokio::test]
async fn test_server_binds_and_reports_addr() {
    let server = RelayServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server.local_addr().expect("should have local addr");
    assert!(addr.port() > 0);
}

#[tokio::test]
async fn test_bind_to_bad_address_fails() {
    let result = RelayServer::builder().bind("not-an-address").build().await;
    assert!(matches!(result, Err(RelayError::Transport(_))));
}

#[tokio::test]
async fn test_builder_uses_supplied_registry() {
    let registry = RoomRegistry::with_config(RoomConfig {
        max_room_id_len: 3,
        ..RoomConfig::default()
    });
    let server = RelayServer::builder()
        .bind("127.0.0.1:0")
        .registry(registry)
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("addr").to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    let mut ws = connect(&addr).await;
    send_json(&mut ws, json!({"type": "join", "room": "abcdef"})).await;
    match recv_msg(&mut ws).await {
        ServerMessage::Joined { room: r, .. } => assert_eq!(r.as_str(), "abc"),
        other => panic!("expected joined, got {other:?}"),
    }
}

// =========================================================================
// Full flow
// =========================================================================

#[tokio::test]
async fn test_join_over_websocket() {
    let (addr, _engine) = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({"type": "join", "room": "lobby", "want": "black"}))
        .await;
    let raw = match ws.next().await {
        Some(Ok(Message::Text(text))) => text.to_string(),
        other => panic!("expected text frame, got {other:?}"),
    };
    let value: Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(
        value,
        json!({
            "type": "joined",
            "room": "lobby",
            "color": "black",
            "created": true,
            "snapshot": null,
        })
    );
}

#[tokio::test]
async fn test_move_is_relayed_between_players() {
    let (addr, _engine) = start_server().await;
    let mut white = connect(&addr).await;
    let mut black = connect(&addr).await;

    assert_eq!(join(&mut white, "g").await, Role::SeatA);
    assert_eq!(join(&mut black, "g").await, Role::SeatB);
    assert_eq!(
        recv_msg(&mut white).await,
        ServerMessage::info(join_notice(Role::SeatB))
    );

    send_json(
        &mut white,
        json!({"type": "move", "move": {"from": "e2", "to": "e4"}, "snapshot": "s1"}),
    )
    .await;
    assert_eq!(
        recv_msg(&mut black).await,
        ServerMessage::Move {
            r#move: json!({"from": "e2", "to": "e4"}),
        }
    );

    send_json(&mut black, json!({"type": "snapshot-please"})).await;
    assert_eq!(
        recv_msg(&mut black).await,
        ServerMessage::Snapshot {
            snapshot: Some(json!("s1")),
        }
    );
}

#[tokio::test]
async fn test_spectator_sees_moves_and_newgame() {
    let (addr, _engine) = start_server().await;
    let mut white = connect(&addr).await;
    let mut black = connect(&addr).await;
    let mut watcher = connect(&addr).await;

    join(&mut white, "g").await;
    join(&mut black, "g").await;
    assert_eq!(join(&mut watcher, "g").await, Role::Spectator);

    send_json(&mut white, json!({"type": "move", "move": 7})).await;
    assert_eq!(
        recv_msg(&mut watcher).await,
        ServerMessage::Move { r#move: json!(7) }
    );

    send_json(&mut black, json!({"type": "newgame", "snapshot": "start"})).await;
    assert_eq!(
        recv_msg(&mut watcher).await,
        ServerMessage::Newgame {
            snapshot: Some(json!("start")),
        }
    );
}

#[tokio::test]
async fn test_disconnect_notifies_room_and_frees_seat() {
    let (addr, engine) = start_server().await;
    let mut white = connect(&addr).await;
    let mut black = connect(&addr).await;

    join(&mut white, "g").await;
    join(&mut black, "g").await;
    recv_msg(&mut white).await;

    white.close(None).await.expect("close should succeed");
    drop(white);

    assert_eq!(
        recv_msg(&mut black).await,
        ServerMessage::info(DISCONNECT_NOTICE)
    );
    let info = engine.room_info(&room("g")).await.expect("room exists");
    assert_eq!(info.seat_a, None);

    let mut newcomer = connect(&addr).await;
    assert_eq!(join(&mut newcomer, "g").await, Role::SeatA);
}

#[tokio::test]
async fn test_room_required_over_websocket() {
    let (addr, engine) = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({"type": "join", "room": "  "})).await;
    assert_eq!(recv_msg(&mut ws).await, ServerMessage::error(ROOM_REQUIRED));
    assert_eq!(engine.room_count().await, 0);
}

#[tokio::test]
async fn test_garbage_does_not_kill_connection() {
    let (addr, _engine) = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("{{{ nope".into()))
        .await
        .expect("send should succeed");
    ws.send(Message::Binary(vec![0xde, 0xad].into()))
        .await
        .expect("send should succeed");
    send_json(&mut ws, json!({"type": "teleport"})).await;

    assert_eq!(join(&mut ws, "still-alive").await, Role::SeatA);
}

#[tokio::test]
async fn test_stalled_handshake_does_not_block_other_clients() {
    let (addr, _engine) = start_server().await;

    // Opens TCP but never sends the upgrade request.
    let _idle = tokio::net::TcpStream::connect(&addr)
        .await
        .expect("tcp connect");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let role = tokio::time::timeout(Duration::from_secs(3), async {
        let mut ws = connect(&addr).await;
        join(&mut ws, "busy").await
    })
    .await
    .expect("second client must not wait on the idle socket");
    assert_eq!(role, Role::SeatA);
}
