mod common;

use common::ws_helpers::{drain_messages, recv_json, send_json, start_server, ws_connect};
use futures::StreamExt;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[tokio::test]
async fn connect_without_token_closes() {
    let (base, _pool) = start_server().await;

    let ws_url = format!("{}/gateway", base.replace("http://", "ws://"));
    let (mut ws, _) = connect_async(&ws_url).await.unwrap();

    // Connection should close almost immediately since no auth
    let result = tokio::time::timeout(std::time::Duration::from_secs(2), ws.next()).await;
    match result {
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Err(_) => {}
        Ok(Some(Ok(_))) => {}
        Ok(Some(Err(_))) => {}
    }
}

#[tokio::test]
async fn dm_message_round_trip() {
    let (base, pool) = start_server().await;
    let (alice, alice_token) = common::create_test_user(&pool, "alice", "pass123").await;
    let (bob, bob_token) = common::create_test_user(&pool, "bob", "pass123").await;
    let dm_id = common::create_test_dm(&pool, alice, bob).await;
    let room = format!("dm:{}", dm_id);

    let mut ws_a = ws_connect(&base, &alice_token).await;
    let mut ws_b = ws_connect(&base, &bob_token).await;

    send_json(&mut ws_a, &json!({"type": "identify", "user_id": alice})).await;
    send_json(&mut ws_a, &json!({"type": "join", "room": room})).await;
    send_json(&mut ws_b, &json!({"type": "join", "room": room})).await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    send_json(&mut ws_a, &json!({"type": "send_message", "room": room, "text": "hi"})).await;

    // Both sessions receive the event before any history fetch
    let event_b = recv_json(&mut ws_b).await.unwrap();
    assert_eq!(event_b["type"], "message");
    assert_eq!(event_b["content"], "hi");
    assert_eq!(event_b["sender_id"], alice);
    assert_eq!(event_b["deleted"], false);

    let event_a = recv_json(&mut ws_a).await.unwrap();
    assert_eq!(event_a["id"], event_b["id"]);
}

#[tokio::test]
async fn delete_notifies_current_subscribers() {
    let (base, pool) = start_server().await;
    let (alice, alice_token) = common::create_test_user(&pool, "alice", "pass123").await;
    let (bob, bob_token) = common::create_test_user(&pool, "bob", "pass123").await;
    let dm_id = common::create_test_dm(&pool, alice, bob).await;
    let room = format!("dm:{}", dm_id);

    let mut ws_a = ws_connect(&base, &alice_token).await;
    let mut ws_b = ws_connect(&base, &bob_token).await;
    send_json(&mut ws_a, &json!({"type": "join", "room": room})).await;
    send_json(&mut ws_b, &json!({"type": "join", "room": room})).await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    send_json(&mut ws_a, &json!({"type": "send_message", "room": room, "text": "oops"})).await;
    let message_id = recv_json(&mut ws_a).await.unwrap()["id"].as_i64().unwrap();
    drain_messages(&mut ws_b).await;

    send_json(&mut ws_a, &json!({"type": "delete_message", "message_id": message_id})).await;

    let event = recv_json(&mut ws_b).await.unwrap();
    assert_eq!(event["type"], "message_deleted");
    assert_eq!(event["message_id"], message_id);

    let (content, deleted) = sqlx::query_as::<_, (Option<String>, bool)>(
        "SELECT content, deleted FROM messages WHERE id = ?",
    )
    .bind(message_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(content, None);
    assert!(deleted);
}

#[tokio::test]
async fn forbidden_room_stays_silent() {
    let (base, pool) = start_server().await;
    let (alice, _) = common::create_test_user(&pool, "alice", "pass123").await;
    let (_mallory, mallory_token) = common::create_test_user(&pool, "mallory", "pass123").await;
    let (server_id, channel_id) = common::create_test_server(&pool, alice, "Test").await;
    let room = format!("server:{}:channel:{}", server_id, channel_id);

    let mut ws = ws_connect(&base, &mallory_token).await;
    send_json(&mut ws, &json!({"type": "join", "room": room})).await;
    send_json(&mut ws, &json!({"type": "send_message", "room": room, "text": "anyone?"})).await;

    // No error, no echo, nothing persisted
    let msgs = drain_messages(&mut ws).await;
    assert!(msgs.is_empty());

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn joining_a_new_room_leaves_the_previous_one() {
    let (base, pool) = start_server().await;
    let (alice, alice_token) = common::create_test_user(&pool, "alice", "pass123").await;
    let (bob, bob_token) = common::create_test_user(&pool, "bob", "pass123").await;
    let (server_id, channel_id) = common::create_test_server(&pool, alice, "Test").await;
    common::add_member(&pool, server_id, bob).await;
    let dm_id = common::create_test_dm(&pool, alice, bob).await;

    let channel_room = format!("server:{}:channel:{}", server_id, channel_id);
    let dm_room = format!("dm:{}", dm_id);

    let mut ws_a = ws_connect(&base, &alice_token).await;
    let mut ws_b = ws_connect(&base, &bob_token).await;

    // Bob starts in the channel, then switches to the DM
    send_json(&mut ws_b, &json!({"type": "join", "room": channel_room})).await;
    send_json(&mut ws_b, &json!({"type": "join", "room": dm_room})).await;
    send_json(&mut ws_a, &json!({"type": "join", "room": channel_room})).await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    send_json(
        &mut ws_a,
        &json!({"type": "send_message", "room": channel_room, "text": "channel talk"}),
    )
    .await;

    // Alice hears her own channel message; bob, now in the DM, does not
    let event = recv_json(&mut ws_a).await.unwrap();
    assert_eq!(event["content"], "channel talk");
    let msgs = drain_messages(&mut ws_b).await;
    assert!(msgs.is_empty());
}

#[tokio::test]
async fn disconnect_purges_subscriptions() {
    let (base, pool) = start_server().await;
    let (alice, alice_token) = common::create_test_user(&pool, "alice", "pass123").await;
    let (bob, bob_token) = common::create_test_user(&pool, "bob", "pass123").await;
    let dm_id = common::create_test_dm(&pool, alice, bob).await;
    let room = format!("dm:{}", dm_id);

    let mut ws_a = ws_connect(&base, &alice_token).await;
    let mut ws_b = ws_connect(&base, &bob_token).await;
    send_json(&mut ws_a, &json!({"type": "join", "room": room})).await;
    send_json(&mut ws_b, &json!({"type": "join", "room": room})).await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    drop(ws_b);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    // Delivery to the remaining subscriber is unaffected
    send_json(&mut ws_a, &json!({"type": "send_message", "room": room, "text": "still here"})).await;
    let event = recv_json(&mut ws_a).await.unwrap();
    assert_eq!(event["content"], "still here");
}
