#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

pub type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Bind the test app to a random port and serve it in the background.
pub async fn start_server() -> (String, sqlx::SqlitePool) {
    let pool = super::setup_test_db().await;
    let app = super::create_test_app(pool.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the listener a moment to come up
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{}", port), pool)
}

/// Open a gateway connection authenticated by session token.
pub async fn ws_connect(base: &str, token: &str) -> WsClient {
    let url = format!("{}/gateway?token={}", base.replace("http://", "ws://"), token);
    let (ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    ws
}

/// Next text frame parsed as JSON, or None after a 3s timeout.
pub async fn recv_json(ws: &mut WsClient) -> Option<Value> {
    match tokio::time::timeout(std::time::Duration::from_secs(3), ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

/// Collect every frame already in flight; stops at the first quiet gap.
pub async fn drain_messages(ws: &mut WsClient) -> Vec<Value> {
    let mut messages = Vec::new();
    while let Ok(Some(Ok(Message::Text(text)))) =
        tokio::time::timeout(std::time::Duration::from_millis(200), ws.next()).await
    {
        if let Ok(v) = serde_json::from_str::<Value>(&text) {
            messages.push(v);
        }
    }
    messages
}

pub async fn send_json(ws: &mut WsClient, value: &Value) {
    ws.send(Message::Text(serde_json::to_string(value).unwrap().into()))
        .await
        .unwrap();
}
