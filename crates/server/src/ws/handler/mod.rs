pub mod chat;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::middleware::auth::resolve_session;
use crate::models::{AuthUser, ContentType};
use crate::room::RoomRef;
use crate::ws::events::ClientEvent;
use crate::ws::gateway::ClientId;
use crate::AppState;

/// WebSocket upgrade handler. Identity is bound to the connection here,
/// at handshake time; nothing a client sends later can change it.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    query: axum::extract::Query<std::collections::HashMap<String, String>>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let auth_user = extract_session(&state, &headers, &query).await;
    ws.on_upgrade(move |socket| handle_socket(socket, state, auth_user))
}

async fn extract_session(
    state: &AppState,
    headers: &axum::http::HeaderMap,
    query: &std::collections::HashMap<String, String>,
) -> Option<AuthUser> {
    let token_from_query = query.get("token").cloned();

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string());

    let token_from_cookie = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .filter_map(|c| {
            let c = c.trim();
            c.strip_prefix("session_token=").map(|t| t.to_string())
        })
        .next();

    let token = token_from_query.or(auth_header).or(token_from_cookie)?;
    if token.is_empty() {
        return None;
    }

    resolve_session(&state.db, &token).await
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, auth_user: Option<AuthUser>) {
    let user = match auth_user {
        Some(u) => u,
        None => return,
    };

    let client_id = state.gateway.next_client_id().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    state.gateway.register(client_id, user.id, tx).await;

    tracing::info!("Client {} connected as user {}", client_id, user.id);

    // Task to forward messages from mpsc to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive loop
    let state_clone = state.clone();
    let user_clone = user.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    let text_str: &str = &text;
                    if let Ok(event) = serde_json::from_str::<ClientEvent>(text_str) {
                        handle_client_event(&state_clone, client_id, &user_clone, event).await;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.gateway.unregister(client_id).await;
    tracing::info!("Client {} disconnected (user {})", client_id, user.id);
}

async fn handle_client_event(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Identify { user_id } => {
            if user_id == user.id {
                tracing::info!("User {} identified on client {}", user.id, client_id);
            } else {
                tracing::warn!(
                    "Client {} claimed user {} but is authenticated as {}",
                    client_id,
                    user_id,
                    user.id
                );
            }
        }
        ClientEvent::Join { room } => {
            let Some(room_ref) = RoomRef::parse(&room) else {
                return;
            };
            if !room_ref.can_access(&state.db, user.id).await {
                tracing::warn!("User {} denied join of room {}", user.id, room_ref);
                return;
            }
            // One current room per session: switching in means leaving
            // whatever was joined before.
            state.gateway.unsubscribe_all(client_id).await;
            state.gateway.subscribe(client_id, &room_ref).await;
        }
        ClientEvent::Leave { room } => {
            if let Some(room_ref) = RoomRef::parse(&room) {
                state.gateway.unsubscribe(client_id, &room_ref).await;
            }
        }
        ClientEvent::SendMessage { room, text } => {
            chat::submit_message(state, user, &room, &text, ContentType::Text).await;
        }
        ClientEvent::DeleteMessage { message_id } => {
            chat::delete_message(state, user, message_id).await;
        }
        ClientEvent::Ping => {}
    }
}
