use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::models::{
    AuthUser, Channel, CreateChannelRequest, CreateInviteRequest, CreateServerRequest, Server,
    ServerInfo,
};
use crate::AppState;

/// POST /api/servers
///
/// A server, its owner membership and its "general" channel come into
/// existence in one transaction; there is no window where a server has
/// no default channel.
pub async fn create_server(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateServerRequest>,
) -> impl IntoResponse {
    let name = body.name.trim().to_string();
    if let Err(e) = courier_shared::validation::validate_room_name(&name) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e}))).into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();

    let created: Result<(i64, i64), sqlx::Error> = async {
        let mut tx = state.db.begin().await?;

        let server_id = sqlx::query("INSERT INTO servers (name, owner_id, created_at) VALUES (?, ?, ?)")
            .bind(&name)
            .bind(user.id)
            .bind(&now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query("INSERT INTO server_members (server_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(server_id)
            .bind(user.id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        let channel_id =
            sqlx::query("INSERT INTO channels (server_id, name, created_at) VALUES (?, 'general', ?)")
                .bind(server_id)
                .bind(&now)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

        tx.commit().await?;
        Ok((server_id, channel_id))
    }
    .await;

    match created {
        Ok((server_id, channel_id)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": server_id,
                "name": name,
                "defaultChannelId": channel_id,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to create server: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to create server"})),
            )
                .into_response()
        }
    }
}

/// GET /api/servers
pub async fn list_servers(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> impl IntoResponse {
    let servers = sqlx::query_as::<_, Server>(
        "SELECT s.id, s.name, s.owner_id, s.avatar, s.description, s.created_at
         FROM servers s
         JOIN server_members m ON s.id = m.server_id
         WHERE m.user_id = ?
         ORDER BY s.name",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    Json(servers).into_response()
}

/// GET /api/servers/:serverId
pub async fn get_server(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(server_id): Path<i64>,
) -> impl IntoResponse {
    if !is_member(&state, server_id, user.id).await {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Not a member of this server"})),
        )
            .into_response();
    }

    let server = sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE id = ?")
        .bind(server_id)
        .fetch_optional(&state.db)
        .await
        .ok()
        .flatten();

    let server = match server {
        Some(s) => s,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "Server not found"})),
            )
                .into_response()
        }
    };

    let channels = sqlx::query_as::<_, Channel>(
        "SELECT * FROM channels WHERE server_id = ? ORDER BY name",
    )
    .bind(server_id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    let is_owner = server.owner_id == user.id;
    Json(ServerInfo {
        server,
        is_owner,
        channels,
    })
    .into_response()
}

/// POST /api/servers/:serverId/channels
pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(server_id): Path<i64>,
    Json(body): Json<CreateChannelRequest>,
) -> impl IntoResponse {
    let name = body.name.trim().to_string();
    if let Err(e) = courier_shared::validation::validate_room_name(&name) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e}))).into_response();
    }

    let owner_id = sqlx::query_scalar::<_, i64>("SELECT owner_id FROM servers WHERE id = ?")
        .bind(server_id)
        .fetch_optional(&state.db)
        .await
        .ok()
        .flatten();

    if owner_id != Some(user.id) {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Only the owner can create channels"})),
        )
            .into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query("INSERT INTO channels (server_id, name, created_at) VALUES (?, ?, ?)")
        .bind(server_id)
        .bind(&name)
        .bind(&now)
        .execute(&state.db)
        .await;

    match result {
        Ok(r) => (
            StatusCode::CREATED,
            Json(serde_json::json!({"id": r.last_insert_rowid(), "name": name})),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Failed to create channel"})),
        )
            .into_response(),
    }
}

/// POST /api/servers/:serverId/invites
pub async fn create_invite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(server_id): Path<i64>,
    Json(body): Json<CreateInviteRequest>,
) -> impl IntoResponse {
    if !is_member(&state, server_id, user.id).await {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Not a member of this server"})),
        )
            .into_response();
    }

    let token = nanoid::nanoid!(12);
    let now = chrono::Utc::now().to_rfc3339();
    let expires_at = body
        .expires_in_days
        .map(|days| (chrono::Utc::now() + chrono::Duration::days(days)).to_rfc3339());

    let result = sqlx::query(
        "INSERT INTO invites (server_id, token, creator_id, created_at, expires_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(server_id)
    .bind(&token)
    .bind(user.id)
    .bind(&now)
    .bind(&expires_at)
    .execute(&state.db)
    .await;

    match result {
        Ok(_) => (
            StatusCode::CREATED,
            Json(serde_json::json!({"token": token, "expiresAt": expires_at})),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Failed to create invite"})),
        )
            .into_response(),
    }
}

/// POST /api/invites/:token/accept
///
/// Joining through an invite is idempotent: accepting twice leaves one
/// membership row.
pub async fn accept_invite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(token): Path<String>,
) -> impl IntoResponse {
    let invite = sqlx::query_as::<_, (i64, Option<String>)>(
        "SELECT server_id, expires_at FROM invites WHERE token = ?",
    )
    .bind(&token)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten();

    let (server_id, expires_at) = match invite {
        Some(i) => i,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "Invite not found"})),
            )
                .into_response()
        }
    };

    if let Some(expires_at) = expires_at {
        if expires_at < chrono::Utc::now().to_rfc3339() {
            return (
                StatusCode::GONE,
                Json(serde_json::json!({"error": "Invite expired"})),
            )
                .into_response();
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let _ = sqlx::query(
        "INSERT OR IGNORE INTO server_members (server_id, user_id, joined_at) VALUES (?, ?, ?)",
    )
    .bind(server_id)
    .bind(user.id)
    .bind(&now)
    .execute(&state.db)
    .await;

    Json(serde_json::json!({"ok": true, "serverId": server_id})).into_response()
}

async fn is_member(state: &AppState, server_id: i64, user_id: i64) -> bool {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM server_members WHERE server_id = ? AND user_id = ?",
    )
    .bind(server_id)
    .bind(user_id)
    .fetch_one(&state.db)
    .await
    .unwrap_or(0)
        > 0
}
