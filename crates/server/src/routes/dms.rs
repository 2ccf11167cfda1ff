use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::models::{AuthUser, ConversationEntry, CreateGroupRequest, UpdateGroupRequest};
use crate::AppState;

/// Find-or-create the direct-message room between two users.
///
/// Concurrent calls for the same unordered pair must agree on one room,
/// so the lookup and the insert run inside a single IMMEDIATE
/// transaction: the write lock is taken up front and the existence check
/// is re-run under it, which turns a lost race into a plain lookup hit
/// instead of a duplicate room.
pub async fn ensure_dm_between(db: &SqlitePool, user_a: i64, user_b: i64) -> Result<i64, sqlx::Error> {
    let mut conn = db.acquire().await?;

    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    let result: Result<i64, sqlx::Error> = async {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT dm_id FROM dm_members
             WHERE dm_id IN (SELECT dm_id FROM dm_members WHERE user_id = ?)
               AND dm_id IN (SELECT dm_id FROM dm_members WHERE user_id = ?)
               AND dm_id IN (SELECT id FROM dms WHERE is_group = 0)
             GROUP BY dm_id
             HAVING COUNT(user_id) = 2",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(dm_id) = existing {
            return Ok(dm_id);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let dm_id = sqlx::query("INSERT INTO dms (is_group, created_at) VALUES (0, ?)")
            .bind(&now)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();

        for user_id in [user_a, user_b] {
            sqlx::query("INSERT INTO dm_members (dm_id, user_id) VALUES (?, ?)")
                .bind(dm_id)
                .bind(user_id)
                .execute(&mut *conn)
                .await?;
        }

        Ok(dm_id)
    }
    .await;

    match result {
        Ok(dm_id) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(dm_id)
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(e)
        }
    }
}

/// GET /api/conversations
///
/// DMs are surfaced per accepted friendship (the room itself is created
/// lazily here if it doesn't exist yet), plus every group the user
/// belongs to.
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> impl IntoResponse {
    let mut conversations = Vec::new();

    let friends = sqlx::query_as::<_, (i64, String, Option<String>)>(
        "SELECT u.id, u.username, u.avatar
         FROM users u
         JOIN friends f
           ON ((f.requester_id = ?1 AND f.addressee_id = u.id)
            OR (f.addressee_id = ?1 AND f.requester_id = u.id))
         WHERE f.status = 'accepted'
         ORDER BY u.username",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    for (friend_id, username, avatar) in friends {
        match ensure_dm_between(&state.db, user.id, friend_id).await {
            Ok(dm_id) => conversations.push(ConversationEntry {
                id: dm_id,
                name: username,
                is_group: false,
                avatar,
                is_owner: None,
            }),
            Err(e) => {
                tracing::error!("Failed to resolve DM with user {}: {:?}", friend_id, e);
            }
        }
    }

    let groups = sqlx::query_as::<_, (i64, Option<String>, Option<i64>, Option<String>)>(
        "SELECT d.id, d.name, d.owner_id, d.avatar
         FROM dms d
         JOIN dm_members m ON d.id = m.dm_id
         WHERE m.user_id = ? AND d.is_group = 1
         ORDER BY d.name",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    for (id, name, owner_id, avatar) in groups {
        conversations.push(ConversationEntry {
            id,
            name: name.unwrap_or_else(|| "Group".into()),
            is_group: true,
            avatar,
            is_owner: Some(owner_id == Some(user.id)),
        });
    }

    Json(conversations).into_response()
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateGroupRequest>,
) -> impl IntoResponse {
    let name = body.name.trim().to_string();
    if let Err(e) = courier_shared::validation::validate_room_name(&name) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e}))).into_response();
    }
    if body.members.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Members are required"})),
        )
            .into_response();
    }

    let mut member_ids = std::collections::HashSet::new();
    member_ids.insert(user.id);
    for username in &body.members {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM users WHERE username = ? COLLATE NOCASE",
        )
        .bind(username.trim())
        .fetch_optional(&state.db)
        .await
        .ok()
        .flatten();
        if let Some(id) = id {
            member_ids.insert(id);
        }
    }

    if member_ids.len() < 2 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Could not find any members"})),
        )
            .into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let created: Result<i64, sqlx::Error> = async {
        let mut tx = state.db.begin().await?;

        let dm_id = sqlx::query(
            "INSERT INTO dms (name, is_group, owner_id, created_at) VALUES (?, 1, ?, ?)",
        )
        .bind(&name)
        .bind(user.id)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for member_id in &member_ids {
            sqlx::query("INSERT OR IGNORE INTO dm_members (dm_id, user_id) VALUES (?, ?)")
                .bind(dm_id)
                .bind(member_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(dm_id)
    }
    .await;

    match created {
        Ok(dm_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({"id": dm_id, "name": name})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to create group: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to create group"})),
            )
                .into_response()
        }
    }
}

/// PATCH /api/groups/:groupId
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(group_id): Path<i64>,
    Json(body): Json<UpdateGroupRequest>,
) -> impl IntoResponse {
    let name = body.name.trim().to_string();
    if let Err(e) = courier_shared::validation::validate_room_name(&name) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e}))).into_response();
    }

    if !is_group_owner(&state, group_id, user.id).await {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Group not found or not the owner"})),
        )
            .into_response();
    }

    let _ = sqlx::query("UPDATE dms SET name = ? WHERE id = ?")
        .bind(&name)
        .bind(group_id)
        .execute(&state.db)
        .await;

    Json(serde_json::json!({"id": group_id, "name": name})).into_response()
}

/// DELETE /api/groups/:groupId/members/:userId
pub async fn remove_group_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((group_id, member_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    if !is_group_owner(&state, group_id, user.id).await {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Group not found or not the owner"})),
        )
            .into_response();
    }
    if member_id == user.id {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Cannot remove yourself"})),
        )
            .into_response();
    }

    let _ = sqlx::query("DELETE FROM dm_members WHERE dm_id = ? AND user_id = ?")
        .bind(group_id)
        .bind(member_id)
        .execute(&state.db)
        .await;

    Json(serde_json::json!({"ok": true})).into_response()
}

async fn is_group_owner(state: &AppState, group_id: i64, user_id: i64) -> bool {
    let owner = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT owner_id FROM dms WHERE id = ? AND is_group = 1",
    )
    .bind(group_id)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten()
    .flatten();

    owner == Some(user_id)
}
