use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use courier_shared::constants::HISTORY_LIMIT;

use crate::models::{AuthUser, MessageView};
use crate::room::RoomRef;
use crate::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub room: Option<String>,
}

/// GET /api/history?room=<ref>
///
/// Gated by the same membership rule as posting. A missing, malformed or
/// forbidden room yields an empty list; history never reveals whether a
/// room exists. Returns the most recent messages in ascending timestamp
/// order; tombstoned rows are included but carry no content.
pub async fn history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let empty: Vec<MessageView> = Vec::new();

    let Some(room) = query.room else {
        return Json(empty).into_response();
    };
    let Some(room_ref) = RoomRef::parse(&room) else {
        return Json(empty).into_response();
    };

    if !room_ref.can_access(&state.db, user.id).await {
        tracing::warn!("User {} denied history of room {}", user.id, room_ref);
        return Json(empty).into_response();
    }

    let condition = match room_ref {
        RoomRef::Channel { .. } => "m.channel_id = ?",
        RoomRef::Dm { .. } => "m.dm_id = ?",
    };
    let room_id = match room_ref {
        RoomRef::Channel { channel_id, .. } => channel_id,
        RoomRef::Dm { dm_id } => dm_id,
    };

    // Latest window first, then re-sorted ascending for rendering.
    // Senders whose accounts are gone render with a placeholder name.
    let sql = format!(
        "SELECT * FROM (
            SELECT m.id, m.sender_id,
                   COALESCE(u.username, 'deleted') AS username,
                   u.avatar,
                   m.content, m.content_type, m.ts, m.deleted
            FROM messages m
            LEFT JOIN users u ON u.id = m.sender_id
            WHERE {condition}
            ORDER BY m.id DESC
            LIMIT {HISTORY_LIMIT}
        ) ORDER BY id ASC"
    );

    let messages = sqlx::query_as::<_, MessageView>(&sql)
        .bind(room_id)
        .fetch_all(&state.db)
        .await
        .unwrap_or_default();

    Json(messages).into_response()
}
