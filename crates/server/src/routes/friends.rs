use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::models::{AuthUser, FriendRequestBody, FriendView};
use crate::AppState;

/// GET /api/friends
pub async fn list_friends(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> impl IntoResponse {
    let rows = sqlx::query_as::<_, FriendView>(
        "SELECT f.id,
                u.id AS user_id,
                u.username,
                u.avatar,
                f.status,
                (f.addressee_id = ?1) AS incoming
         FROM friends f
         JOIN users u
           ON u.id = CASE WHEN f.requester_id = ?1 THEN f.addressee_id ELSE f.requester_id END
         WHERE (f.requester_id = ?1 OR f.addressee_id = ?1)
           AND f.status != 'rejected'
         ORDER BY u.username",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    Json(rows).into_response()
}

/// POST /api/friends
pub async fn request_friend(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<FriendRequestBody>,
) -> impl IntoResponse {
    let target = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, username FROM users WHERE username = ? COLLATE NOCASE",
    )
    .bind(body.username.trim())
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten();

    let (target_id, _) = match target {
        Some(t) => t,
        None => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "User not found"})),
            )
                .into_response()
        }
    };

    if target_id == user.id {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Cannot friend yourself"})),
        )
            .into_response();
    }

    // A pending request from the other side counts as mutual consent.
    let reverse = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, status FROM friends WHERE requester_id = ? AND addressee_id = ?",
    )
    .bind(target_id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten();

    if let Some((reverse_id, status)) = reverse {
        if status == "pending" {
            let _ = sqlx::query("UPDATE friends SET status = 'accepted' WHERE id = ?")
                .bind(reverse_id)
                .execute(&state.db)
                .await;
            return Json(serde_json::json!({"id": reverse_id, "status": "accepted"}))
                .into_response();
        }
        if status == "accepted" {
            return (
                StatusCode::CONFLICT,
                Json(serde_json::json!({"error": "Already friends"})),
            )
                .into_response();
        }
    }

    let existing = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, status FROM friends WHERE requester_id = ? AND addressee_id = ?",
    )
    .bind(user.id)
    .bind(target_id)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten();

    if let Some((id, status)) = existing {
        return Json(serde_json::json!({"id": id, "status": status})).into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO friends (requester_id, addressee_id, status, created_at)
         VALUES (?, ?, 'pending', ?)",
    )
    .bind(user.id)
    .bind(target_id)
    .bind(&now)
    .execute(&state.db)
    .await;

    match result {
        Ok(r) => (
            StatusCode::CREATED,
            Json(serde_json::json!({"id": r.last_insert_rowid(), "status": "pending"})),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Failed to create request"})),
        )
            .into_response(),
    }
}

/// POST /api/friends/:friendId/accept
pub async fn accept_friend(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(friend_id): Path<i64>,
) -> impl IntoResponse {
    set_status(&state, friend_id, user.id, "accepted").await
}

/// POST /api/friends/:friendId/reject
pub async fn reject_friend(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(friend_id): Path<i64>,
) -> impl IntoResponse {
    set_status(&state, friend_id, user.id, "rejected").await
}

/// Only the addressee of a pending request may resolve it.
async fn set_status(
    state: &AppState,
    friend_id: i64,
    user_id: i64,
    status: &str,
) -> axum::response::Response {
    let result = sqlx::query(
        "UPDATE friends SET status = ? WHERE id = ? AND addressee_id = ? AND status = 'pending'",
    )
    .bind(status)
    .bind(friend_id)
    .bind(user_id)
    .execute(&state.db)
    .await;

    match result {
        Ok(r) if r.rows_affected() > 0 => {
            Json(serde_json::json!({"id": friend_id, "status": status})).into_response()
        }
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No pending request"})),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Failed to update request"})),
        )
            .into_response(),
    }
}
