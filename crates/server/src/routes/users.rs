use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::models::{AuthUser, SessionUser, UpdateUserRequest};
use crate::AppState;

/// GET /api/users/me
pub async fn get_me(user: AuthUser) -> impl IntoResponse {
    Json(SessionUser {
        id: user.id,
        username: user.username,
        avatar: user.avatar,
    })
}

/// PATCH /api/users/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    if let Some(username) = &body.username {
        let username = username.trim();
        if let Err(e) = courier_shared::validation::validate_username(username) {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e})))
                .into_response();
        }

        if !username.eq_ignore_ascii_case(&user.username) {
            let taken = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM users WHERE username = ? COLLATE NOCASE AND id != ?",
            )
            .bind(username)
            .bind(user.id)
            .fetch_one(&state.db)
            .await
            .unwrap_or(0);

            if taken > 0 {
                return (
                    StatusCode::CONFLICT,
                    Json(serde_json::json!({"error": "Username already taken"})),
                )
                    .into_response();
            }
        }

        let _ = sqlx::query("UPDATE users SET username = ? WHERE id = ?")
            .bind(username)
            .bind(user.id)
            .execute(&state.db)
            .await;
    }

    if let Some(avatar) = &body.avatar {
        let _ = sqlx::query("UPDATE users SET avatar = ? WHERE id = ?")
            .bind(avatar)
            .bind(user.id)
            .execute(&state.db)
            .await;
    }

    if let Some(banner) = &body.banner {
        let _ = sqlx::query("UPDATE users SET banner = ? WHERE id = ?")
            .bind(banner)
            .bind(user.id)
            .execute(&state.db)
            .await;
    }

    let updated = sqlx::query_as::<_, (i64, String, Option<String>)>(
        "SELECT id, username, avatar FROM users WHERE id = ?",
    )
    .bind(user.id)
    .fetch_one(&state.db)
    .await;

    match updated {
        Ok((id, username, avatar)) => Json(SessionUser {
            id,
            username,
            avatar,
        })
        .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Failed to load profile"})),
        )
            .into_response(),
    }
}

/// DELETE /api/users/me
///
/// Removes the account row. Sessions, friendships, memberships and owned
/// servers go with it (schema cascades); group ownership reverts to
/// nobody; messages sent in surviving rooms stay behind as orphans and
/// render with a placeholder author.
pub async fn delete_me(State(state): State<Arc<AppState>>, user: AuthUser) -> impl IntoResponse {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user.id)
        .execute(&state.db)
        .await;

    match result {
        Ok(_) => {
            tracing::info!("User {} deleted their account", user.id);
            Json(serde_json::json!({"ok": true})).into_response()
        }
        Err(e) => {
            tracing::error!("Account deletion failed for user {}: {:?}", user.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to delete account"})),
            )
                .into_response()
        }
    }
}
