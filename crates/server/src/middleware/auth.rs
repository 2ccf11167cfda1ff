use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::models::AuthUser;
use crate::AppState;

/// Pull the session token out of a cookie header or an Authorization
/// Bearer header.
fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string());

    let cookie = parts
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .filter_map(|c| {
            let c = c.trim();
            c.strip_prefix("session_token=").map(|t| t.to_string())
        })
        .next();

    bearer.or(cookie).filter(|t| !t.is_empty())
}

/// Resolve a session token to the user it belongs to, honoring expiry.
pub async fn resolve_session(db: &sqlx::SqlitePool, token: &str) -> Option<AuthUser> {
    let row = sqlx::query_as::<_, (i64, String, Option<String>, String)>(
        "SELECT u.id, u.username, u.avatar, s.expires_at
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token = ?",
    )
    .bind(token)
    .fetch_optional(db)
    .await
    .ok()??;

    let now = chrono::Utc::now().to_rfc3339();
    if row.3 < now {
        return None;
    }

    Some(AuthUser {
        id: row.0,
        username: row.1,
        avatar: row.2,
    })
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = match token_from_parts(parts) {
            Some(t) => t,
            None => {
                return Err((
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": "Not authenticated"})),
                )
                    .into_response())
            }
        };

        match resolve_session(&state.db, &token).await {
            Some(user) => Ok(user),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Invalid session"})),
            )
                .into_response()),
        }
    }
}
