use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::Arc;

use argon2::{PasswordHasher, PasswordVerifier};

use crate::models::{AuthUser, LoginRequest, RegisterRequest, SessionResponse, SessionUser};
use crate::AppState;

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> impl IntoResponse {
    let username = body.username.trim().to_string();

    if let Err(e) = courier_shared::validation::validate_username(&username) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e}))).into_response();
    }
    if let Err(e) = courier_shared::validation::validate_password(&body.password) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e}))).into_response();
    }

    // Usernames are unique case-insensitively
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE username = ? COLLATE NOCASE",
    )
    .bind(&username)
    .fetch_one(&state.db)
    .await
    .unwrap_or(0);

    if exists > 0 {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": "Username already taken"})),
        )
            .into_response();
    }

    let salt = argon2::password_hash::SaltString::generate(&mut rand::rngs::OsRng);
    let password_hash = match argon2::Argon2::default().hash_password(body.password.as_bytes(), &salt)
    {
        Ok(h) => h.to_string(),
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to hash password"})),
            )
                .into_response()
        }
    };

    let now = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
    )
    .bind(&username)
    .bind(&password_hash)
    .bind(&now)
    .execute(&state.db)
    .await;

    let user_id = match result {
        Ok(r) => r.last_insert_rowid(),
        Err(_) => {
            // Unique index race: two registrations for the same name
            return (
                StatusCode::CONFLICT,
                Json(serde_json::json!({"error": "Username already taken"})),
            )
                .into_response();
        }
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({"id": user_id, "username": username})),
    )
        .into_response()
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> impl IntoResponse {
    let username = body.username.trim();

    let user = sqlx::query_as::<_, (i64, String, String, Option<String>)>(
        "SELECT id, username, password_hash, avatar FROM users WHERE username = ? COLLATE NOCASE",
    )
    .bind(username)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten();

    let (user_id, username, stored_hash, avatar) = match user {
        Some(u) => u,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Invalid credentials"})),
            )
                .into_response()
        }
    };

    let parsed_hash = match argon2::PasswordHash::new(&stored_hash) {
        Ok(h) => h,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Internal error"})),
            )
                .into_response()
        }
    };

    if argon2::Argon2::default()
        .verify_password(body.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Invalid credentials"})),
        )
            .into_response();
    }

    let token = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(30)).to_rfc3339();

    let result = sqlx::query(
        "INSERT INTO sessions (user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&token)
    .bind(&expires_at)
    .bind(&now)
    .execute(&state.db)
    .await;

    if result.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "Failed to create session"})),
        )
            .into_response();
    }

    let cookie = Cookie::build(("session_token", token.clone()))
        .path("/")
        .http_only(true)
        .build();

    (
        jar.add(cookie),
        Json(SessionResponse {
            user: SessionUser {
                id: user_id,
                username,
                avatar,
            },
            token: Some(token),
        }),
    )
        .into_response()
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .or_else(|| jar.get("session_token").map(|c| c.value().to_string()));

    if let Some(token) = token {
        let _ = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(&token)
            .execute(&state.db)
            .await;
    }

    let jar = jar.remove(Cookie::build(("session_token", "")).path("/").build());
    (jar, Json(serde_json::json!({"ok": true}))).into_response()
}

/// GET /api/auth/session
pub async fn get_session(user: AuthUser) -> impl IntoResponse {
    Json(SessionUser {
        id: user.id,
        username: user.username,
        avatar: user.avatar,
    })
}
