#![allow(dead_code)]

pub mod ws_helpers;

use axum::Router;
use courier_server::{config::Config, db, routes, ws, AppState};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

use argon2::PasswordHasher;

/// Create an in-memory SQLite pool with schema applied.
pub async fn setup_test_db() -> SqlitePool {
    let options: SqliteConnectOptions = "sqlite::memory:".parse().unwrap();
    let options = options.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory SQLite pool");

    db::apply_schema(&pool).await.expect("Failed to apply schema");

    pool
}

/// Build the shared application state over the given pool.
pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    Arc::new(AppState {
        db: pool,
        config: Config {
            host: "127.0.0.1".into(),
            port: 0,
            database_path: ":memory:".into(),
            upload_dir: "/tmp/courier-test-uploads".into(),
            max_upload_bytes: 10_485_760,
        },
        gateway: Arc::new(ws::gateway::GatewayState::new()),
    })
}

/// Build a test Axum app with the given pool.
pub fn create_test_app(pool: SqlitePool) -> Router {
    routes::build_router(create_test_state(pool))
}

/// Create a test user directly in the database. Returns (user_id, session_token).
pub async fn create_test_user(pool: &SqlitePool, username: &str, password: &str) -> (i64, String) {
    let now = chrono::Utc::now().to_rfc3339();

    let salt = argon2::password_hash::SaltString::generate(&mut rand::rngs::OsRng);
    let password_hash = argon2::Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string();

    let user_id = sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
        .bind(username)
        .bind(&password_hash)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

    let token = uuid::Uuid::new_v4().to_string();
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(30)).to_rfc3339();

    sqlx::query("INSERT INTO sessions (user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(user_id)
        .bind(&token)
        .bind(&expires_at)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();

    (user_id, token)
}

/// Create a server with owner membership and its default channel.
/// Returns (server_id, general_channel_id).
pub async fn create_test_server(pool: &SqlitePool, owner_id: i64, name: &str) -> (i64, i64) {
    let now = chrono::Utc::now().to_rfc3339();

    let server_id = sqlx::query("INSERT INTO servers (name, owner_id, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(owner_id)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

    sqlx::query("INSERT INTO server_members (server_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(server_id)
        .bind(owner_id)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();

    let channel_id =
        sqlx::query("INSERT INTO channels (server_id, name, created_at) VALUES (?, 'general', ?)")
            .bind(server_id)
            .bind(&now)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid();

    (server_id, channel_id)
}

/// Add a member to a server.
pub async fn add_member(pool: &SqlitePool, server_id: i64, user_id: i64) {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("INSERT INTO server_members (server_id, user_id, joined_at) VALUES (?, ?, ?)")
        .bind(server_id)
        .bind(user_id)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
}

/// Create a two-person DM room directly. Returns the dm id.
pub async fn create_test_dm(pool: &SqlitePool, user_a: i64, user_b: i64) -> i64 {
    let now = chrono::Utc::now().to_rfc3339();
    let dm_id = sqlx::query("INSERT INTO dms (is_group, created_at) VALUES (0, ?)")
        .bind(&now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

    for user_id in [user_a, user_b] {
        sqlx::query("INSERT INTO dm_members (dm_id, user_id) VALUES (?, ?)")
            .bind(dm_id)
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap();
    }

    dm_id
}

/// Create a friendship row with the given status.
pub async fn create_friendship(pool: &SqlitePool, requester: i64, addressee: i64, status: &str) {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO friends (requester_id, addressee_id, status, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(requester)
    .bind(addressee)
    .bind(status)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();
}
