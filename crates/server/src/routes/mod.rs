pub mod auth;
pub mod dms;
pub mod files;
pub mod friends;
pub mod messages;
pub mod servers;
pub mod users;

use crate::ws;
use crate::AppState;
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::get_session));

    let api_routes = Router::new()
        // Users
        .route("/users/me", get(users::get_me))
        .route("/users/me", patch(users::update_me))
        .route("/users/me", delete(users::delete_me))
        // Servers
        .route("/servers", post(servers::create_server))
        .route("/servers", get(servers::list_servers))
        .route("/servers/{serverId}", get(servers::get_server))
        .route("/servers/{serverId}/channels", post(servers::create_channel))
        .route("/servers/{serverId}/invites", post(servers::create_invite))
        .route("/invites/{token}/accept", post(servers::accept_invite))
        // Friends
        .route("/friends", get(friends::list_friends))
        .route("/friends", post(friends::request_friend))
        .route("/friends/{friendId}/accept", post(friends::accept_friend))
        .route("/friends/{friendId}/reject", post(friends::reject_friend))
        // Conversations & groups
        .route("/conversations", get(dms::list_conversations))
        .route("/groups", post(dms::create_group))
        .route("/groups/{groupId}", patch(dms::update_group))
        .route(
            "/groups/{groupId}/members/{userId}",
            delete(dms::remove_group_member),
        )
        // History
        .route("/history", get(messages::history))
        // Files
        .route("/upload", post(files::upload));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .route("/uploads/{filename}", get(files::serve_upload))
        .route("/gateway", get(ws::handler::ws_handler))
        .with_state(state)
}
