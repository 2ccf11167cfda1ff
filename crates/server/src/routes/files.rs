use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::models::{AuthUser, ContentType};
use crate::ws::handler::chat;
use crate::AppState;

/// POST /api/upload
///
/// The one submit path that surfaces errors: file-type and size
/// validation happen here, synchronously, before any message intent is
/// created. Once the file is on disk the minted URI goes through the
/// same broadcaster as a typed text message would.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut room: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut data: Option<axum::body::Bytes> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("room") => {
                room = field.text().await.ok();
            }
            Some("file") => {
                filename = field.file_name().map(|f| f.to_string());
                data = field.bytes().await.ok();
            }
            _ => {}
        }
    }

    let (room, filename, data) = match (room, filename, data) {
        (Some(r), Some(f), Some(d)) if !r.is_empty() => (r, f, d),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"ok": false, "error": "File or room missing"})),
            )
                .into_response()
        }
    };

    if !courier_shared::validation::is_allowed_upload(&filename) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"ok": false, "error": "File type not allowed"})),
        )
            .into_response();
    }

    if data.len() as u64 > state.config.max_upload_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(serde_json::json!({
                "ok": false,
                "error": format!("File too large. Max size: {} MB", state.config.max_upload_bytes / 1_048_576)
            })),
        )
            .into_response();
    }

    // Stored under a fresh name; the original is only used for
    // classification and its extension.
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or("bin")
        .to_ascii_lowercase();
    let stored_filename = format!("file_{}.{}", uuid::Uuid::new_v4().simple(), ext);

    if tokio::fs::create_dir_all(&state.config.upload_dir).await.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"ok": false, "error": "Failed to save file"})),
        )
            .into_response();
    }
    let file_path = std::path::Path::new(&state.config.upload_dir).join(&stored_filename);
    if tokio::fs::write(&file_path, &data).await.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"ok": false, "error": "Failed to save file"})),
        )
            .into_response();
    }

    let url = format!("/uploads/{}", stored_filename);
    let content_type = ContentType::from_kind(courier_shared::validation::media_kind(&filename));

    chat::submit_message(&state, &user, &room, &url, content_type).await;

    Json(serde_json::json!({"ok": true, "url": url})).into_response()
}

/// GET /uploads/:filename
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    // Stored names are flat; anything trying to path-escape is not ours.
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "File not found"})),
        )
            .into_response();
    }

    let file_path = std::path::Path::new(&state.config.upload_dir).join(&filename);
    let file = match tokio::fs::File::open(&file_path).await {
        Ok(f) => f,
        Err(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "File not found"})),
            )
                .into_response()
        }
    };

    let mime = mime_for(&filename);
    let stream = ReaderStream::new(file);
    (
        [(header::CONTENT_TYPE, mime)],
        Body::from_stream(stream),
    )
        .into_response()
}

fn mime_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().unwrap_or("") {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
