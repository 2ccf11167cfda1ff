use serde::{Deserialize, Serialize};

/// Message payload kind. Non-text kinds carry an upload URI as content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Video,
    Audio,
    File,
}

impl ContentType {
    /// Map a classified upload kind back to a typed value.
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "file" => Self::File,
            _ => Self::Text,
        }
    }
}

/// One row of room history as served to clients. Field names match the
/// `message` broadcast event so the client renders both identically.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageView {
    pub id: i64,
    pub sender_id: i64,
    pub username: String,
    pub avatar: Option<String>,
    pub content: Option<String>,
    pub content_type: ContentType,
    pub ts: String,
    pub deleted: bool,
}
