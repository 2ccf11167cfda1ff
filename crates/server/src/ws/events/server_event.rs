use serde::Serialize;

use crate::models::ContentType;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A freshly persisted message, fanned out to every subscriber of its
    /// room, the sender included. Clients render from the broadcast.
    Message {
        id: i64,
        sender_id: i64,
        username: String,
        avatar: Option<String>,
        content: String,
        content_type: ContentType,
        ts: String,
        deleted: bool,
    },
    MessageDeleted {
        message_id: i64,
    },
}
