mod server_event;

pub use server_event::ServerEvent;

use serde::Deserialize;

// ── Client → Server Events ──

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The client announces which user it believes it is. The transport
    /// identity established at the handshake stays authoritative; the
    /// claimed id is only compared for logging.
    Identify {
        user_id: i64,
    },
    Join {
        room: String,
    },
    Leave {
        room: String,
    },
    SendMessage {
        room: String,
        text: String,
    },
    DeleteMessage {
        message_id: i64,
    },
    Ping,
}
