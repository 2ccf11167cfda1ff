use chrono::{SecondsFormat, Utc};

use crate::models::{AuthUser, ContentType};
use crate::room::RoomRef;
use crate::ws::events::ServerEvent;
use crate::AppState;

/// Accept a message intent: authorize, persist, fan out.
///
/// Failures on this path are silent: an unparseable room, an invalid
/// payload, or a membership miss all end the intent with nothing
/// persisted and nothing sent back over the live channel. Denials are
/// logged with actor and room for audit. Callable from the socket send
/// path (text) and from the upload route (media URI payloads).
pub async fn submit_message(
    state: &AppState,
    user: &AuthUser,
    room: &str,
    content: &str,
    content_type: ContentType,
) {
    if courier_shared::validation::validate_message_content(content).is_err() {
        return;
    }
    let Some(room_ref) = RoomRef::parse(room) else {
        return;
    };

    if !room_ref.can_access(&state.db, user.id).await {
        tracing::warn!("User {} tried to post in forbidden room {}", user.id, room_ref);
        return;
    }

    let (channel_id, dm_id) = match room_ref {
        RoomRef::Channel { channel_id, .. } => (Some(channel_id), None),
        RoomRef::Dm { dm_id } => (None, Some(dm_id)),
    };

    // The store assigns both the id and the timestamp; clients never
    // supply either.
    let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    let result = sqlx::query(
        "INSERT INTO messages (channel_id, dm_id, sender_id, content, content_type, ts)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(channel_id)
    .bind(dm_id)
    .bind(user.id)
    .bind(content)
    .bind(content_type)
    .bind(&ts)
    .execute(&state.db)
    .await;

    let id = match result {
        Ok(r) => r.last_insert_rowid(),
        Err(e) => {
            tracing::error!("Failed to insert message: {:?}", e);
            return;
        }
    };

    let event = ServerEvent::Message {
        id,
        sender_id: user.id,
        username: user.username.clone(),
        avatar: user.avatar.clone(),
        content: content.to_string(),
        content_type,
        ts,
        deleted: false,
    };

    state.gateway.broadcast_room(&room_ref, &event).await;
}

/// Tombstone a message the caller sent. Deleting a missing or
/// already-deleted message is a no-op; deleting someone else's message is
/// silently refused. The wipe is destructive: content is cleared for good
/// and the type resets to text, while the row survives so history can
/// render a placeholder.
pub async fn delete_message(state: &AppState, user: &AuthUser, message_id: i64) {
    let row = sqlx::query_as::<_, (i64, Option<i64>, Option<i64>, bool)>(
        "SELECT sender_id, channel_id, dm_id, deleted FROM messages WHERE id = ?",
    )
    .bind(message_id)
    .fetch_optional(&state.db)
    .await
    .ok()
    .flatten();

    let Some((sender_id, channel_id, dm_id, deleted)) = row else {
        return;
    };
    if deleted {
        return;
    }
    if sender_id != user.id {
        tracing::warn!(
            "User {} tried to delete message {} sent by {}",
            user.id,
            message_id,
            sender_id
        );
        return;
    }

    let result = sqlx::query(
        "UPDATE messages SET deleted = 1, content = NULL, content_type = 'text' WHERE id = ?",
    )
    .bind(message_id)
    .execute(&state.db)
    .await;

    if let Err(e) = result {
        tracing::error!("Failed to tombstone message {}: {:?}", message_id, e);
        return;
    }

    let event = ServerEvent::MessageDeleted { message_id };
    if let Some(channel_id) = channel_id {
        state.gateway.broadcast_channel(channel_id, &event).await;
    } else if let Some(dm_id) = dm_id {
        state.gateway.broadcast_dm(dm_id, &event).await;
    }
}
