use std::fmt;

use sqlx::SqlitePool;

/// A parsed room reference. The wire grammar has exactly two shapes:
/// `server:<serverId>:channel:<channelId>` and `dm:<dmId>`. Anything
/// else is not a room, and callers treat it as an authorization failure
/// rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomRef {
    Channel { server_id: i64, channel_id: i64 },
    Dm { dm_id: i64 },
}

impl RoomRef {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(':');
        match parts.next()? {
            "server" => {
                let server_id = parts.next()?.parse().ok()?;
                if parts.next()? != "channel" {
                    return None;
                }
                let channel_id = parts.next()?.parse().ok()?;
                if parts.next().is_some() {
                    return None;
                }
                Some(Self::Channel {
                    server_id,
                    channel_id,
                })
            }
            "dm" => {
                let dm_id = parts.next()?.parse().ok()?;
                if parts.next().is_some() {
                    return None;
                }
                Some(Self::Dm { dm_id })
            }
            _ => None,
        }
    }

    /// Membership check shared by posting, joining and history reads.
    ///
    /// Channels inherit membership from their owning server; DM and group
    /// rooms carry direct membership rows. Pure read: a query failure
    /// resolves to false, never to an error surfaced to the caller.
    pub async fn can_access(&self, db: &SqlitePool, user_id: i64) -> bool {
        let found = match self {
            Self::Channel { channel_id, .. } => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT 1 FROM server_members sm
                     JOIN channels c ON sm.server_id = c.server_id
                     WHERE c.id = ? AND sm.user_id = ?",
                )
                .bind(channel_id)
                .bind(user_id)
                .fetch_optional(db)
                .await
            }
            Self::Dm { dm_id } => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT 1 FROM dm_members WHERE dm_id = ? AND user_id = ?",
                )
                .bind(dm_id)
                .bind(user_id)
                .fetch_optional(db)
                .await
            }
        };
        matches!(found, Ok(Some(_)))
    }
}

impl fmt::Display for RoomRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel {
                server_id,
                channel_id,
            } => write!(f, "server:{}:channel:{}", server_id, channel_id),
            Self::Dm { dm_id } => write!(f, "dm:{}", dm_id),
        }
    }
}
