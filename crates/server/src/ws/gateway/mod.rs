mod broadcast;

use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};

use crate::room::RoomRef;

pub type ClientId = u64;

pub struct ConnectedClient {
    pub user_id: i64,
    pub tx: mpsc::UnboundedSender<String>,
    pub subscribed_channels: HashSet<i64>,
    pub subscribed_dms: HashSet<i64>,
}

/// Process-local registry of live connections and their room
/// subscriptions. Mutated concurrently by every session's join/leave and
/// disconnect cleanup, read by the broadcaster on every fan-out. Rooms
/// are keyed by their numeric id after parsing, never by the raw wire
/// string.
pub struct GatewayState {
    next_id: RwLock<u64>,
    pub clients: RwLock<HashMap<ClientId, ConnectedClient>>,
    pub channel_subs: RwLock<HashMap<i64, HashSet<ClientId>>>,
    pub dm_subs: RwLock<HashMap<i64, HashSet<ClientId>>>,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayState {
    pub fn new() -> Self {
        Self {
            next_id: RwLock::new(1),
            clients: RwLock::new(HashMap::new()),
            channel_subs: RwLock::new(HashMap::new()),
            dm_subs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn next_client_id(&self) -> ClientId {
        let mut id = self.next_id.write().await;
        let current = *id;
        *id += 1;
        current
    }

    pub async fn register(&self, client_id: ClientId, user_id: i64, tx: mpsc::UnboundedSender<String>) {
        let client = ConnectedClient {
            user_id,
            tx,
            subscribed_channels: HashSet::new(),
            subscribed_dms: HashSet::new(),
        };
        self.clients.write().await.insert(client_id, client);
    }

    /// Remove a client and purge it from every room it was subscribed to.
    /// Runs on every exit path; no dangling subscriptions survive a
    /// disconnect.
    pub async fn unregister(&self, client_id: ClientId) -> Option<ConnectedClient> {
        let client = self.clients.write().await.remove(&client_id)?;

        let mut ch_subs = self.channel_subs.write().await;
        for channel_id in &client.subscribed_channels {
            if let Some(set) = ch_subs.get_mut(channel_id) {
                set.remove(&client_id);
                if set.is_empty() {
                    ch_subs.remove(channel_id);
                }
            }
        }
        drop(ch_subs);

        let mut dm_subs = self.dm_subs.write().await;
        for dm_id in &client.subscribed_dms {
            if let Some(set) = dm_subs.get_mut(dm_id) {
                set.remove(&client_id);
                if set.is_empty() {
                    dm_subs.remove(dm_id);
                }
            }
        }

        Some(client)
    }

    pub async fn subscribe_channel(&self, client_id: ClientId, channel_id: i64) {
        self.channel_subs
            .write()
            .await
            .entry(channel_id)
            .or_default()
            .insert(client_id);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.subscribed_channels.insert(channel_id);
        }
    }

    pub async fn unsubscribe_channel(&self, client_id: ClientId, channel_id: i64) {
        let mut subs = self.channel_subs.write().await;
        if let Some(set) = subs.get_mut(&channel_id) {
            set.remove(&client_id);
            if set.is_empty() {
                subs.remove(&channel_id);
            }
        }
        drop(subs);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.subscribed_channels.remove(&channel_id);
        }
    }

    pub async fn subscribe_dm(&self, client_id: ClientId, dm_id: i64) {
        self.dm_subs
            .write()
            .await
            .entry(dm_id)
            .or_default()
            .insert(client_id);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.subscribed_dms.insert(dm_id);
        }
    }

    pub async fn unsubscribe_dm(&self, client_id: ClientId, dm_id: i64) {
        let mut subs = self.dm_subs.write().await;
        if let Some(set) = subs.get_mut(&dm_id) {
            set.remove(&client_id);
            if set.is_empty() {
                subs.remove(&dm_id);
            }
        }
        drop(subs);

        if let Some(client) = self.clients.write().await.get_mut(&client_id) {
            client.subscribed_dms.remove(&dm_id);
        }
    }

    /// Subscribe to a parsed room. Idempotent: a client already present
    /// in the room's set stays there.
    pub async fn subscribe(&self, client_id: ClientId, room: &RoomRef) {
        match room {
            RoomRef::Channel { channel_id, .. } => {
                self.subscribe_channel(client_id, *channel_id).await
            }
            RoomRef::Dm { dm_id } => self.subscribe_dm(client_id, *dm_id).await,
        }
    }

    pub async fn unsubscribe(&self, client_id: ClientId, room: &RoomRef) {
        match room {
            RoomRef::Channel { channel_id, .. } => {
                self.unsubscribe_channel(client_id, *channel_id).await
            }
            RoomRef::Dm { dm_id } => self.unsubscribe_dm(client_id, *dm_id).await,
        }
    }

    /// Drop every subscription this client holds. The reference client
    /// keeps one current room, so a join implicitly leaves whatever came
    /// before.
    pub async fn unsubscribe_all(&self, client_id: ClientId) {
        let (channels, dms) = {
            let clients = self.clients.read().await;
            match clients.get(&client_id) {
                Some(c) => (
                    c.subscribed_channels.iter().copied().collect::<Vec<_>>(),
                    c.subscribed_dms.iter().copied().collect::<Vec<_>>(),
                ),
                None => return,
            }
        };
        for channel_id in channels {
            self.unsubscribe_channel(client_id, channel_id).await;
        }
        for dm_id in dms {
            self.unsubscribe_dm(client_id, dm_id).await;
        }
    }
}
