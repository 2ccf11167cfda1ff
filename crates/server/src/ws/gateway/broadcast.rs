use super::GatewayState;
use crate::room::RoomRef;
use crate::ws::events::ServerEvent;

impl GatewayState {
    /// Fan an event out to every current subscriber of a room. Delivery
    /// per subscriber is a non-blocking queue push; a closed or saturated
    /// receiver loses the event without delaying anyone else.
    pub async fn broadcast_room(&self, room: &RoomRef, event: &ServerEvent) {
        match room {
            RoomRef::Channel { channel_id, .. } => {
                self.broadcast_channel(*channel_id, event).await
            }
            RoomRef::Dm { dm_id } => self.broadcast_dm(*dm_id, event).await,
        }
    }

    pub async fn broadcast_channel(&self, channel_id: i64, event: &ServerEvent) {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return,
        };

        let subs = self.channel_subs.read().await;
        let clients = self.clients.read().await;

        if let Some(subscriber_ids) = subs.get(&channel_id) {
            for &cid in subscriber_ids {
                if let Some(client) = clients.get(&cid) {
                    let _ = client.tx.send(msg.clone());
                }
            }
        }
    }

    pub async fn broadcast_dm(&self, dm_id: i64, event: &ServerEvent) {
        let msg = match serde_json::to_string(event) {
            Ok(m) => m,
            Err(_) => return,
        };

        let subs = self.dm_subs.read().await;
        let clients = self.clients.read().await;

        if let Some(subscriber_ids) = subs.get(&dm_id) {
            for &cid in subscriber_ids {
                if let Some(client) = clients.get(&cid) {
                    let _ = client.tx.send(msg.clone());
                }
            }
        }
    }
}
