use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use tundavala_types::events::GatewayEvent;

/// Manages all connected clients and delivers live updates.
///
/// Conversation-scoped events (new messages) go through the broadcast
/// channel; each connection filters against its subscribed conversations.
/// Inbox updates, notifications and wallet changes are targeted through
/// per-user channels, so only the affected user receives them.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for conversation-scoped events
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                user_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to broadcast events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast a conversation-scoped event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    /// A reconnect replaces the previous registration for that user.
    pub async fn register_user_channel(
        &self,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches —
    /// a newer connection may already own the slot.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id)
            && *stored_conn_id == conn_id
        {
            channels.remove(&user_id);
        }
    }

    /// Send a targeted event to a specific user. Dropped silently when the
    /// user has no live connection; they catch up from the store on next load.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(&user_id) {
            let _ = tx.send(event);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tundavala_types::events::GatewayEvent;

    fn ready(user_id: Uuid) -> GatewayEvent {
        GatewayEvent::Ready {
            user_id,
            name: "Ana".to_string(),
        }
    }

    #[tokio::test]
    async fn targeted_send_reaches_only_the_owner() {
        let dispatcher = Dispatcher::new();
        let ana = Uuid::new_v4();
        let zeferino = Uuid::new_v4();

        let (_, mut ana_rx) = dispatcher.register_user_channel(ana).await;
        let (_, mut zeferino_rx) = dispatcher.register_user_channel(zeferino).await;

        dispatcher.send_to_user(ana, ready(ana)).await;

        assert!(matches!(
            ana_rx.recv().await,
            Some(GatewayEvent::Ready { user_id, .. }) if user_id == ana
        ));
        assert!(zeferino_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers() {
        let dispatcher = Dispatcher::new();
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();

        let user = Uuid::new_v4();
        dispatcher.broadcast(ready(user));

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn stale_connection_cannot_unregister_a_newer_one() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (old_conn, _old_rx) = dispatcher.register_user_channel(user).await;
        let (_new_conn, mut new_rx) = dispatcher.register_user_channel(user).await;

        // Old connection tears down after the reconnect
        dispatcher.unregister_user_channel(user, old_conn).await;

        dispatcher.send_to_user(user, ready(user)).await;
        assert!(new_rx.recv().await.is_some());
    }
}
