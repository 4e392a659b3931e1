use crate::application_port::SocialService;
use crate::domain_model::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What the session layer reports about player connections.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected(PlayerHandle),
    Disconnected(PlayerId),
}

/// Feeds connection events to the social service, one at a time and in order.
pub struct ConnectionListener {
    service: Arc<dyn SocialService>,
    events: mpsc::Receiver<ConnectionEvent>,
    cancellation_token: CancellationToken,
}

impl ConnectionListener {
    pub fn new(
        service: Arc<dyn SocialService>,
        events: mpsc::Receiver<ConnectionEvent>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            service,
            events,
            cancellation_token,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("ConnectionListener shutting down...");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        tracing::info!("ConnectionListener: all senders gone");
                        break;
                    }
                },
            }
        }
    }

    async fn handle(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected(player) => {
                tracing::debug!("player {} connected as {}", player.id, player.username);
                if let Err(e) = self.service.on_player_connected(&player).await {
                    tracing::warn!("refreshing player {} failed: {e}", player.id);
                }
            }
            ConnectionEvent::Disconnected(player) => {
                self.service.on_player_disconnected(player).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{RealSocialService, SocialConfig};
    use crate::application_port::AddFriendResult;
    use crate::infra_sqlite::SqliteSocialStore;
    use crate::server::{BroadcastEventSink, ManualClock, ManualScheduler};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn handle(n: u128) -> PlayerHandle {
        PlayerHandle::new(
            PlayerId(uuid::Uuid::from_u128(n)),
            format!("player{n}"),
            "Android",
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
    }

    async fn service() -> Arc<dyn SocialService> {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        Arc::new(RealSocialService::new(
            Arc::new(SqliteSocialStore::in_memory().await.unwrap()),
            Arc::new(ManualScheduler::new(clock.clone())),
            Arc::new(BroadcastEventSink::new(16)),
            clock,
            SocialConfig {
                friend_request_duration: Duration::from_secs(60),
                max_friends: FriendLimit::Unlimited,
                default_preferences: UserPreferences::default(),
            },
        ))
    }

    #[tokio::test]
    async fn connects_touch_and_disconnects_cancel() {
        let service = service().await;
        let (a, b) = (handle(1), handle(2));
        assert_eq!(
            service.add_friend(&a, &b).await.unwrap(),
            AddFriendResult::Notified
        );

        let (tx, rx) = mpsc::channel(8);
        let listener = ConnectionListener::new(service.clone(), rx, CancellationToken::new());
        tx.send(ConnectionEvent::Connected(b.clone())).await.unwrap();
        tx.send(ConnectionEvent::Disconnected(b.id)).await.unwrap();
        drop(tx);
        listener.run().await;

        assert_eq!(service.get_player(b.id).await.unwrap().unwrap().handle, b);
        assert!(service.get_friend_request(a.id, b.id).is_none());
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let service = service().await;
        let (_tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let listener = ConnectionListener::new(service, rx, cancel.clone());
        cancel.cancel();
        listener.run().await;
    }
}
