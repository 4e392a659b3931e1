use crate::domain_model::SocialEvent;
use crate::domain_port::EventSink;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Fans events out to every subscriber. Events published while nobody is
/// subscribed are dropped.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<SocialEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SocialEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: SocialEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("social event dropped, no subscribers");
        }
    }
}

/// Writes every published event to the log as JSON.
pub struct EventJournal {
    events: broadcast::Receiver<SocialEvent>,
    cancellation_token: CancellationToken,
}

impl EventJournal {
    pub fn new(
        events: broadcast::Receiver<SocialEvent>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            events,
            cancellation_token,
        }
    }

    /// Runs until cancelled or the sink is gone; returns how many events it saw.
    pub async fn run(mut self) -> usize {
        let mut seen = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("EventJournal shutting down...");
                    break;
                }
                received = self.events.recv() => match received {
                    Ok(event) => {
                        seen += 1;
                        match serde_json::to_string(&event) {
                            Ok(json) => tracing::info!(target: "quickfriends::events", "{json}"),
                            Err(e) => tracing::error!("failed to serialize event: {e}"),
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!("EventJournal lagged, {missed} event(s) not logged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::*;
    use chrono::Utc;

    fn blocked_event() -> SocialEvent {
        let handle = |n: u128| {
            PlayerHandle::new(PlayerId(uuid::Uuid::from_u128(n)), format!("p{n}"), "Web", Utc::now())
        };
        SocialEvent::PlayerBlocked(PlayerBlocked {
            relation: BlockRelation {
                player: handle(1),
                blocked: handle(2),
                created_at: Utc::now(),
            },
            also_unfriended: true,
        })
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let sink = BroadcastEventSink::new(8);
        // nobody listening yet: dropped
        sink.publish(blocked_event());

        let mut first = sink.subscribe();
        let mut second = sink.subscribe();
        let event = blocked_event();
        sink.publish(event.clone());

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
        assert!(first.try_recv().is_err());
    }

    #[tokio::test]
    async fn journal_drains_until_the_sink_closes() {
        let sink = BroadcastEventSink::new(8);
        let journal = EventJournal::new(sink.subscribe(), CancellationToken::new());
        sink.publish(blocked_event());
        sink.publish(blocked_event());
        drop(sink);

        assert_eq!(journal.run().await, 2);
    }

    #[tokio::test]
    async fn journal_stops_on_cancel() {
        let sink = BroadcastEventSink::new(8);
        let cancel = CancellationToken::new();
        let journal = EventJournal::new(sink.subscribe(), cancel.clone());
        cancel.cancel();

        assert_eq!(journal.run().await, 0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(blocked_event()).unwrap();
        assert_eq!(json["type"], "player.blocked");
        assert_eq!(json["payload"]["also_unfriended"], true);
    }
}
