use crate::domain_model::SocialEvent;

/// Receives relationship events after the change is committed.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: SocialEvent);
}
