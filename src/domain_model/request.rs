use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outstanding friend offer. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendRequest {
    pub requester: PlayerHandle,
    pub receiver: PlayerHandle,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    pub requester: PlayerId,
    pub receiver: PlayerId,
}

impl RequestKey {
    pub fn new(requester: PlayerId, receiver: PlayerId) -> Self {
        Self {
            requester,
            receiver,
        }
    }

    pub fn involves(&self, id: PlayerId) -> bool {
        self.requester == id || self.receiver == id
    }
}

impl FriendRequest {
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.requester.id, self.receiver.id)
    }
}
