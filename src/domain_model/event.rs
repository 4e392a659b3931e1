use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Relationship changes published for the notification layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SocialEvent {
    #[serde(rename = "friend.request")]
    FriendRequest(FriendRequestSent),
    #[serde(rename = "friend.added")]
    FriendAdded(FriendAdded),
    #[serde(rename = "friend.removed")]
    FriendRemoved(FriendRemoved),
    #[serde(rename = "player.blocked")]
    PlayerBlocked(PlayerBlocked),
    #[serde(rename = "player.unblocked")]
    PlayerUnblocked(PlayerUnblocked),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendRequestSent {
    pub request: FriendRequest,
    pub muted: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendAdded {
    pub friendship: Friendship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendRemoved {
    pub friendship: Friendship,
    pub remover: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerBlocked {
    pub relation: BlockRelation,
    pub also_unfriended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerUnblocked {
    pub relation: BlockRelation,
}
