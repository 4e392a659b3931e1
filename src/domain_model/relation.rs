use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Mutual link. `requester` is whoever sent the request that was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Friendship {
    pub requester: PlayerHandle,
    pub accepter: PlayerHandle,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    /// The side of the friendship that is not `id`.
    pub fn other(&self, id: PlayerId) -> &PlayerHandle {
        if self.requester.id == id {
            &self.accepter
        } else {
            &self.requester
        }
    }
}

/// Directed: `player` has blocked `blocked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRelation {
    pub player: PlayerHandle,
    pub blocked: PlayerHandle,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendLimit {
    Unlimited,
    AtMost(u32),
}

impl FriendLimit {
    /// `-1` is unlimited; zero and anything below `-1` are rejected.
    pub fn from_setting(value: i64) -> Option<Self> {
        match value {
            -1 => Some(FriendLimit::Unlimited),
            n if n >= 1 => u32::try_from(n).ok().map(FriendLimit::AtMost),
            _ => None,
        }
    }

    pub fn as_sql(self) -> i64 {
        match self {
            FriendLimit::Unlimited => -1,
            FriendLimit::AtMost(n) => i64::from(n),
        }
    }

    pub fn is_reached(self, current: usize) -> bool {
        match self {
            FriendLimit::Unlimited => false,
            FriendLimit::AtMost(n) => current >= n as usize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_from_setting() {
        assert_eq!(FriendLimit::from_setting(-1), Some(FriendLimit::Unlimited));
        assert_eq!(FriendLimit::from_setting(3), Some(FriendLimit::AtMost(3)));
        assert_eq!(FriendLimit::from_setting(0), None);
        assert_eq!(FriendLimit::from_setting(-2), None);
    }

    #[test]
    fn limit_reached() {
        assert!(!FriendLimit::Unlimited.is_reached(usize::MAX));
        assert!(!FriendLimit::AtMost(2).is_reached(1));
        assert!(FriendLimit::AtMost(2).is_reached(2));
        assert_eq!(FriendLimit::Unlimited.as_sql(), -1);
    }
}
