use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Backend(String),
    #[error("{procedure} returned invalid result code {code}")]
    InvalidCode { procedure: &'static str, code: i64 },
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
                StoreError::Decode(e.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDisposition {
    Notify,
    Mute,
    /// The requester has blocked the receiver.
    BlockedByRequester,
    /// The receiver has blocked the requester.
    BlockedByReceiver,
    AlreadyFriends,
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddFriendshipCode {
    NowFriends,
    AlreadyFriends,
    RequesterLimitReached,
    AccepterLimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveFriendshipOutcome {
    Removed(Friendship),
    NotFriends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddBlockCode {
    NowBlocked,
    AlsoUnfriended,
    AlreadyBlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveBlockOutcome {
    Removed(BlockRelation),
    NotBlocked,
}

/// Persistence of the social graph.
///
/// Business outcomes come back as codes; `Err` is reserved for I/O failure.
/// Implementations may be atomic per call (stored procedures) or may run
/// several statements per call, in which case callers must hold the
/// `CompoundGuard` for both players while calling.
#[async_trait::async_trait]
pub trait SocialStore: Send + Sync {
    /// Create tables (and procedures) if missing.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Upsert the handle fields; existing preferences are left alone.
    async fn touch_player(
        &self,
        player: &PlayerHandle,
        default_preferences: &UserPreferences,
    ) -> Result<(), StoreError>;

    async fn get_player(&self, player: PlayerId) -> Result<Option<PlayerRecord>, StoreError>;

    async fn update_player(&self, record: &PlayerRecord) -> Result<(), StoreError>;

    async fn list_friends(&self, player: PlayerId) -> Result<Vec<Friendship>, StoreError>;

    /// Relations where `player` is the blocker.
    async fn list_blocked(&self, player: PlayerId) -> Result<Vec<BlockRelation>, StoreError>;

    /// Relations where `player` is the one blocked.
    async fn list_blocked_by(&self, player: PlayerId) -> Result<Vec<BlockRelation>, StoreError>;

    /// Inserting the friendship also drops any block between the pair.
    async fn add_friendship(
        &self,
        requester: &PlayerHandle,
        accepter: &PlayerHandle,
        created_at: DateTime<Utc>,
        default_preferences: &UserPreferences,
        max_friends: FriendLimit,
    ) -> Result<AddFriendshipCode, StoreError>;

    async fn remove_friendship(
        &self,
        a: PlayerId,
        b: PlayerId,
    ) -> Result<RemoveFriendshipOutcome, StoreError>;

    /// Inserting the block also drops any friendship between the pair.
    async fn add_block(
        &self,
        player: &PlayerHandle,
        blocked: &PlayerHandle,
        created_at: DateTime<Utc>,
        default_preferences: &UserPreferences,
    ) -> Result<AddBlockCode, StoreError>;

    async fn remove_block(
        &self,
        player: PlayerId,
        blocked: PlayerId,
    ) -> Result<RemoveBlockOutcome, StoreError>;

    /// Read-only: block checks, friendship check and requester limit, all
    /// evaluated against one snapshot.
    async fn friend_request_disposition(
        &self,
        requester: &PlayerHandle,
        receiver: &PlayerHandle,
        default_preferences: &UserPreferences,
        max_friends: FriendLimit,
    ) -> Result<RequestDisposition, StoreError>;
}
