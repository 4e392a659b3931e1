use crate::domain_model::*;
use crate::domain_port::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddFriendResult {
    /// A pending request in the other direction was accepted.
    NowFriends,
    Notified,
    Muted,
    /// An unclaimed request for the same direction is still pending.
    AlreadyRequested,
    /// The caller has blocked the other player.
    BlockedByRequester,
    /// The other player has blocked the caller.
    BlockedByReceiver,
    AlreadyFriends,
    LimitReached,
    OtherLimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveFriendResult {
    NowRemoved,
    NotFriends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockResult {
    NowBlocked,
    AlsoUnfriended,
    AlreadyBlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnblockResult {
    NowUnblocked,
    NotBlocked,
}

#[async_trait::async_trait]
pub trait SocialService: Send + Sync {
    async fn add_friend(
        &self,
        requester: &PlayerHandle,
        receiver: &PlayerHandle,
    ) -> Result<AddFriendResult, SocialError>;

    async fn remove_friend(
        &self,
        remover: PlayerId,
        other: PlayerId,
    ) -> Result<RemoveFriendResult, SocialError>;

    async fn block_player(
        &self,
        player: &PlayerHandle,
        blocked: &PlayerHandle,
    ) -> Result<BlockResult, SocialError>;

    async fn unblock_player(
        &self,
        player: PlayerId,
        blocked: PlayerId,
    ) -> Result<UnblockResult, SocialError>;

    async fn list_friends(&self, player: PlayerId) -> Result<Vec<Friendship>, SocialError>;

    async fn list_blocked(&self, player: PlayerId) -> Result<Vec<BlockRelation>, SocialError>;

    async fn list_blocked_by(&self, player: PlayerId) -> Result<Vec<BlockRelation>, SocialError>;

    fn get_friend_request(&self, requester: PlayerId, receiver: PlayerId)
    -> Option<FriendRequest>;

    async fn get_player(&self, player: PlayerId) -> Result<Option<PlayerRecord>, SocialError>;

    async fn get_or_touch_player(&self, player: &PlayerHandle)
    -> Result<PlayerRecord, SocialError>;

    async fn update_preferences(
        &self,
        player: &PlayerHandle,
        preferences: UserPreferences,
    ) -> Result<PlayerRecord, SocialError>;

    async fn on_player_connected(&self, player: &PlayerHandle) -> Result<(), SocialError>;

    /// Waits for in-flight operations involving `player`, then cancels every
    /// pending request they sent or received.
    async fn on_player_disconnected(&self, player: PlayerId);
}
