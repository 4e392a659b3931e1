use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_sqlite::SqliteSocialStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Delegates to SQLite but counts list calls and can hold selected calls open.
pub(crate) struct GatedStore {
    inner: SqliteSocialStore,
    list_calls: AtomicUsize,
    list_gate: Option<Arc<Notify>>,
    disposition_gate: Option<Arc<Notify>>,
    fail_lists: bool,
}

impl GatedStore {
    pub(crate) async fn new() -> Self {
        Self {
            inner: SqliteSocialStore::in_memory().await.unwrap(),
            list_calls: AtomicUsize::new(0),
            list_gate: None,
            disposition_gate: None,
            fail_lists: false,
        }
    }

    /// `list_friends` waits for one notification before it runs.
    pub(crate) fn with_list_gate(mut self, gate: Arc<Notify>) -> Self {
        self.list_gate = Some(gate);
        self
    }

    /// `friend_request_disposition` waits for one notification before it runs.
    pub(crate) fn with_disposition_gate(mut self, gate: Arc<Notify>) -> Self {
        self.disposition_gate = Some(gate);
        self
    }

    pub(crate) fn failing_lists(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SocialStore for GatedStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        self.inner.initialize().await
    }
    async fn touch_player(
        &self,
        player: &PlayerHandle,
        defaults: &UserPreferences,
    ) -> Result<(), StoreError> {
        self.inner.touch_player(player, defaults).await
    }
    async fn get_player(&self, player: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        self.inner.get_player(player).await
    }
    async fn update_player(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        self.inner.update_player(record).await
    }
    async fn list_friends(&self, player: PlayerId) -> Result<Vec<Friendship>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        if self.fail_lists {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.list_friends(player).await
    }
    async fn list_blocked(&self, player: PlayerId) -> Result<Vec<BlockRelation>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_blocked(player).await
    }
    async fn list_blocked_by(&self, player: PlayerId) -> Result<Vec<BlockRelation>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_blocked_by(player).await
    }
    async fn add_friendship(
        &self,
        requester: &PlayerHandle,
        accepter: &PlayerHandle,
        created_at: DateTime<Utc>,
        defaults: &UserPreferences,
        max_friends: FriendLimit,
    ) -> Result<AddFriendshipCode, StoreError> {
        self.inner
            .add_friendship(requester, accepter, created_at, defaults, max_friends)
            .await
    }
    async fn remove_friendship(
        &self,
        a: PlayerId,
        b: PlayerId,
    ) -> Result<RemoveFriendshipOutcome, StoreError> {
        self.inner.remove_friendship(a, b).await
    }
    async fn add_block(
        &self,
        player: &PlayerHandle,
        blocked: &PlayerHandle,
        created_at: DateTime<Utc>,
        defaults: &UserPreferences,
    ) -> Result<AddBlockCode, StoreError> {
        self.inner.add_block(player, blocked, created_at, defaults).await
    }
    async fn remove_block(
        &self,
        player: PlayerId,
        blocked: PlayerId,
    ) -> Result<RemoveBlockOutcome, StoreError> {
        self.inner.remove_block(player, blocked).await
    }
    async fn friend_request_disposition(
        &self,
        requester: &PlayerHandle,
        receiver: &PlayerHandle,
        defaults: &UserPreferences,
        max_friends: FriendLimit,
    ) -> Result<RequestDisposition, StoreError> {
        if let Some(gate) = &self.disposition_gate {
            gate.notified().await;
        }
        self.inner
            .friend_request_disposition(requester, receiver, defaults, max_friends)
            .await
    }
}
