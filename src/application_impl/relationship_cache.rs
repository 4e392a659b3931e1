use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::sync::Arc;

type Load<T> = Shared<BoxFuture<'static, Result<Arc<Vec<T>>, StoreError>>>;

/// Read-through memo of each player's friend and block lists.
///
/// A slot holds the in-flight (or finished) load rather than the value, so
/// concurrent readers of a cold key share one store call. Writes never patch a
/// slot: they drop it and the next read reloads.
pub struct RelationshipCache {
    store: Arc<dyn SocialStore>,
    friends: DashMap<PlayerId, Load<Friendship>>,
    blocked: DashMap<PlayerId, Load<BlockRelation>>,
    blocked_by: DashMap<PlayerId, Load<BlockRelation>>,
}

impl RelationshipCache {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self {
            store,
            friends: DashMap::new(),
            blocked: DashMap::new(),
            blocked_by: DashMap::new(),
        }
    }

    pub async fn friends(&self, player: PlayerId) -> Result<Arc<Vec<Friendship>>, StoreError> {
        let store = self.store.clone();
        read_through(&self.friends, player, move || {
            async move { store.list_friends(player).await.map(Arc::new) }.boxed()
        })
        .await
    }

    pub async fn blocked(&self, player: PlayerId) -> Result<Arc<Vec<BlockRelation>>, StoreError> {
        let store = self.store.clone();
        read_through(&self.blocked, player, move || {
            async move { store.list_blocked(player).await.map(Arc::new) }.boxed()
        })
        .await
    }

    pub async fn blocked_by(
        &self,
        player: PlayerId,
    ) -> Result<Arc<Vec<BlockRelation>>, StoreError> {
        let store = self.store.clone();
        read_through(&self.blocked_by, player, move || {
            async move { store.list_blocked_by(player).await.map(Arc::new) }.boxed()
        })
        .await
    }

    pub fn invalidate(&self, player: PlayerId) {
        self.friends.remove(&player);
        self.blocked.remove(&player);
        self.blocked_by.remove(&player);
    }

    pub fn invalidate_pair(&self, a: PlayerId, b: PlayerId) {
        self.invalidate(a);
        self.invalidate(b);
    }

    pub fn is_cached(&self, player: PlayerId) -> bool {
        self.friends.contains_key(&player)
            || self.blocked.contains_key(&player)
            || self.blocked_by.contains_key(&player)
    }
}

async fn read_through<T, F>(
    slots: &DashMap<PlayerId, Load<T>>,
    player: PlayerId,
    fetch: F,
) -> Result<Arc<Vec<T>>, StoreError>
where
    T: Send + Sync + 'static,
    F: FnOnce() -> BoxFuture<'static, Result<Arc<Vec<T>>, StoreError>>,
{
    let load = slots
        .entry(player)
        .or_insert_with(|| fetch().shared())
        .value()
        .clone();

    let result = load.clone().await;
    if let Err(e) = &result {
        tracing::warn!("relationship load for {player} failed: {e}");
        // forget the failure so the next reader retries, unless already replaced
        slots.remove_if(&player, |_, current| current.ptr_eq(&load));
    }
    result
}
