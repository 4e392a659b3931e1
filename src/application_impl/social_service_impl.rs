use crate::application_impl::{CompoundGuard, FriendRequestRegistry, RelationshipCache};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub friend_request_duration: Duration,
    pub max_friends: FriendLimit,
    pub default_preferences: UserPreferences,
}

type Outcome<R> = Result<(R, Option<SocialEvent>), SocialError>;

pub struct RealSocialService {
    store: Arc<dyn SocialStore>,
    cache: RelationshipCache,
    guard: CompoundGuard,
    requests: Arc<FriendRequestRegistry>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    config: SocialConfig,
}

impl RealSocialService {
    pub fn new(
        store: Arc<dyn SocialStore>,
        scheduler: Arc<dyn Scheduler>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        config: SocialConfig,
    ) -> RealSocialService {
        let requests = Arc::new(FriendRequestRegistry::new(
            config.friend_request_duration,
            scheduler,
            clock.clone(),
        ));
        RealSocialService {
            cache: RelationshipCache::new(store.clone()),
            store,
            guard: CompoundGuard::new(),
            requests,
            events,
            clock,
            config,
        }
    }

    /// Runs `op` holding the guard for both players, invalidates both players'
    /// cached lists before letting go, then publishes whatever event `op`
    /// produced. Failures take the same release path.
    async fn guarded<R, F>(&self, op: &'static str, a: PlayerId, b: PlayerId, f: F) -> Result<R, SocialError>
    where
        R: std::fmt::Debug,
        F: Future<Output = Outcome<R>>,
    {
        if a == b {
            return Err(SocialError::InvalidArgument(format!(
                "{op}: both sides are player {a}"
            )));
        }

        let permit = self.guard.acquire(&[a, b]).await;
        let outcome = f.await;
        self.cache.invalidate_pair(a, b);
        drop(permit);

        match outcome {
            Ok((result, event)) => {
                tracing::debug!("{op} {a} -> {b}: {result:?}");
                if let Some(event) = event {
                    self.events.publish(event);
                }
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("{op} {a} -> {b} failed: {e}");
                Err(e)
            }
        }
    }

    async fn add_friend_locked(
        &self,
        requester: &PlayerHandle,
        receiver: &PlayerHandle,
    ) -> Outcome<AddFriendResult> {
        let now = self.clock.now();
        let defaults = &self.config.default_preferences;

        if self.requests.get(receiver.id, requester.id).is_some() {
            // accepting: the friendship is credited to whoever asked first
            let code = self
                .store
                .add_friendship(receiver, requester, now, defaults, self.config.max_friends)
                .await?;
            return Ok(match code {
                AddFriendshipCode::NowFriends => {
                    self.requests.claim(receiver.id, requester.id);
                    let friendship = Friendship {
                        requester: receiver.clone(),
                        accepter: requester.clone(),
                        created_at: now,
                    };
                    (
                        AddFriendResult::NowFriends,
                        Some(SocialEvent::FriendAdded(FriendAdded { friendship })),
                    )
                }
                AddFriendshipCode::AlreadyFriends => {
                    self.requests.claim(receiver.id, requester.id);
                    (AddFriendResult::AlreadyFriends, None)
                }
                AddFriendshipCode::RequesterLimitReached => {
                    (AddFriendResult::OtherLimitReached, None)
                }
                AddFriendshipCode::AccepterLimitReached => (AddFriendResult::LimitReached, None),
            });
        }

        if self.requests.get(requester.id, receiver.id).is_some() {
            return Ok((AddFriendResult::AlreadyRequested, None));
        }

        let disposition = self
            .store
            .friend_request_disposition(requester, receiver, defaults, self.config.max_friends)
            .await?;
        let muted = match disposition {
            RequestDisposition::Notify => false,
            RequestDisposition::Mute => true,
            RequestDisposition::BlockedByRequester => {
                return Ok((AddFriendResult::BlockedByRequester, None));
            }
            RequestDisposition::BlockedByReceiver => {
                return Ok((AddFriendResult::BlockedByReceiver, None));
            }
            RequestDisposition::AlreadyFriends => return Ok((AddFriendResult::AlreadyFriends, None)),
            RequestDisposition::LimitReached => return Ok((AddFriendResult::LimitReached, None)),
        };

        self.store.touch_player(requester, defaults).await?;

        let request = FriendRequest {
            requester: requester.clone(),
            receiver: receiver.clone(),
            created_at: now,
        };
        let expires_at = self.requests.add(request.clone());
        let result = if muted {
            AddFriendResult::Muted
        } else {
            AddFriendResult::Notified
        };
        Ok((
            result,
            Some(SocialEvent::FriendRequest(FriendRequestSent {
                request,
                muted,
                expires_at,
            })),
        ))
    }

    async fn remove_friend_locked(
        &self,
        remover: PlayerId,
        other: PlayerId,
    ) -> Outcome<RemoveFriendResult> {
        match self.store.remove_friendship(remover, other).await? {
            RemoveFriendshipOutcome::Removed(friendship) => Ok((
                RemoveFriendResult::NowRemoved,
                Some(SocialEvent::FriendRemoved(FriendRemoved {
                    friendship,
                    remover,
                })),
            )),
            RemoveFriendshipOutcome::NotFriends => Ok((RemoveFriendResult::NotFriends, None)),
        }
    }

    async fn block_player_locked(
        &self,
        player: &PlayerHandle,
        blocked: &PlayerHandle,
    ) -> Outcome<BlockResult> {
        let now = self.clock.now();
        let code = self
            .store
            .add_block(player, blocked, now, &self.config.default_preferences)
            .await?;
        self.requests.cancel_between(player.id, blocked.id);

        let relation = BlockRelation {
            player: player.clone(),
            blocked: blocked.clone(),
            created_at: now,
        };
        Ok(match code {
            AddBlockCode::NowBlocked => (
                BlockResult::NowBlocked,
                Some(SocialEvent::PlayerBlocked(PlayerBlocked {
                    relation,
                    also_unfriended: false,
                })),
            ),
            AddBlockCode::AlsoUnfriended => (
                BlockResult::AlsoUnfriended,
                Some(SocialEvent::PlayerBlocked(PlayerBlocked {
                    relation,
                    also_unfriended: true,
                })),
            ),
            AddBlockCode::AlreadyBlocked => (BlockResult::AlreadyBlocked, None),
        })
    }

    async fn unblock_player_locked(
        &self,
        player: PlayerId,
        blocked: PlayerId,
    ) -> Outcome<UnblockResult> {
        match self.store.remove_block(player, blocked).await? {
            RemoveBlockOutcome::Removed(relation) => Ok((
                UnblockResult::NowUnblocked,
                Some(SocialEvent::PlayerUnblocked(PlayerUnblocked { relation })),
            )),
            RemoveBlockOutcome::NotBlocked => Ok((UnblockResult::NotBlocked, None)),
        }
    }
}

#[async_trait::async_trait]
impl SocialService for RealSocialService {
    async fn add_friend(
        &self,
        requester: &PlayerHandle,
        receiver: &PlayerHandle,
    ) -> Result<AddFriendResult, SocialError> {
        self.guarded(
            "add_friend",
            requester.id,
            receiver.id,
            self.add_friend_locked(requester, receiver),
        )
        .await
    }

    async fn remove_friend(
        &self,
        remover: PlayerId,
        other: PlayerId,
    ) -> Result<RemoveFriendResult, SocialError> {
        self.guarded(
            "remove_friend",
            remover,
            other,
            self.remove_friend_locked(remover, other),
        )
        .await
    }

    async fn block_player(
        &self,
        player: &PlayerHandle,
        blocked: &PlayerHandle,
    ) -> Result<BlockResult, SocialError> {
        self.guarded(
            "block_player",
            player.id,
            blocked.id,
            self.block_player_locked(player, blocked),
        )
        .await
    }

    async fn unblock_player(
        &self,
        player: PlayerId,
        blocked: PlayerId,
    ) -> Result<UnblockResult, SocialError> {
        self.guarded(
            "unblock_player",
            player,
            blocked,
            self.unblock_player_locked(player, blocked),
        )
        .await
    }

    async fn list_friends(&self, player: PlayerId) -> Result<Vec<Friendship>, SocialError> {
        Ok(self.cache.friends(player).await?.as_ref().clone())
    }

    async fn list_blocked(&self, player: PlayerId) -> Result<Vec<BlockRelation>, SocialError> {
        Ok(self.cache.blocked(player).await?.as_ref().clone())
    }

    async fn list_blocked_by(&self, player: PlayerId) -> Result<Vec<BlockRelation>, SocialError> {
        Ok(self.cache.blocked_by(player).await?.as_ref().clone())
    }

    fn get_friend_request(
        &self,
        requester: PlayerId,
        receiver: PlayerId,
    ) -> Option<FriendRequest> {
        self.requests.get(requester, receiver)
    }

    async fn get_player(&self, player: PlayerId) -> Result<Option<PlayerRecord>, SocialError> {
        Ok(self.store.get_player(player).await?)
    }

    async fn get_or_touch_player(
        &self,
        player: &PlayerHandle,
    ) -> Result<PlayerRecord, SocialError> {
        if let Some(record) = self.store.get_player(player.id).await? {
            return Ok(record);
        }
        let defaults = self.config.default_preferences;
        self.store.touch_player(player, &defaults).await?;
        Ok(PlayerRecord {
            handle: player.clone(),
            preferences: defaults,
        })
    }

    async fn update_preferences(
        &self,
        player: &PlayerHandle,
        preferences: UserPreferences,
    ) -> Result<PlayerRecord, SocialError> {
        let _permit = self.guard.acquire(&[player.id]).await;
        self.store
            .touch_player(player, &self.config.default_preferences)
            .await?;
        let record = PlayerRecord {
            handle: player.clone(),
            preferences,
        };
        self.store.update_player(&record).await?;
        tracing::debug!("preferences of {} set to {:?}", player.id, preferences);
        Ok(record)
    }

    async fn on_player_connected(&self, player: &PlayerHandle) -> Result<(), SocialError> {
        self.store
            .touch_player(player, &self.config.default_preferences)
            .await?;
        Ok(())
    }

    async fn on_player_disconnected(&self, player: PlayerId) {
        let _permit = self.guard.acquire(&[player]).await;
        let cancelled = self.requests.cancel_for_player(player);
        self.cache.invalidate(player);
        tracing::debug!(
            "player {player} disconnected, {} pending request(s) cancelled",
            cancelled.len()
        );
    }
}
