//! Storage behaviour every `SocialStore` backend shares, run against each one.

use super::*;
use crate::domain_model::*;
use chrono::{DateTime, TimeZone, Utc};

pub(crate) const DEFAULTS: UserPreferences = UserPreferences {
    prefers_text: false,
    device_visibility: DeviceVisibility::Friends,
    mute_friend_requests: false,
};

pub(crate) fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Player ids offset from a base, so runs against a shared database do not
/// see each other's rows.
pub(crate) struct Players {
    base: u128,
}

impl Players {
    pub(crate) fn fixed() -> Self {
        Players { base: 0 }
    }

    pub(crate) fn fresh() -> Self {
        Players {
            base: uuid::Uuid::new_v4().as_u128() & !0xffff,
        }
    }

    pub(crate) fn id(&self, n: u128) -> PlayerId {
        PlayerId(uuid::Uuid::from_u128(self.base + n))
    }

    pub(crate) fn handle(&self, n: u128) -> PlayerHandle {
        PlayerHandle::new(self.id(n), format!("player{n}"), "PS5", at(0))
    }
}

pub(crate) async fn touch_refreshes_handle_but_keeps_preferences(
    store: &dyn SocialStore,
    p: &Players,
) {
    let a = p.handle(1);
    store.touch_player(&a, &DEFAULTS).await.unwrap();

    let record = store.get_player(a.id).await.unwrap().unwrap();
    assert_eq!(record.handle, a);
    assert_eq!(record.preferences, DEFAULTS);

    let prefs = UserPreferences {
        prefers_text: true,
        device_visibility: DeviceVisibility::Everyone,
        mute_friend_requests: true,
    };
    store
        .update_player(&PlayerRecord {
            handle: a.clone(),
            preferences: prefs,
        })
        .await
        .unwrap();

    let renamed = PlayerHandle::new(a.id, "renamed", "Xbox", at(60));
    store.touch_player(&renamed, &DEFAULTS).await.unwrap();

    let record = store.get_player(a.id).await.unwrap().unwrap();
    assert_eq!(record.handle, renamed);
    assert_eq!(record.preferences, prefs);
    assert!(store.get_player(p.id(2)).await.unwrap().is_none());
}

pub(crate) async fn friendship_is_stored_once_per_pair(store: &dyn SocialStore, p: &Players) {
    let (a, b) = (p.handle(1), p.handle(2));

    let code = store
        .add_friendship(&a, &b, at(0), &DEFAULTS, FriendLimit::Unlimited)
        .await
        .unwrap();
    assert_eq!(code, AddFriendshipCode::NowFriends);
    let code = store
        .add_friendship(&b, &a, at(1), &DEFAULTS, FriendLimit::Unlimited)
        .await
        .unwrap();
    assert_eq!(code, AddFriendshipCode::AlreadyFriends);

    for player in [a.id, b.id] {
        let friends = store.list_friends(player).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].requester, a);
        assert_eq!(friends[0].accepter, b);
        assert_eq!(friends[0].created_at, at(0));
    }

    match store.remove_friendship(b.id, a.id).await.unwrap() {
        RemoveFriendshipOutcome::Removed(f) => assert_eq!(f.requester.id, a.id),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        store.remove_friendship(a.id, b.id).await.unwrap(),
        RemoveFriendshipOutcome::NotFriends
    );
}

pub(crate) async fn limits_apply_to_each_side(store: &dyn SocialStore, p: &Players) {
    let limit = FriendLimit::AtMost(1);
    let (a, b, c) = (p.handle(1), p.handle(2), p.handle(3));
    store.add_friendship(&a, &b, at(0), &DEFAULTS, limit).await.unwrap();

    assert_eq!(
        store.add_friendship(&a, &c, at(1), &DEFAULTS, limit).await.unwrap(),
        AddFriendshipCode::RequesterLimitReached
    );
    assert_eq!(
        store.add_friendship(&c, &a, at(1), &DEFAULTS, limit).await.unwrap(),
        AddFriendshipCode::AccepterLimitReached
    );
    assert!(store.list_friends(c.id).await.unwrap().is_empty());
}

pub(crate) async fn block_replaces_friendship_and_friendship_replaces_block(
    store: &dyn SocialStore,
    p: &Players,
) {
    let (a, b) = (p.handle(1), p.handle(2));

    assert_eq!(
        store.add_block(&a, &b, at(0), &DEFAULTS).await.unwrap(),
        AddBlockCode::NowBlocked
    );
    assert_eq!(
        store.add_block(&a, &b, at(1), &DEFAULTS).await.unwrap(),
        AddBlockCode::AlreadyBlocked
    );
    assert_eq!(store.list_blocked(a.id).await.unwrap()[0].blocked, b);
    assert_eq!(store.list_blocked_by(b.id).await.unwrap()[0].player, a);
    assert!(store.list_blocked(b.id).await.unwrap().is_empty());

    store
        .add_friendship(&b, &a, at(2), &DEFAULTS, FriendLimit::Unlimited)
        .await
        .unwrap();
    assert!(store.list_blocked(a.id).await.unwrap().is_empty());

    assert_eq!(
        store.add_block(&b, &a, at(3), &DEFAULTS).await.unwrap(),
        AddBlockCode::AlsoUnfriended
    );
    assert!(store.list_friends(a.id).await.unwrap().is_empty());

    match store.remove_block(b.id, a.id).await.unwrap() {
        RemoveBlockOutcome::Removed(r) => assert_eq!(r.created_at, at(3)),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        store.remove_block(b.id, a.id).await.unwrap(),
        RemoveBlockOutcome::NotBlocked
    );
}

pub(crate) async fn disposition_checks_in_order(store: &dyn SocialStore, p: &Players) {
    let (a, b, c) = (p.handle(1), p.handle(2), p.handle(3));
    let unlimited = FriendLimit::Unlimited;

    // unknown receiver falls back to the default mute setting
    assert_eq!(
        store.friend_request_disposition(&a, &b, &DEFAULTS, unlimited).await.unwrap(),
        RequestDisposition::Notify
    );
    let muting = UserPreferences {
        mute_friend_requests: true,
        ..DEFAULTS
    };
    assert_eq!(
        store.friend_request_disposition(&a, &b, &muting, unlimited).await.unwrap(),
        RequestDisposition::Mute
    );
    assert!(store.get_player(b.id).await.unwrap().is_none());

    store.add_block(&a, &b, at(0), &DEFAULTS).await.unwrap();
    store.add_block(&b, &a, at(0), &DEFAULTS).await.unwrap();
    assert_eq!(
        store.friend_request_disposition(&a, &b, &DEFAULTS, unlimited).await.unwrap(),
        RequestDisposition::BlockedByRequester
    );
    store.remove_block(a.id, b.id).await.unwrap();
    assert_eq!(
        store.friend_request_disposition(&a, &b, &DEFAULTS, unlimited).await.unwrap(),
        RequestDisposition::BlockedByReceiver
    );

    store.add_friendship(&a, &c, at(1), &DEFAULTS, unlimited).await.unwrap();
    assert_eq!(
        store.friend_request_disposition(&c, &a, &DEFAULTS, unlimited).await.unwrap(),
        RequestDisposition::AlreadyFriends
    );
    assert_eq!(
        store
            .friend_request_disposition(&c, &p.handle(4), &DEFAULTS, FriendLimit::AtMost(1))
            .await
            .unwrap(),
        RequestDisposition::LimitReached
    );
}
