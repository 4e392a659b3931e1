use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, TimeDelta, Utc};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

// Stale heap nodes tolerated beyond twice the live entry count.
const STALE_SLACK: usize = 16;

struct PendingEntry {
    request: FriendRequest,
    seq: u64,
    expires_at: DateTime<Utc>,
    claimed: bool,
    timer: TimerHandle,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<RequestKey, PendingEntry>,
    // (created_at, seq) orders the heap; a node whose seq no longer matches its
    // entry is stale and skipped on pop.
    by_age: BinaryHeap<Reverse<(DateTime<Utc>, u64, RequestKey)>>,
    next_seq: u64,
}

/// In-memory friend requests awaiting an answer, one per (requester, receiver).
///
/// Every request gets the same lifetime, so creation order is also expiry
/// order and the sweep only ever looks at the heap head. Accepted requests are
/// marked claimed and left for the sweep to collect.
pub struct FriendRequestRegistry {
    state: Mutex<RegistryState>,
    lifetime: Duration,
    ttl: TimeDelta,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
}

impl FriendRequestRegistry {
    pub fn new(lifetime: Duration, scheduler: Arc<dyn Scheduler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            lifetime,
            ttl: TimeDelta::from_std(lifetime).unwrap_or_else(|_| TimeDelta::weeks(52)),
            scheduler,
            clock,
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        // state stays consistent across a panicking holder: every mutation is a
        // single insert/remove
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `request`, replacing any previous one for the same direction,
    /// and returns when it will expire.
    pub fn add(self: &Arc<Self>, request: FriendRequest) -> DateTime<Utc> {
        let key = request.key();
        let expires_at = request
            .created_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut state = self.state();
        let seq = state.next_seq;
        state.next_seq += 1;

        let registry: Weak<Self> = Arc::downgrade(self);
        let timer = self.scheduler.run_after(
            self.lifetime,
            Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.on_timer(key, seq);
                }
            }),
        );

        state.by_age.push(Reverse((request.created_at, seq, key)));
        if let Some(previous) = state.entries.insert(
            key,
            PendingEntry {
                request,
                seq,
                expires_at,
                claimed: false,
                timer,
            },
        ) {
            previous.timer.cancel();
            Self::compact_locked(&mut state);
        }

        expires_at
    }

    /// The live request, if any. Claimed or already expired requests are absent.
    pub fn get(&self, requester: PlayerId, receiver: PlayerId) -> Option<FriendRequest> {
        let now = self.clock.now();
        let state = self.state();
        state
            .entries
            .get(&RequestKey::new(requester, receiver))
            .filter(|e| !e.claimed && e.expires_at > now)
            .map(|e| e.request.clone())
    }

    /// Marks the request inert. Returns false if there was nothing live to claim.
    pub fn claim(&self, requester: PlayerId, receiver: PlayerId) -> bool {
        let now = self.clock.now();
        let mut state = self.state();
        match state.entries.get_mut(&RequestKey::new(requester, receiver)) {
            Some(entry) if !entry.claimed && entry.expires_at > now => {
                entry.claimed = true;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&self, requester: PlayerId, receiver: PlayerId) -> bool {
        let mut state = self.state();
        let removed = state.entries.remove(&RequestKey::new(requester, receiver));
        match removed {
            Some(entry) => {
                entry.timer.cancel();
                Self::compact_locked(&mut state);
                true
            }
            None => false,
        }
    }

    /// Cancels requests between the pair in both directions.
    pub fn cancel_between(&self, a: PlayerId, b: PlayerId) -> usize {
        usize::from(self.cancel(a, b)) + usize::from(self.cancel(b, a))
    }

    /// Cancels every request the player sent or received.
    pub fn cancel_for_player(&self, player: PlayerId) -> Vec<RequestKey> {
        let mut state = self.state();
        let keys: Vec<RequestKey> = state
            .entries
            .keys()
            .filter(|k| k.involves(player))
            .copied()
            .collect();
        for key in &keys {
            if let Some(entry) = state.entries.remove(key) {
                entry.timer.cancel();
            }
        }
        Self::compact_locked(&mut state);
        keys
    }

    /// Drops heap nodes whose entry was replaced or cancelled: always at the
    /// head, and everywhere once they outnumber the live entries.
    fn compact_locked(state: &mut RegistryState) {
        let RegistryState {
            entries, by_age, ..
        } = state;
        let live = |seq: u64, key: &RequestKey| entries.get(key).is_some_and(|e| e.seq == seq);

        while let Some(Reverse((_, seq, key))) = by_age.peek().copied() {
            if live(seq, &key) {
                break;
            }
            by_age.pop();
        }
        if by_age.len() > entries.len() * 2 + STALE_SLACK {
            by_age.retain(|Reverse((_, seq, key))| live(*seq, key));
        }
    }

    #[cfg(test)]
    fn queued(&self) -> usize {
        self.state().by_age.len()
    }

    /// Drops expired and claimed requests from the head of the age order and
    /// returns the ones that expired unanswered.
    pub fn sweep(&self) -> Vec<FriendRequest> {
        let now = self.clock.now();
        let mut state = self.state();
        Self::sweep_locked(&mut state, now)
    }

    fn sweep_locked(state: &mut RegistryState, now: DateTime<Utc>) -> Vec<FriendRequest> {
        let mut expired = Vec::new();
        while let Some(Reverse((_, seq, key))) = state.by_age.peek().copied() {
            let live = state.entries.get(&key).filter(|e| e.seq == seq);
            match live {
                Some(entry) if entry.claimed || entry.expires_at <= now => {}
                Some(_) => break,
                None => {
                    state.by_age.pop();
                    continue;
                }
            }
            state.by_age.pop();
            if let Some(entry) = state.entries.remove(&key) {
                entry.timer.cancel();
                if !entry.claimed {
                    expired.push(entry.request);
                }
            }
        }
        expired
    }

    fn on_timer(&self, key: RequestKey, seq: u64) {
        let now = self.clock.now();
        let mut state = self.state();
        // the timer is authoritative for its own entry even if clocks disagree
        if state.entries.get(&key).is_some_and(|e| e.seq == seq) {
            if let Some(entry) = state.entries.remove(&key) {
                if !entry.claimed {
                    tracing::debug!(
                        "friend request {} -> {} expired",
                        entry.request.requester.id,
                        entry.request.receiver.id
                    );
                }
            }
        }
        for request in Self::sweep_locked(&mut state, now) {
            tracing::debug!(
                "friend request {} -> {} expired",
                request.requester.id,
                request.receiver.id
            );
        }
    }

    /// Entries still held, claimed ones included.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
