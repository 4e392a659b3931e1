use crate::domain_model::PlayerId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<PlayerId, Arc<Mutex<()>>>;

/// Serialises compound relationship transactions per player.
///
/// An operation locks every player it touches, always in ascending id order so
/// two operations over overlapping pairs cannot deadlock. Waiting suspends the
/// task; nothing blocks a worker thread.
#[derive(Default)]
pub struct CompoundGuard {
    locks: Arc<LockTable>,
}

pub struct GuardPermit {
    held: Vec<(PlayerId, OwnedMutexGuard<()>)>,
    locks: Arc<LockTable>,
}

impl CompoundGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, players: &[PlayerId]) -> GuardPermit {
        let mut ids = players.to_vec();
        ids.sort();
        ids.dedup();

        let mut held = Vec::with_capacity(ids.len());
        for id in ids {
            let lock = self.locks.entry(id).or_default().value().clone();
            held.push((id, lock.lock_owned().await));
        }

        GuardPermit {
            held,
            locks: self.locks.clone(),
        }
    }

    /// Number of players with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for GuardPermit {
    fn drop(&mut self) {
        while let Some((id, guard)) = self.held.pop() {
            drop(guard);
            // only the table still references it: nobody holds or waits
            self.locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn id(n: u128) -> PlayerId {
        PlayerId(uuid::Uuid::from_u128(n))
    }

    #[tokio::test]
    async fn overlapping_pairs_are_serialised() {
        let guard = CompoundGuard::new();
        let first = guard.acquire(&[id(1), id(2)]).await;

        let ids = [id(2), id(3)];
        let mut second = Box::pin(guard.acquire(&ids));
        assert!((&mut second).now_or_never().is_none());

        drop(first);
        let second = second.await;
        drop(second);
        assert_eq!(guard.tracked(), 0);
    }

    #[tokio::test]
    async fn disjoint_pairs_interleave() {
        let guard = CompoundGuard::new();
        let _first = guard.acquire(&[id(1), id(2)]).await;
        let second = guard.acquire(&[id(3), id(4)]).now_or_never();
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn argument_order_does_not_matter() {
        let guard = CompoundGuard::new();
        let first = guard.acquire(&[id(5), id(4)]).await;
        assert!(guard.acquire(&[id(4), id(5)]).now_or_never().is_none());
        drop(first);
        assert!(guard.acquire(&[id(4), id(5)]).now_or_never().is_some());
    }

    #[tokio::test]
    async fn duplicate_ids_lock_once() {
        let guard = CompoundGuard::new();
        let permit = guard.acquire(&[id(7), id(7)]).now_or_never();
        assert!(permit.is_some());
    }
}
