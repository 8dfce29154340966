//! Per-key in-flight guards.
//!
//! Serializes work on the same key inside one process while letting different
//! keys proceed in parallel. Slots are created on demand and removed once the
//! last holder or waiter lets go, so the map only holds keys under contention.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-key async locks.
#[derive(Debug, Default)]
pub struct InFlightKeys {
    slots: DashMap<String, Arc<Mutex<()>>>,
}

impl InFlightKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task holds `key`, then hold it until the guard drops.
    ///
    /// Cancel-safe: a waiter dropped before it gets the lock still releases
    /// its claim on the slot.
    pub async fn acquire(&self, key: &str) -> InFlightGuard<'_> {
        let slot = self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let claim = SlotClaim {
            keys: self,
            key: key.to_string(),
            slot,
        };
        let permit = Arc::clone(&claim.slot).lock_owned().await;
        InFlightGuard {
            _permit: permit,
            claim,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One task's reference to a slot, held or awaited.
#[derive(Debug)]
struct SlotClaim<'a> {
    keys: &'a InFlightKeys,
    key: String,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotClaim<'_> {
    fn drop(&mut self) {
        // One reference in the map plus ours means nobody else is waiting.
        let slot = &self.slot;
        self.keys.slots.remove_if(&self.key, |_, current| {
            Arc::ptr_eq(current, slot) && Arc::strong_count(current) == 2
        });
    }
}

/// Holds one key of an [`InFlightKeys`] registry.
///
/// Fields drop in order: the lock is released before the claim is checked.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    _permit: OwnedMutexGuard<()>,
    claim: SlotClaim<'a>,
}

impl InFlightGuard<'_> {
    pub fn key(&self) -> &str {
        &self.claim.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_slot_removed_after_release() {
        let keys = InFlightKeys::new();
        {
            let guard = keys.acquire("GKEY").await;
            assert_eq!(guard.key(), "GKEY");
            assert_eq!(keys.len(), 1);
        }
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let keys = InFlightKeys::new();
        let _a = keys.acquire("A").await;
        let b = tokio::time::timeout(Duration::from_millis(50), keys.acquire("B")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let keys = Arc::new(InFlightKeys::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let keys = Arc::clone(&keys);
            let active = Arc::clone(&active);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = keys.acquire("SAME").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_slot() {
        use std::future::Future;
        use std::pin::pin;
        use std::task::{Context, Poll, Wake, Waker};

        struct NoopWake;
        impl Wake for NoopWake {
            fn wake(self: Arc<Self>) {}
        }
        let waker = Waker::from(Arc::new(NoopWake));

        let keys = InFlightKeys::new();
        let holder = keys.acquire("K").await;

        {
            let mut waiter = pin!(keys.acquire("K"));
            let mut cx = Context::from_waker(&waker);
            assert!(matches!(waiter.as_mut().poll(&mut cx), Poll::Pending));
            drop(holder);
        }

        assert!(keys.is_empty());
        let _again = keys.acquire("K").await;
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_keeps_holder_slot() {
        let keys = InFlightKeys::new();
        let holder = keys.acquire("K").await;
        let waited = tokio::time::timeout(Duration::from_millis(20), keys.acquire("K")).await;
        assert!(waited.is_err());
        assert_eq!(keys.len(), 1);
        drop(holder);
        assert!(keys.is_empty());
    }
}
