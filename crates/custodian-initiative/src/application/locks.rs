//! Per-channel locks serializing read-modify-write cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per channel id. An entry is dropped once no guard or
/// waiter holds it.
#[derive(Debug, Default)]
pub(crate) struct ChannelLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ChannelLocks {
    /// Waits for exclusive access to `channel_id`. Access is released when
    /// the returned guard is dropped.
    pub(crate) async fn acquire(&self, channel_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Handles are only cloned under this mutex, so a count of one
            // means the entry is idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry(channel_id.to_owned())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_channel_is_exclusive() {
        let locks = ChannelLocks::default();
        let guard = locks.acquire("123").await;

        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            locks.acquire("123"),
        )
        .await;

        assert!(waiting.is_err());
        drop(guard);
        let _again = locks.acquire("123").await;
    }

    #[tokio::test]
    async fn test_different_channels_do_not_block_each_other() {
        let locks = ChannelLocks::default();
        let _first = locks.acquire("123").await;

        let _second = locks.acquire("456").await;
    }

    #[tokio::test]
    async fn test_idle_channels_are_dropped_from_map() {
        let locks = ChannelLocks::default();
        for i in 0..50 {
            let _guard = locks.acquire(&format!("channel-{i}")).await;
        }

        let _held = locks.acquire("123").await;

        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_held_channel_survives_pruning() {
        let locks = ChannelLocks::default();
        let guard = locks.acquire("123").await;
        let _other = locks.acquire("456").await;

        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            locks.acquire("123"),
        )
        .await;

        assert!(waiting.is_err());
        assert_eq!(locks.len(), 2);
        drop(guard);
    }
}
