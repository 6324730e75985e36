//! In-memory queue store for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::provider::PersistentQueueStore;
use accuread_common::{Error, QueueItem, Result};

/// In-memory queue store.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop. Writes can be made to fail on demand to exercise
/// persistence error paths.
pub struct MemoryQueueStore {
    items: RwLock<Vec<QueueItem>>,
    fail_writes: AtomicBool,
}

impl MemoryQueueStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent writes fail with `Error::Persistence`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence(
                "memory store is refusing writes".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistentQueueStore for MemoryQueueStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_offline_queue(&self) -> Result<Vec<QueueItem>> {
        Ok(self.items.read().await.clone())
    }

    async fn add_to_offline_queue(&self, item: QueueItem) -> Result<()> {
        self.check_writable()?;
        self.items.write().await.push(item);
        Ok(())
    }

    async fn clear_offline_queue(&self) -> Result<()> {
        self.check_writable()?;
        self.items.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_preserves_order() {
        let store = MemoryQueueStore::new();
        let first = QueueItem::new("file:///1.jpg");
        let second = QueueItem::new("file:///2.jpg");

        store.add_to_offline_queue(first.clone()).await.unwrap();
        store.add_to_offline_queue(second.clone()).await.unwrap();

        let queue = store.get_offline_queue().await.unwrap();
        assert_eq!(queue, vec![first, second]);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryQueueStore::new();
        store
            .add_to_offline_queue(QueueItem::new("file:///1.jpg"))
            .await
            .unwrap();

        store.clear_offline_queue().await.unwrap();
        assert!(store.get_offline_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_writes_leave_queue_unchanged() {
        let store = MemoryQueueStore::new();
        store
            .add_to_offline_queue(QueueItem::new("file:///1.jpg"))
            .await
            .unwrap();

        store.set_fail_writes(true);
        let add = store
            .add_to_offline_queue(QueueItem::new("file:///2.jpg"))
            .await;
        assert!(matches!(add, Err(Error::Persistence(_))));
        assert!(matches!(
            store.clear_offline_queue().await,
            Err(Error::Persistence(_))
        ));

        assert_eq!(store.get_offline_queue().await.unwrap().len(), 1);
    }
}
