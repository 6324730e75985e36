//! Persistent queue store trait definition.

use async_trait::async_trait;

use accuread_common::{QueueItem, Result};

/// Durable, ordered storage of pending captures.
///
/// Implementations must survive process restarts and must not reorder items.
#[async_trait]
pub trait PersistentQueueStore: Send + Sync {
    /// Get the store name (e.g., "memory", "local").
    fn name(&self) -> &str;

    /// Read the whole queue.
    ///
    /// # Postconditions
    /// - Items are returned in the order they were added
    ///
    /// # Errors
    /// - `Error::Persistence` if the backing storage cannot be read
    async fn get_offline_queue(&self) -> Result<Vec<QueueItem>>;

    /// Append an item to the end of the queue.
    ///
    /// # Postconditions
    /// - On success the item is durable
    /// - On failure the queue is unchanged
    ///
    /// # Errors
    /// - `Error::Persistence` if the write fails
    async fn add_to_offline_queue(&self, item: QueueItem) -> Result<()>;

    /// Remove every item from the queue.
    ///
    /// # Errors
    /// - `Error::Persistence` if the write fails
    async fn clear_offline_queue(&self) -> Result<()>;
}
