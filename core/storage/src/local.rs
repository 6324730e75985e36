//! Local filesystem queue store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::provider::PersistentQueueStore;
use accuread_common::{Error, QueueItem, Result};

/// File name of the persisted queue registry.
pub const REGISTRY_FILENAME: &str = "offline_queue.json";

/// Local filesystem queue store.
///
/// Keeps the queue as a JSON array in `<root>/offline_queue.json`. Every write
/// goes to a temporary file first and is then renamed over the registry, so
/// the registry on disk is always either the old or the new queue.
pub struct LocalQueueStore {
    root: PathBuf,
    registry_path: PathBuf,
    /// Serializes read-modify-write cycles on the registry.
    write_lock: Mutex<()>,
}

impl LocalQueueStore {
    /// Create a new local store rooted at the given directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    /// - An existing registry is picked up as-is
    ///
    /// # Errors
    /// - Root directory cannot be created
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| persistence("create store directory", &root, e))?;

        let registry_path = root.join(REGISTRY_FILENAME);
        Ok(Self {
            root,
            registry_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the registry file.
    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    async fn read_registry(&self) -> Result<Vec<QueueItem>> {
        let content = match fs::read_to_string(&self.registry_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence("read queue", &self.registry_path, e)),
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::Persistence(format!(
                "corrupt queue registry {}: {}",
                self.registry_path.display(),
                e
            ))
        })
    }

    async fn write_registry(&self, items: &[QueueItem]) -> Result<()> {
        let json = serde_json::to_string_pretty(items)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let tmp_path = self.registry_path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .map_err(|e| persistence("write queue", &tmp_path, e))?;
        fs::rename(&tmp_path, &self.registry_path)
            .await
            .map_err(|e| persistence("commit queue", &self.registry_path, e))
    }
}

fn persistence(action: &str, path: &Path, err: std::io::Error) -> Error {
    Error::Persistence(format!("failed to {} at {}: {}", action, path.display(), err))
}

#[async_trait]
impl PersistentQueueStore for LocalQueueStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn get_offline_queue(&self) -> Result<Vec<QueueItem>> {
        self.read_registry().await
    }

    async fn add_to_offline_queue(&self, item: QueueItem) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut items = self.read_registry().await?;
        debug!("Persisting queue item {} ({} pending)", item.id, items.len() + 1);
        items.push(item);
        self.write_registry(&items).await
    }

    async fn clear_offline_queue(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_registry(&[]).await
    }
}
