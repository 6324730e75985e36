//! Upload collaborator contract.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use accuread_common::{Error, QueueItem, Result};

/// Transfers a batch of captures to the backend.
///
/// The batch succeeds or fails as a whole. Implementations should be
/// idempotent per item id, since a batch that failed part-way is sent again
/// in full on the next sync.
#[async_trait]
pub trait UploadCollaborator: Send + Sync {
    /// Get the uploader name.
    fn name(&self) -> &str;

    /// Upload every item of the batch.
    ///
    /// # Errors
    /// - `Error::Network` for transient transport failures (retryable)
    /// - `Error::Upload` when the batch is rejected
    async fn upload(&self, items: &[QueueItem]) -> Result<()>;
}

/// Uploader that copies each payload file into an outbox directory.
///
/// Files are named `<item id>-<original file name>`, so sending the same
/// batch twice overwrites instead of duplicating.
pub struct DirectoryUploader {
    outbox: PathBuf,
}

impl DirectoryUploader {
    /// Create an uploader targeting the given outbox.
    pub fn new(outbox: impl AsRef<Path>) -> Self {
        Self {
            outbox: outbox.as_ref().to_path_buf(),
        }
    }

    /// Outbox directory.
    pub fn outbox(&self) -> &Path {
        &self.outbox
    }

    fn source_path(payload_ref: &str) -> PathBuf {
        PathBuf::from(payload_ref.strip_prefix("file://").unwrap_or(payload_ref))
    }
}

#[async_trait]
impl UploadCollaborator for DirectoryUploader {
    fn name(&self) -> &str {
        "directory"
    }

    async fn upload(&self, items: &[QueueItem]) -> Result<()> {
        fs::create_dir_all(&self.outbox).await.map_err(|e| {
            Error::Network(format!("outbox {} unavailable: {}", self.outbox.display(), e))
        })?;

        for item in items {
            let source = Self::source_path(&item.payload_ref);
            let file_name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::Upload(format!("payload '{}' has no file name", item.payload_ref))
                })?;
            let target = self.outbox.join(format!("{}-{}", item.id, file_name));

            fs::copy(&source, &target).await.map_err(|e| {
                Error::Upload(format!("cannot upload '{}': {}", item.payload_ref, e))
            })?;
            debug!("Uploaded {} to {}", item.id, target.display());
        }

        Ok(())
    }
}
