//! Observable sync state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use accuread_common::{Error, Result};

/// Phase of the sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncPhase {
    /// No sync is running.
    Idle,
    /// A batch upload is in flight.
    Syncing,
}

/// Snapshot of the orchestrator's state, as published to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Whether the connectivity monitor last reported online.
    pub is_online: bool,
    /// Whether a sync is currently in progress.
    pub sync_in_progress: bool,
    /// Number of captures waiting in the queue.
    pub queue_count: usize,
    /// Last successful sync time.
    pub last_sync: Option<DateTime<Utc>>,
    /// Message of the last failed sync, cleared on success.
    pub last_error: Option<String>,
}

impl SyncState {
    /// Startup state: assumed online, idle, empty.
    pub fn new() -> Self {
        Self {
            is_online: true,
            sync_in_progress: false,
            queue_count: 0,
            last_sync: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        if self.sync_in_progress {
            SyncPhase::Syncing
        } else {
            SyncPhase::Idle
        }
    }

    /// Mark as syncing.
    pub fn mark_syncing(&mut self) {
        self.sync_in_progress = true;
    }

    /// Mark as synced successfully.
    pub fn mark_synced(&mut self, at: DateTime<Utc>) {
        self.sync_in_progress = false;
        self.last_sync = Some(at);
        self.last_error = None;
    }

    /// Mark as failed.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.sync_in_progress = false;
        self.last_error = Some(error.into());
    }

    /// Return to idle without recording an outcome.
    pub fn mark_idle(&mut self) {
        self.sync_in_progress = false;
    }

    /// Check if there are captures waiting to be uploaded.
    pub fn has_pending(&self) -> bool {
        self.queue_count > 0
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SyncState::new();
        assert!(state.is_online);
        assert!(!state.sync_in_progress);
        assert_eq!(state.phase(), SyncPhase::Idle);
        assert!(!state.has_pending());
    }

    #[test]
    fn test_failure_then_success() {
        let mut state = SyncState::new();

        state.mark_syncing();
        assert_eq!(state.phase(), SyncPhase::Syncing);

        state.mark_failed("upload rejected");
        assert_eq!(state.phase(), SyncPhase::Idle);
        assert_eq!(state.last_error.as_deref(), Some("upload rejected"));
        assert!(state.last_sync.is_none());

        state.mark_syncing();
        state.mark_synced(Utc::now());
        assert!(!state.sync_in_progress);
        assert!(state.last_error.is_none());
        assert!(state.last_sync.is_some());
    }

    #[test]
    fn test_state_serialization() {
        let mut state = SyncState::new();
        state.queue_count = 3;

        let json = state.to_json().unwrap();
        let restored: SyncState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
