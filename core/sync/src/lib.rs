//! AccuRead Sync Engine
//!
//! This module provides the offline capture queue and its synchronization,
//! including:
//! - A guarded sync state machine with at most one sync in flight
//! - Connectivity observation with reconnect-triggered sync
//! - Retry strategy with exponential backoff for transient upload failures
//! - Manual and periodic scheduling
//! - A geofenced capture gate in front of the queue

pub mod capture;
pub mod connectivity;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod state;
pub mod upload;

// Re-export main types
pub use capture::{CaptureGate, CaptureReceipt};
pub use connectivity::{
    AlwaysOnline, ConnectivityEvent, ConnectivityMonitor, ConnectivitySubscription,
    ManualConnectivity,
};
pub use orchestrator::{SkipReason, SyncConfig, SyncOrchestrator, SyncOutcome};
pub use retry::RetryPolicy;
pub use scheduler::{SyncMode, SyncRequest, SyncScheduler, SyncSchedulerHandle};
pub use state::{SyncPhase, SyncState};
pub use upload::{DirectoryUploader, UploadCollaborator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _config = SyncConfig::default();
        let _retry = RetryPolicy::default();
        let _state = SyncState::new();
        let _monitor = AlwaysOnline;
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"upload_retries": 3, "mode": {"Periodic": {"interval": {"secs": 300, "nanos": 0}}}}"#)
                .unwrap();
        assert_eq!(config.upload_retries, 3);
        assert!(config.sync_on_reconnect);
        assert!(matches!(config.mode, SyncMode::Periodic { .. }));
    }
}
