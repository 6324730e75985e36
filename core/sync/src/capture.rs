//! Geofenced capture: only enqueue readings taken near the target asset.

use std::sync::Arc;
use tracing::{info, warn};

use accuread_common::{Coordinate, Error, QueueItem, Result};
use accuread_geofence::{Geofence, GeofencingService, ProximityResult};
use accuread_storage::PersistentQueueStore;

use crate::orchestrator::SyncOrchestrator;
use crate::upload::UploadCollaborator;

/// An accepted capture.
#[derive(Debug, Clone)]
pub struct CaptureReceipt {
    /// The queued item.
    pub item: QueueItem,
    /// The proximity check that admitted it.
    pub proximity: ProximityResult,
}

/// Gate in front of the offline queue that rejects out-of-range captures.
pub struct CaptureGate<S, U>
where
    S: PersistentQueueStore + ?Sized,
    U: UploadCollaborator + ?Sized,
{
    orchestrator: Arc<SyncOrchestrator<S, U>>,
    geofencing: GeofencingService,
}

impl<S, U> CaptureGate<S, U>
where
    S: PersistentQueueStore + ?Sized + 'static,
    U: UploadCollaborator + ?Sized + 'static,
{
    pub fn new(orchestrator: Arc<SyncOrchestrator<S, U>>) -> Self {
        Self {
            orchestrator,
            geofencing: GeofencingService::new(),
        }
    }

    /// Enqueue `payload_ref` if `position` is strictly inside `fence`.
    ///
    /// # Errors
    /// - `Error::OutOfRange` if the worker is not inside the fence; nothing is queued
    /// - `Error::Persistence` if the store write fails
    pub async fn capture(
        &self,
        position: &Coordinate,
        fence: &Geofence,
        payload_ref: impl Into<String>,
    ) -> Result<CaptureReceipt> {
        let proximity = self
            .geofencing
            .check(position, fence.center(), fence.radius_meters())?;

        if !proximity.is_within_range {
            warn!(
                "Capture rejected at {}: {:.1} m from {} (radius {} m)",
                position,
                proximity.distance_meters,
                fence.center(),
                fence.radius_meters()
            );
            return Err(Error::OutOfRange {
                distance_meters: proximity.distance_meters,
                radius_meters: fence.radius_meters(),
            });
        }

        let item = self.orchestrator.add_to_queue(payload_ref).await?;
        info!(
            "Capture {} accepted {:.1} m from target",
            item.id, proximity.distance_meters
        );

        Ok(CaptureReceipt { item, proximity })
    }
}
