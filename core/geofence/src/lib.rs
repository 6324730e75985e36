//! AccuRead geofencing.
//!
//! Great-circle distance and proximity checks used to confirm that a worker
//! is standing near the asset being read before a capture is accepted.

pub mod fence;
pub mod service;

pub use fence::{Geofence, GeofenceConfig};
pub use service::{GeofencingService, ProximityResult, EARTH_RADIUS_METERS};
