//! Circular geofences around target assets.

use serde::{Deserialize, Serialize};

use accuread_common::{Coordinate, Result};

use crate::service::{validate_radius, GeofencingService, ProximityResult};

/// Geofence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    /// Radius applied when a target carries no radius of its own.
    pub default_radius_meters: f64,
}

impl GeofenceConfig {
    /// Reject a negative or non-finite default radius.
    pub fn validate(&self) -> Result<()> {
        validate_radius(self.default_radius_meters)
    }
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: 10.0,
        }
    }
}

/// A circular region around a target asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Geofence {
    center: Coordinate,
    radius_meters: f64,
}

impl Geofence {
    /// Create a geofence.
    ///
    /// # Errors
    /// - Negative or non-finite radius
    pub fn new(center: Coordinate, radius_meters: f64) -> Result<Self> {
        validate_radius(radius_meters)?;
        Ok(Self {
            center,
            radius_meters,
        })
    }

    /// Create a geofence using the configured default radius.
    pub fn with_config(center: Coordinate, config: &GeofenceConfig) -> Result<Self> {
        Self::new(center, config.default_radius_meters)
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Check a position against this fence.
    pub fn contains(&self, position: &Coordinate) -> ProximityResult {
        let distance_meters = GeofencingService::new().distance_between(position, &self.center);
        ProximityResult {
            distance_meters,
            is_within_range: distance_meters < self.radius_meters,
        }
    }
}
