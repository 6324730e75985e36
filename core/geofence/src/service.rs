//! Haversine distance and proximity computation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use accuread_common::{Coordinate, Error, Result};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Outcome of a proximity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityResult {
    /// Great-circle distance between the two points.
    pub distance_meters: f64,
    /// Whether the distance is strictly below the radius.
    pub is_within_range: bool,
}

/// Stateless geodesic calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeofencingService;

impl GeofencingService {
    /// Create a new service.
    pub fn new() -> Self {
        Self
    }

    /// Great-circle distance in meters between two points given in degrees.
    ///
    /// # Errors
    /// - Any latitude outside `[-90, 90]` or longitude outside `[-180, 180]`
    pub fn calculate_distance(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
        let from = Coordinate::new(lat1, lon1)?;
        let to = Coordinate::new(lat2, lon2)?;
        Ok(self.distance_between(&from, &to))
    }

    /// Great-circle distance in meters between two validated coordinates.
    pub fn distance_between(&self, from: &Coordinate, to: &Coordinate) -> f64 {
        let phi1 = from.latitude().to_radians();
        let phi2 = to.latitude().to_radians();
        let delta_phi = (to.latitude() - from.latitude()).to_radians();
        let delta_lambda = (to.longitude() - from.longitude()).to_radians();

        let a = (delta_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
        // Rounding can push `a` a hair past 1 for antipodal points.
        let a = a.clamp(0.0, 1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }

    /// Check whether the current position is strictly inside `radius_meters`
    /// of the target.
    ///
    /// A point exactly on the boundary is not within range.
    ///
    /// # Errors
    /// - Negative or non-finite radius
    /// - Any coordinate out of range
    pub fn check_proximity(
        &self,
        current_lat: f64,
        current_lon: f64,
        target_lat: f64,
        target_lon: f64,
        radius_meters: f64,
    ) -> Result<ProximityResult> {
        let current = Coordinate::new(current_lat, current_lon)?;
        let target = Coordinate::new(target_lat, target_lon)?;
        self.check(&current, &target, radius_meters)
    }

    /// Proximity check over validated coordinates.
    pub fn check(
        &self,
        current: &Coordinate,
        target: &Coordinate,
        radius_meters: f64,
    ) -> Result<ProximityResult> {
        validate_radius(radius_meters)?;

        let distance_meters = self.distance_between(current, target);
        let is_within_range = distance_meters < radius_meters;
        debug!(
            "Proximity {} -> {}: {:.2} m (radius {} m, within: {})",
            current, target, distance_meters, radius_meters, is_within_range
        );

        Ok(ProximityResult {
            distance_meters,
            is_within_range,
        })
    }
}

pub(crate) fn validate_radius(radius_meters: f64) -> Result<()> {
    if !radius_meters.is_finite() || radius_meters < 0.0 {
        return Err(Error::Validation(format!(
            "radius must be a non-negative number of meters, got {}",
            radius_meters
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TARGET: (f64, f64) = (28.6139, 77.2090);

    #[test]
    fn test_identical_points_zero_distance() {
        let service = GeofencingService::new();
        let d = service
            .calculate_distance(TARGET.0, TARGET.1, TARGET.0, TARGET.1)
            .unwrap();
        assert!(d < 1e-6);
    }

    #[test]
    fn test_nearby_point_within_range() {
        let service = GeofencingService::new();
        let result = service
            .check_proximity(28.61391, 77.20901, TARGET.0, TARGET.1, 10.0)
            .unwrap();
        assert!(result.is_within_range);
        assert!(result.distance_meters < 10.0);
    }

    #[test]
    fn test_distant_point_out_of_range() {
        let service = GeofencingService::new();
        let result = service
            .check_proximity(28.6150, 77.2100, TARGET.0, TARGET.1, 10.0)
            .unwrap();
        assert!(!result.is_within_range);
        assert!(result.distance_meters > 10.0);
    }

    #[test]
    fn test_delhi_to_mumbai() {
        let service = GeofencingService::new();
        let d = service
            .calculate_distance(TARGET.0, TARGET.1, 19.0760, 72.8777)
            .unwrap();
        assert!(d > 1_100_000.0 && d < 1_200_000.0, "got {}", d);
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let service = GeofencingService::new();
        let d = service
            .calculate_distance(28.6150, 77.2100, TARGET.0, TARGET.1)
            .unwrap();
        let result = service
            .check_proximity(28.6150, 77.2100, TARGET.0, TARGET.1, d)
            .unwrap();
        assert!(!result.is_within_range);
    }

    #[test]
    fn test_zero_radius_never_within() {
        let service = GeofencingService::new();
        let result = service
            .check_proximity(TARGET.0, TARGET.1, TARGET.0, TARGET.1, 0.0)
            .unwrap();
        assert!(!result.is_within_range);
    }

    #[test]
    fn test_negative_radius_rejected() {
        let service = GeofencingService::new();
        let result = service.check_proximity(TARGET.0, TARGET.1, TARGET.0, TARGET.1, -1.0);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let service = GeofencingService::new();
        assert!(matches!(
            service.calculate_distance(91.0, 0.0, 0.0, 0.0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.calculate_distance(0.0, 0.0, 0.0, 181.0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_antipodal_points() {
        let service = GeofencingService::new();
        let d = service.calculate_distance(0.0, 0.0, 0.0, 180.0).unwrap();
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((d - half_circumference).abs() < 1.0);
    }

    proptest! {
        #[test]
        fn prop_distance_to_self_is_zero(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let d = GeofencingService::new().calculate_distance(lat, lon, lat, lon).unwrap();
            prop_assert!(d < 1e-6);
        }

        #[test]
        fn prop_distance_is_symmetric(
            lat1 in -90.0f64..=90.0,
            lon1 in -180.0f64..=180.0,
            lat2 in -90.0f64..=90.0,
            lon2 in -180.0f64..=180.0,
        ) {
            let service = GeofencingService::new();
            let ab = service.calculate_distance(lat1, lon1, lat2, lon2).unwrap();
            let ba = service.calculate_distance(lat2, lon2, lat1, lon1).unwrap();
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!(ab >= 0.0);
        }
    }
}
