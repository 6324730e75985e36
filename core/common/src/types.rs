//! Common types used throughout AccuRead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A geographic point in decimal degrees.
///
/// Values are validated on construction; a `Coordinate` in hand is always
/// within `[-90, 90]` latitude and `[-180, 180]` longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = crate::Error;

    fn try_from(raw: RawCoordinate) -> crate::Result<Self> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a new coordinate.
    ///
    /// # Errors
    /// - Latitude outside `[-90, 90]` or not finite
    /// - Longitude outside `[-180, 180]` or not finite
    pub fn new(latitude: f64, longitude: f64) -> crate::Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(crate::Error::Validation(format!(
                "latitude {} is outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(crate::Error::Validation(format!(
                "longitude {} is outside [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Parses `"lat,lon"`.
impl FromStr for Coordinate {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let (lat, lon) = s.split_once(',').ok_or_else(|| {
            crate::Error::InvalidInput(format!("expected LAT,LON but got '{}'", s))
        })?;
        let parse = |part: &str| {
            part.trim().parse::<f64>().map_err(|e| {
                crate::Error::InvalidInput(format!("invalid number '{}': {}", part.trim(), e))
            })
        };
        Self::new(parse(lat)?, parse(lon)?)
    }
}

/// Unique identifier for a queued capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create an ItemId from an existing string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "ItemId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A capture waiting in the offline queue.
///
/// Owned by the queue from creation until the batch containing it has been
/// uploaded or the queue is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique ID for this item.
    pub id: ItemId,
    /// Reference to the captured payload (local file handle or URI).
    pub payload_ref: String,
    /// When the item was enqueued.
    pub enqueued_at: DateTime<Utc>,
}

impl QueueItem {
    /// Create a new item with a fresh id and the current time.
    pub fn new(payload_ref: impl Into<String>) -> Self {
        Self {
            id: ItemId::generate(),
            payload_ref: payload_ref.into(),
            enqueued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_coordinate_bounds_inclusive() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_coordinate_out_of_range() {
        assert!(matches!(
            Coordinate::new(90.0001, 0.0),
            Err(crate::Error::Validation(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, -180.5),
            Err(crate::Error::Validation(_))
        ));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_coordinate_parse() {
        let c: Coordinate = "28.6139, 77.2090".parse().unwrap();
        assert_eq!(c.latitude(), 28.6139);
        assert_eq!(c.longitude(), 77.2090);

        assert!("28.6139".parse::<Coordinate>().is_err());
        assert!("abc,1".parse::<Coordinate>().is_err());
        assert!("95,1".parse::<Coordinate>().is_err());
    }

    #[test]
    fn test_coordinate_deserialize_validates() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 19.076, "longitude": 72.8777}"#).unwrap();
        assert_eq!(ok.latitude(), 19.076);

        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude": 100.0, "longitude": 0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_item_ids_are_unique() {
        let a = QueueItem::new("file:///a.jpg");
        let b = QueueItem::new("file:///a.jpg");
        assert_ne!(a.id, b.id);
        assert_eq!(a.payload_ref, b.payload_ref);
    }

    #[test]
    fn test_item_id_empty_fails() {
        assert!(ItemId::new("").is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_coordinates_accepted(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let c = Coordinate::new(lat, lon).unwrap();
            prop_assert_eq!(c.latitude(), lat);
            prop_assert_eq!(c.longitude(), lon);
        }
    }
}
