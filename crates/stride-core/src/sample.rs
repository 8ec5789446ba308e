//! Location samples and the raw platform fixes they are built from.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::Coordinate;

/// One validated GPS sample, in arrival order.
///
/// Deserialization goes through [`LocationSample::new`], so stored samples
/// are held to the same rules as live ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredSample")]
pub struct LocationSample {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: Option<f64>,
    #[serde(default)]
    instantaneous_speed: Option<f64>,
    /// Milliseconds since the Unix epoch, as reported by the source.
    timestamp: i64,
}

/// Unchecked wire shape of [`LocationSample`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSample {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: Option<f64>,
    #[serde(default)]
    instantaneous_speed: Option<f64>,
    timestamp: i64,
}

impl TryFrom<StoredSample> for LocationSample {
    type Error = ValidationError;

    fn try_from(raw: StoredSample) -> Result<Self, Self::Error> {
        LocationSample::new(
            raw.latitude,
            raw.longitude,
            raw.altitude,
            raw.instantaneous_speed,
            raw.timestamp,
        )
    }
}

impl LocationSample {
    /// Build a sample, rejecting coordinates off the globe.
    ///
    /// A negative or non-finite speed is how platforms say "unknown", so it
    /// becomes `None` rather than an error. Same for a non-finite altitude.
    pub fn new(
        latitude: f64,
        longitude: f64,
        altitude: Option<f64>,
        instantaneous_speed: Option<f64>,
        timestamp: i64,
    ) -> Result<Self, ValidationError> {
        if !latitude.is_finite() {
            return Err(ValidationError::NonFinite("latitude"));
        }
        if !longitude.is_finite() {
            return Err(ValidationError::NonFinite("longitude"));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            altitude: altitude.filter(|a| a.is_finite()),
            instantaneous_speed: instantaneous_speed.filter(|s| s.is_finite() && *s >= 0.0),
            timestamp,
        })
    }

    /// Shorthand for a sample with only a position and a time.
    pub fn at(latitude: f64, longitude: f64, timestamp: i64) -> Result<Self, ValidationError> {
        Self::new(latitude, longitude, None, None, timestamp)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn instantaneous_speed(&self) -> Option<f64> {
        self.instantaneous_speed
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Coordinates block of a platform fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCoords {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Meters per second; platforms report -1 when unknown.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Horizontal accuracy radius in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// A position fix as delivered by a platform location service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub coords: RawCoords,
    pub timestamp: i64,
}

impl RawFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            coords: RawCoords {
                latitude,
                longitude,
                altitude: None,
                speed: None,
                accuracy: None,
            },
            timestamp,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.coords.speed = Some(speed);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.coords.altitude = Some(altitude);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.coords.latitude, self.coords.longitude)
    }
}

impl TryFrom<RawFix> for LocationSample {
    type Error = ValidationError;

    fn try_from(fix: RawFix) -> Result<Self, Self::Error> {
        LocationSample::new(
            fix.coords.latitude,
            fix.coords.longitude,
            fix.coords.altitude,
            fix.coords.speed,
            fix.timestamp,
        )
    }
}
