//! Finalized run summaries, as persisted in history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{self, Coordinate};
use crate::metrics;
use crate::sample::LocationSample;
use crate::session::RunSession;

/// Immutable summary of a completed run.
///
/// The camelCase JSON shape is the persisted schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    pub average_speed_meters_per_second: f64,
    pub samples: Vec<LocationSample>,
    #[serde(default)]
    pub max_speed_meters_per_second: f64,
    #[serde(default)]
    pub estimated_calories: u32,
}

impl RunRecord {
    /// Summarize a session that ended at `end_time`.
    pub fn from_session(session: &RunSession, end_time: DateTime<Utc>, kcal_per_km: f64) -> Self {
        let distance = session.distance_meters();
        let duration = session.duration_seconds();
        Self {
            id: session.id().to_string(),
            start_time: session.started_at(),
            end_time,
            distance_meters: distance,
            duration_seconds: duration,
            average_speed_meters_per_second: metrics::average_speed(distance, duration),
            samples: session.samples().to_vec(),
            max_speed_meters_per_second: session.max_speed(),
            estimated_calories: metrics::estimated_calories(distance, kcal_per_km),
        }
    }

    pub fn pace(&self) -> String {
        metrics::format_pace(self.distance_meters, self.duration_seconds)
    }

    pub fn path(&self) -> Vec<Coordinate> {
        self.samples.iter().map(LocationSample::coordinate).collect()
    }

    /// GeoJSON line of the recorded track, `None` when no samples were kept.
    pub fn to_geojson(&self) -> Option<serde_json::Value> {
        let mut feature = geo::to_geojson(&self.path())?;
        feature["properties"] = serde_json::json!({
            "id": self.id,
            "startTime": self.start_time,
            "distanceMeters": self.distance_meters,
            "durationSeconds": self.duration_seconds,
        });
        Some(feature)
    }
}
