//! The in-memory state of one run and its accumulation rules.
//!
//! Distance is derived from the sample sequence only: `add_sample` is the
//! single place it changes. Duration only advances while `Running`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo;
use crate::metrics;
use crate::sample::LocationSample;

/// Lifecycle state of the run controller.
///
/// ```text
/// Idle -> Running <-> Paused
///            \         /
///             Finished -> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    /// Transient: the record is being built and persisted.
    Finished,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Accumulated state of the active run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSession {
    id: String,
    state: RunState,
    started_at: DateTime<Utc>,
    samples: Vec<LocationSample>,
    distance_meters: f64,
    duration_seconds: u64,
    current_speed: f64,
    max_speed: f64,
}

impl RunSession {
    /// A fresh session in the `Running` state with zeroed counters.
    pub fn new(id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            state: RunState::Running,
            started_at,
            samples: Vec::new(),
            distance_meters: 0.0,
            duration_seconds: 0,
            current_speed: 0.0,
            max_speed: 0.0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn samples(&self) -> &[LocationSample] {
        &self.samples
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    /// Speed reported by the latest sample, in m/s (0 when unknown).
    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    /// Highest instantaneous speed seen so far, in m/s.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn average_speed(&self) -> f64 {
        metrics::average_speed(self.distance_meters, self.duration_seconds)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Append a sample and return the distance increment it contributed.
    pub fn add_sample(&mut self, sample: LocationSample) -> f64 {
        let increment = match self.samples.last() {
            Some(prev) => geo::distance(prev.coordinate(), sample.coordinate()),
            None => 0.0,
        };
        self.samples.push(sample);
        self.distance_meters += increment;
        self.current_speed = sample.instantaneous_speed().unwrap_or(0.0);
        self.max_speed = self.max_speed.max(self.current_speed);
        increment
    }

    /// Advance the duration by one second. Returns false (and changes
    /// nothing) unless the session is running.
    pub fn tick(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        self.duration_seconds += 1;
        true
    }

    pub(crate) fn set_state(&mut self, state: RunState) {
        self.state = state;
    }
}
