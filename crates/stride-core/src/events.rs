use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::RunRecord;
use crate::sample::LocationSample;
use crate::session::RunState;

/// Asynchronous deliveries into the session, tagged with the generation of
/// the subscription that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Sample {
        generation: u64,
        sample: LocationSample,
    },
    Tick {
        generation: u64,
    },
}

impl SessionInput {
    pub fn generation(&self) -> u64 {
        match self {
            SessionInput::Sample { generation, .. } | SessionInput::Tick { generation } => {
                *generation
            }
        }
    }
}

/// Every lifecycle change produces an Event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        at: DateTime<Utc>,
    },
    RunPaused {
        run_id: String,
        distance_meters: f64,
        duration_seconds: u64,
        at: DateTime<Utc>,
    },
    RunResumed {
        run_id: String,
        at: DateTime<Utc>,
    },
    RunFinished {
        run_id: String,
        distance_meters: f64,
        duration_seconds: u64,
        average_speed_meters_per_second: f64,
        at: DateTime<Utc>,
    },
}

impl RunEvent {
    /// The event describing a persisted run.
    pub fn finished(record: &RunRecord) -> Self {
        RunEvent::RunFinished {
            run_id: record.id.clone(),
            distance_meters: record.distance_meters,
            duration_seconds: record.duration_seconds,
            average_speed_meters_per_second: record.average_speed_meters_per_second,
            at: record.end_time,
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::RunPaused { run_id, .. }
            | RunEvent::RunResumed { run_id, .. }
            | RunEvent::RunFinished { run_id, .. } => run_id,
        }
    }
}

/// Read-only view of the controller for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub state: RunState,
    pub run_id: Option<String>,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    /// m/s, from the latest sample
    pub current_speed: f64,
    pub average_speed: f64,
    pub sample_count: usize,
    /// `m:ss` per kilometer
    pub pace: String,
}

impl RunSnapshot {
    pub fn idle() -> Self {
        Self {
            state: RunState::Idle,
            run_id: None,
            distance_meters: 0.0,
            duration_seconds: 0,
            current_speed: 0.0,
            average_speed: 0.0,
            sample_count: 0,
            pace: "0:00".into(),
        }
    }
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
