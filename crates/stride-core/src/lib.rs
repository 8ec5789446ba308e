//! # Stride Core Library
//!
//! Run tracking engine: records a run as an ordered series of location
//! samples, accumulates distance and elapsed time while the run is active,
//! and persists a summarized record when the run is finished.
//!
//! ## Architecture
//!
//! - **Controller**: a state machine (`Idle -> Running <-> Paused -> Idle`)
//!   that owns the active session and consumes producer inputs one at a time
//! - **Producers**: a location ingestor over a pluggable provider and a
//!   once-per-second duration ticker, both tagged with a subscription
//!   generation so late deliveries are dropped
//! - **Tracker**: a tokio task wrapping the controller, with a watch channel
//!   of snapshots for presentation layers
//! - **Storage**: run history as JSON behind a key-value store (SQLite or
//!   memory) and TOML configuration
//!
//! ## Key Components
//!
//! - [`RunSessionController`]: lifecycle and session mutation
//! - [`RunTracker`]: async handle to a running controller
//! - [`RunHistoryStore`]: persisted run records
//! - [`Config`]: application configuration management

pub mod controller;
pub mod error;
pub mod events;
pub mod geo;
pub mod location;
pub mod metrics;
pub mod record;
pub mod sample;
pub mod session;
pub mod stats;
pub mod storage;
pub mod ticker;
pub mod tracker;

pub use controller::RunSessionController;
pub use error::{Action, ConfigError, CoreError, StorageError, TrackingError, ValidationError};
pub use events::{RunEvent, RunSnapshot, SessionInput};
pub use geo::Coordinate;
pub use location::{
    AccuracyTier, LocationIngestor, LocationProvider, PermissionStatus, ReplayProvider,
    WatchOptions,
};
pub use record::RunRecord;
pub use sample::{LocationSample, RawCoords, RawFix};
pub use session::{RunSession, RunState};
pub use stats::HistoryStats;
pub use storage::{Config, Database, KeyValueStore, MemoryStore, RunHistoryStore};
pub use ticker::DurationTicker;
pub use tracker::RunTracker;
