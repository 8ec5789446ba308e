//! Location sources and the ingestor bridging them into a run.
//!
//! A [`LocationProvider`] stands in for the platform location service: it
//! answers permission queries and pushes [`RawFix`]es into a sink until the
//! watch is cleared. The [`LocationIngestor`] validates those fixes and
//! forwards them, tagged with a generation, to the controller's inbox.

mod ingestor;
mod replay;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::sample::RawFix;

pub use ingestor::{LocationIngestor, SubscriptionHandle};
pub use replay::{ReplayProvider, ReplayStatus};

/// Outcome of a permission check or request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Requested fix accuracy, from cheapest to most precise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
    #[default]
    BestForNavigation,
}

/// How often the platform should call back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatchOptions {
    pub accuracy: AccuracyTier,
    /// Minimum movement between two fixes.
    pub min_distance_meters: f64,
    /// Minimum time between two fixes.
    pub min_interval_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: AccuracyTier::default(),
            min_distance_meters: 5.0,
            min_interval_ms: 1000,
        }
    }
}

/// Callback a provider invokes for every fix, possibly from another thread.
pub type FixSink = Arc<dyn Fn(RawFix) + Send + Sync>;

/// Identifier of one active platform watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Platform location service.
pub trait LocationProvider: Send {
    fn check_permission(&self) -> PermissionStatus;

    /// Prompt for permission if the platform supports it.
    fn request_permission(&mut self) -> PermissionStatus;

    /// Begin delivering fixes to `sink`.
    ///
    /// # Errors
    /// `SourceUnavailable` when the platform cannot produce fixes.
    fn watch_position(
        &mut self,
        options: &WatchOptions,
        sink: FixSink,
    ) -> Result<WatchId, TrackingError>;

    /// Stop a watch. Fixes may still trickle in briefly afterwards.
    fn clear_watch(&mut self, id: WatchId);
}
