//! A location provider that plays back a recorded track.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{FixSink, LocationProvider, PermissionStatus, WatchId, WatchOptions};
use crate::error::{Result, TrackingError};
use crate::geo::{self, Coordinate};
use crate::sample::{LocationSample, RawFix};

/// Playback progress, observable through [`ReplayProvider::status`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStatus {
    /// Fixes handed to a sink.
    pub emitted: usize,
    /// Fixes skipped for being closer than the minimum distance.
    pub skipped: usize,
    /// Every recorded fix has been emitted or skipped.
    pub exhausted: bool,
}

#[derive(Debug, Default)]
struct Cursor {
    next: usize,
    last_emitted: Option<Coordinate>,
}

/// Emits recorded fixes at the watch interval, one per tick.
///
/// Playback position survives `clear_watch`, so a paused run resumes where
/// the recording left off, the way a real receiver keeps moving with the
/// runner. Fixes closer than `min_distance_meters` to the previously emitted
/// one are skipped, matching platform distance filtering.
pub struct ReplayProvider {
    fixes: Arc<Vec<RawFix>>,
    permission: PermissionStatus,
    grant_on_request: bool,
    available: bool,
    interval: Option<Duration>,
    cursor: Arc<Mutex<Cursor>>,
    status: Arc<watch::Sender<ReplayStatus>>,
    watches: HashMap<WatchId, JoinHandle<()>>,
    next_watch: u64,
}

impl ReplayProvider {
    /// Replay `fixes` with permission already granted.
    pub fn new(fixes: Vec<RawFix>) -> Self {
        let (status, _) = watch::channel(ReplayStatus::default());
        Self {
            fixes: Arc::new(fixes),
            permission: PermissionStatus::Granted,
            grant_on_request: true,
            available: true,
            interval: None,
            cursor: Arc::new(Mutex::new(Cursor::default())),
            status: Arc::new(status),
            watches: HashMap::new(),
            next_watch: 0,
        }
    }

    /// Load a JSON array of fixes (`{"coords": {...}, "timestamp": ms}`).
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixes: Vec<RawFix> = serde_json::from_str(&content)?;
        Ok(Self::new(fixes))
    }

    /// Start with the given permission; `request_permission` will not change it.
    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self.grant_on_request = false;
        self
    }

    /// Start denied, but grant when asked.
    pub fn prompting(mut self) -> Self {
        self.permission = PermissionStatus::Denied;
        self.grant_on_request = true;
        self
    }

    /// Simulate a platform without a usable location service.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Emit at this period instead of the watch's `min_interval_ms`.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn status(&self) -> watch::Receiver<ReplayStatus> {
        self.status.subscribe()
    }

    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }
}

/// Advance the cursor to the next fix worth emitting.
///
/// Fixes that would not make a valid sample are skipped and never become
/// the reference point for the distance filter.
fn next_fix(
    cursor: &mut Cursor,
    fixes: &[RawFix],
    min_distance: f64,
    skipped: &mut usize,
) -> Option<RawFix> {
    while let Some(fix) = fixes.get(cursor.next).copied() {
        cursor.next += 1;
        if LocationSample::try_from(fix).is_err() {
            tracing::debug!(timestamp = fix.timestamp, "skipping invalid replay fix");
            *skipped += 1;
            continue;
        }
        let too_close = cursor
            .last_emitted
            .is_some_and(|last| geo::distance(last, fix.coordinate()) < min_distance);
        if too_close {
            *skipped += 1;
            continue;
        }
        cursor.last_emitted = Some(fix.coordinate());
        return Some(fix);
    }
    None
}

impl LocationProvider for ReplayProvider {
    fn check_permission(&self) -> PermissionStatus {
        self.permission
    }

    fn request_permission(&mut self) -> PermissionStatus {
        if self.grant_on_request {
            self.permission = PermissionStatus::Granted;
        }
        self.permission
    }

    fn watch_position(
        &mut self,
        options: &WatchOptions,
        sink: FixSink,
    ) -> Result<WatchId, TrackingError> {
        if !self.available {
            return Err(TrackingError::SourceUnavailable(
                "replay source disabled".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            TrackingError::SourceUnavailable("no async runtime to drive replay".into())
        })?;

        let period = self
            .interval
            .unwrap_or_else(|| Duration::from_millis(options.min_interval_ms.max(1)));
        let min_distance = options.min_distance_meters.max(0.0);
        let fixes = Arc::clone(&self.fixes);
        let cursor = Arc::clone(&self.cursor);
        let status = Arc::clone(&self.status);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let mut skipped = 0;
                let fix = {
                    let Ok(mut cursor) = cursor.lock() else {
                        break;
                    };
                    next_fix(&mut cursor, &fixes, min_distance, &mut skipped)
                };
                match fix {
                    Some(fix) => {
                        sink(fix);
                        status.send_modify(|s| {
                            s.emitted += 1;
                            s.skipped += skipped;
                        });
                    }
                    None => {
                        status.send_modify(|s| {
                            s.skipped += skipped;
                            s.exhausted = true;
                        });
                        tracing::debug!("replay track exhausted");
                        break;
                    }
                }
            }
        });

        self.next_watch += 1;
        let id = WatchId(self.next_watch);
        self.watches.insert(id, task);
        Ok(id)
    }

    fn clear_watch(&mut self, id: WatchId) {
        if let Some(task) = self.watches.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for ReplayProvider {
    fn drop(&mut self) {
        for (_, task) in self.watches.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Vec<RawFix> {
        vec![
            RawFix::new(48.8566, 2.3522, 0),
            // ~1 m from the first fix
            RawFix::new(48.85661, 2.3522, 500),
            RawFix::new(48.8576, 2.3532, 1_000),
        ]
    }

    fn collecting_sink() -> (FixSink, Arc<Mutex<Vec<RawFix>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: FixSink = Arc::new(move |fix| sink_seen.lock().unwrap().push(fix));
        (sink, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn plays_track_honoring_min_distance() {
        let mut provider = ReplayProvider::new(track());
        let mut status = provider.status();
        let (sink, seen) = collecting_sink();
        provider
            .watch_position(&WatchOptions::default(), sink)
            .unwrap();

        status.wait_for(|s| s.exhausted).await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].timestamp, 1_000);
        assert_eq!(status.borrow().skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_fix_does_not_reset_distance_filter() {
        let origin = RawFix::new(48.8566, 2.3522, 0);
        // ~2 m north of the origin
        let nearby = RawFix::new(48.85662, 2.3522, 2_000);
        let track = vec![origin, RawFix::new(95.0, 0.0, 1_000), nearby];
        let mut provider = ReplayProvider::new(track);
        let mut status = provider.status();
        let (sink, seen) = collecting_sink();
        provider
            .watch_position(&WatchOptions::default(), sink)
            .unwrap();

        status.wait_for(|s| s.exhausted).await.unwrap();
        let timestamps: Vec<i64> = seen.lock().unwrap().iter().map(|f| f.timestamp).collect();
        assert_eq!(timestamps, vec![0]);
        assert_eq!(status.borrow().skipped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_from_cursor_after_clear() {
        let mut provider = ReplayProvider::new(track()).with_interval(Duration::from_secs(1));
        let options = WatchOptions {
            min_distance_meters: 0.0,
            ..WatchOptions::default()
        };
        let mut status = provider.status();
        let (sink, seen) = collecting_sink();
        let id = provider.watch_position(&options, sink.clone()).unwrap();
        status.wait_for(|s| s.emitted == 1).await.unwrap();
        provider.clear_watch(id);
        assert_eq!(provider.active_watches(), 0);

        provider.watch_position(&options, sink).unwrap();
        status.wait_for(|s| s.exhausted).await.unwrap();
        let timestamps: Vec<i64> = seen.lock().unwrap().iter().map(|f| f.timestamp).collect();
        assert_eq!(timestamps, vec![0, 500, 1_000]);
    }

    #[test]
    fn watch_needs_runtime_and_availability() {
        let (sink, _) = collecting_sink();
        let mut provider = ReplayProvider::new(track());
        let err = provider
            .watch_position(&WatchOptions::default(), sink.clone())
            .unwrap_err();
        assert!(matches!(err, TrackingError::SourceUnavailable(_)));

        let mut provider = ReplayProvider::new(track()).unavailable();
        let err = provider
            .watch_position(&WatchOptions::default(), sink)
            .unwrap_err();
        assert!(matches!(err, TrackingError::SourceUnavailable(_)));
    }

    #[test]
    fn permission_modes() {
        let mut provider = ReplayProvider::new(vec![]).prompting();
        assert_eq!(provider.check_permission(), PermissionStatus::Denied);
        assert_eq!(provider.request_permission(), PermissionStatus::Granted);

        let mut provider = ReplayProvider::new(vec![]).with_permission(PermissionStatus::Denied);
        assert_eq!(provider.request_permission(), PermissionStatus::Denied);
    }
}
