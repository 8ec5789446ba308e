//! Lifecycle scenarios driven directly through the controller.
//!
//! Producer deliveries are applied by hand with the generation the
//! controller currently expects (or an old one, to simulate late arrivals).

use std::sync::Arc;

use stride_core::{
    Config, KeyValueStore, LocationSample, MemoryStore, PermissionStatus, ReplayProvider,
    RunHistoryStore, RunSessionController, RunState, SessionInput, StorageError, TrackingError,
};

fn controller_with(
    provider: ReplayProvider,
    kv: Box<dyn KeyValueStore>,
) -> RunSessionController {
    let (controller, _inputs) =
        RunSessionController::new(Box::new(provider), RunHistoryStore::new(kv), &Config::default());
    controller
}

fn controller() -> (RunSessionController, Arc<MemoryStore>) {
    let kv = Arc::new(MemoryStore::new());
    let c = controller_with(ReplayProvider::new(Vec::new()), Box::new(Arc::clone(&kv)));
    (c, kv)
}

fn tick(c: &RunSessionController) -> SessionInput {
    SessionInput::Tick {
        generation: c.generation(),
    }
}

fn sample(c: &RunSessionController, lat: f64, lon: f64, t: i64) -> SessionInput {
    SessionInput::Sample {
        generation: c.generation(),
        sample: LocationSample::at(lat, lon, t).unwrap(),
    }
}

/// Store whose writes always fail.
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Poisoned)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test]
async fn two_samples_accumulate_haversine_distance() {
    let (mut c, _) = controller();
    c.start().unwrap();

    assert!(c.apply(sample(&c, 48.8566, 2.3522, 0)));
    assert_eq!(c.distance_meters(), 0.0);
    assert!(c.apply(sample(&c, 48.8576, 2.3532, 1_000)));

    assert!((c.distance_meters() - 133.1).abs() < 0.5, "{}", c.distance_meters());
    assert_eq!(c.duration_seconds(), 0);
    assert_eq!(c.samples().len(), 2);
}

#[tokio::test]
async fn ticks_after_pause_are_ignored() {
    let (mut c, _) = controller();
    c.start().unwrap();
    for _ in 0..5 {
        c.apply(tick(&c));
    }
    assert_eq!(c.duration_seconds(), 5);

    let stale = tick(&c);
    c.pause().unwrap();
    for _ in 0..3 {
        assert!(!c.apply(stale.clone()));
        // Current-generation ticks don't count while paused either.
        assert!(!c.apply(tick(&c)));
    }
    assert_eq!(c.duration_seconds(), 5);

    c.resume().unwrap();
    c.apply(tick(&c));
    c.apply(tick(&c));
    assert_eq!(c.duration_seconds(), 7);
}

#[tokio::test]
async fn empty_run_finishes_with_zero_average() {
    let (mut c, kv) = controller();
    c.start().unwrap();
    let record = c.finish().unwrap();

    assert_eq!(record.distance_meters, 0.0);
    assert_eq!(record.duration_seconds, 0);
    assert_eq!(record.average_speed_meters_per_second, 0.0);
    assert!(record.samples.is_empty());
    assert_eq!(c.state(), RunState::Idle);

    let reloaded = RunHistoryStore::new(Box::new(kv)).load().unwrap();
    assert_eq!(reloaded, vec![record]);
}

#[tokio::test]
async fn start_while_running_leaves_session_untouched() {
    let (mut c, _) = controller();
    c.start().unwrap();
    c.apply(sample(&c, 48.8566, 2.3522, 0));
    c.apply(tick(&c));
    let before = c.session().cloned().unwrap();

    let err = c.start().unwrap_err();
    assert!(matches!(
        err,
        TrackingError::InvalidTransition {
            state: RunState::Running,
            ..
        }
    ));
    assert_eq!(c.session(), Some(&before));
}

#[tokio::test]
async fn double_pause_is_a_noop() {
    let (mut c, _) = controller();
    c.start().unwrap();
    c.pause().unwrap();
    let generation = c.generation();
    assert!(c.pause().unwrap_err().is_invalid_transition());
    assert_eq!(c.state(), RunState::Paused);
    assert_eq!(c.generation(), generation);
}

#[tokio::test]
async fn invalid_transitions_from_idle() {
    let (mut c, _) = controller();
    assert!(c.pause().unwrap_err().is_invalid_transition());
    assert!(c.resume().unwrap_err().is_invalid_transition());
    assert!(c.finish().unwrap_err().is_invalid_transition());
    assert_eq!(c.state(), RunState::Idle);
}

#[tokio::test]
async fn finish_from_pause_keeps_accumulated_values() {
    let (mut c, _) = controller();
    c.start().unwrap();
    c.apply(sample(&c, 48.8566, 2.3522, 0));
    c.apply(sample(&c, 48.8576, 2.3532, 1_000));
    for _ in 0..60 {
        c.apply(tick(&c));
    }
    c.pause().unwrap();
    let record = c.finish().unwrap();

    assert_eq!(record.duration_seconds, 60);
    assert!((record.average_speed_meters_per_second - record.distance_meters / 60.0).abs() < 1e-9);
    assert_eq!(record.samples.len(), 2);
    assert_eq!(c.history().len(), 1);
}

#[tokio::test]
async fn denied_permission_keeps_controller_idle() {
    let kv = Box::new(MemoryStore::new());
    let provider = ReplayProvider::new(Vec::new()).with_permission(PermissionStatus::Denied);
    let mut c = controller_with(provider, kv);

    assert!(matches!(c.start(), Err(TrackingError::PermissionDenied)));
    assert_eq!(c.state(), RunState::Idle);
    assert!(c.session().is_none());
}

#[tokio::test]
async fn permission_granted_on_request() {
    let kv = Box::new(MemoryStore::new());
    let mut c = controller_with(ReplayProvider::new(Vec::new()).prompting(), kv);

    assert!(matches!(c.start(), Err(TrackingError::PermissionDenied)));
    assert_eq!(c.request_permission(), PermissionStatus::Granted);
    c.start().unwrap();
    assert_eq!(c.state(), RunState::Running);
}

#[tokio::test]
async fn unavailable_source_never_half_starts() {
    let kv = Box::new(MemoryStore::new());
    let mut c = controller_with(ReplayProvider::new(Vec::new()).unavailable(), kv);

    assert!(matches!(c.start(), Err(TrackingError::SourceUnavailable(_))));
    assert_eq!(c.state(), RunState::Idle);
    assert!(c.session().is_none());
}

#[tokio::test]
async fn persistence_failure_still_resets() {
    let mut c = controller_with(ReplayProvider::new(Vec::new()), Box::new(ReadOnlyStore));
    c.start().unwrap();
    c.apply(tick(&c));

    let err = c.finish().unwrap_err();
    assert!(matches!(err, TrackingError::Persistence { .. }));
    assert_eq!(c.state(), RunState::Idle);
    assert!(c.session().is_none());
    assert!(c.history().is_empty());
}

#[tokio::test]
async fn late_sample_after_finish_is_dropped() {
    let (mut c, _) = controller();
    c.start().unwrap();
    let late = sample(&c, 48.8566, 2.3522, 0);
    c.finish().unwrap();
    c.start().unwrap();

    assert!(!c.apply(late));
    assert!(c.samples().is_empty());
}
