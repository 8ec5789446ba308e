//! Run lifecycle state machine.
//!
//! The controller exclusively owns the active [`RunSession`]. Location
//! samples and ticks reach it as [`SessionInput`]s through a bounded inbox;
//! the controller is the only consumer and applies them one at a time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> ... -> Finished -> Idle
//! ```
//!
//! ## Generations
//!
//! Every open and every close of the producer subscriptions bumps
//! `generation`. Producers tag what they send with the generation they were
//! opened under, and `apply` drops anything that does not match, so nothing
//! delivered after a pause or finish can touch the session.

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Action, StorageError, TrackingError};
use crate::events::{RunEvent, RunSnapshot, SessionInput};
use crate::location::{
    LocationIngestor, LocationProvider, PermissionStatus, SubscriptionHandle, WatchOptions,
};
use crate::metrics;
use crate::record::RunRecord;
use crate::sample::LocationSample;
use crate::session::{RunSession, RunState};
use crate::storage::{Config, RunHistoryStore};
use crate::ticker::{DurationTicker, TickHandle};

/// Orchestrates one run at a time.
pub struct RunSessionController {
    session: Option<RunSession>,
    generation: u64,
    ingestor: LocationIngestor,
    ticker: DurationTicker,
    location_sub: Option<SubscriptionHandle>,
    tick_sub: Option<TickHandle>,
    store: RunHistoryStore,
    history: Vec<RunRecord>,
    watch_options: WatchOptions,
    kcal_per_km: f64,
    inbox: mpsc::Sender<SessionInput>,
}

impl RunSessionController {
    /// Build a controller and the receiving end of its inbox.
    ///
    /// History is loaded once here. A store that cannot be read starts the
    /// controller with an empty in-memory history; appends will still refuse
    /// to overwrite the unreadable list.
    pub fn new(
        provider: Box<dyn LocationProvider>,
        store: RunHistoryStore,
        config: &Config,
    ) -> (Self, mpsc::Receiver<SessionInput>) {
        let (inbox, inputs) = mpsc::channel(config.tracking.queue_capacity.max(1));
        let history = store.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load run history, starting empty");
            Vec::new()
        });
        let controller = Self {
            session: None,
            generation: 0,
            ingestor: LocationIngestor::new(provider),
            ticker: DurationTicker::new(config.tracking.tick_interval()),
            location_sub: None,
            tick_sub: None,
            store,
            history,
            watch_options: config.tracking.watch_options(),
            kcal_per_km: config.profile.kcal_per_km,
            inbox,
        };
        (controller, inputs)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> RunState {
        self.session
            .as_ref()
            .map(RunSession::state)
            .unwrap_or(RunState::Idle)
    }

    pub fn session(&self) -> Option<&RunSession> {
        self.session.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn distance_meters(&self) -> f64 {
        self.session
            .as_ref()
            .map(RunSession::distance_meters)
            .unwrap_or(0.0)
    }

    pub fn duration_seconds(&self) -> u64 {
        self.session
            .as_ref()
            .map(RunSession::duration_seconds)
            .unwrap_or(0)
    }

    pub fn current_speed(&self) -> f64 {
        self.session
            .as_ref()
            .map(RunSession::current_speed)
            .unwrap_or(0.0)
    }

    pub fn samples(&self) -> &[LocationSample] {
        self.session
            .as_ref()
            .map(RunSession::samples)
            .unwrap_or(&[])
    }

    /// Runs persisted so far, in insertion order.
    pub fn history(&self) -> &[RunRecord] {
        &self.history
    }

    pub fn check_permission(&self) -> PermissionStatus {
        self.ingestor.check_permission()
    }

    pub fn request_permission(&mut self) -> PermissionStatus {
        self.ingestor.request_permission()
    }

    /// Build a full state snapshot.
    pub fn snapshot(&self) -> RunSnapshot {
        match &self.session {
            None => RunSnapshot::idle(),
            Some(s) => RunSnapshot {
                state: s.state(),
                run_id: Some(s.id().to_string()),
                distance_meters: s.distance_meters(),
                duration_seconds: s.duration_seconds(),
                current_speed: s.current_speed(),
                average_speed: s.average_speed(),
                sample_count: s.samples().len(),
                pace: metrics::format_pace(s.distance_meters(), s.duration_seconds()),
            },
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new run.
    ///
    /// # Errors
    /// `InvalidTransition` unless idle; `PermissionDenied` or
    /// `SourceUnavailable` if the producers cannot be opened, in which case
    /// the controller stays idle.
    pub fn start(&mut self) -> Result<RunEvent, TrackingError> {
        if self.state() != RunState::Idle {
            return Err(self.reject(Action::Start));
        }
        if self.ingestor.check_permission() != PermissionStatus::Granted {
            tracing::warn!("run start blocked: location permission not granted");
            return Err(TrackingError::PermissionDenied);
        }

        self.open_subscriptions()?;
        let started_at = Utc::now();
        let session = RunSession::new(Uuid::new_v4().to_string(), started_at);
        let run_id = session.id().to_string();
        self.session = Some(session);

        tracing::info!(run_id = %run_id, generation = self.generation, "run started");
        Ok(RunEvent::RunStarted {
            run_id,
            at: started_at,
        })
    }

    /// Stop producers, keeping the accumulated session.
    ///
    /// # Errors
    /// `InvalidTransition` unless running.
    pub fn pause(&mut self) -> Result<RunEvent, TrackingError> {
        if self.state() != RunState::Running {
            return Err(self.reject(Action::Pause));
        }
        self.close_subscriptions();
        let Some(session) = self.session.as_mut() else {
            return Err(self.reject(Action::Pause));
        };
        session.set_state(RunState::Paused);

        tracing::info!(
            run_id = %session.id(),
            distance_m = session.distance_meters(),
            duration_s = session.duration_seconds(),
            "run paused"
        );
        Ok(RunEvent::RunPaused {
            run_id: session.id().to_string(),
            distance_meters: session.distance_meters(),
            duration_seconds: session.duration_seconds(),
            at: Utc::now(),
        })
    }

    /// Re-open producers against the same session.
    ///
    /// # Errors
    /// `InvalidTransition` unless paused; `PermissionDenied` or
    /// `SourceUnavailable` if the producers cannot be re-opened, in which
    /// case the run stays paused.
    pub fn resume(&mut self) -> Result<RunEvent, TrackingError> {
        if self.state() != RunState::Paused {
            return Err(self.reject(Action::Resume));
        }
        self.open_subscriptions()?;
        let Some(session) = self.session.as_mut() else {
            return Err(self.reject(Action::Resume));
        };
        session.set_state(RunState::Running);

        tracing::info!(run_id = %session.id(), generation = self.generation, "run resumed");
        Ok(RunEvent::RunResumed {
            run_id: session.id().to_string(),
            at: Utc::now(),
        })
    }

    /// End the run, persist its record and return to idle.
    ///
    /// The controller is idle afterwards even when persisting fails; the
    /// record is then lost.
    ///
    /// # Errors
    /// `InvalidTransition` unless running or paused; `Persistence` when the
    /// history append fails.
    pub fn finish(&mut self) -> Result<RunRecord, TrackingError> {
        if !matches!(self.state(), RunState::Running | RunState::Paused) {
            return Err(self.reject(Action::Finish));
        }
        self.close_subscriptions();
        let Some(mut session) = self.session.take() else {
            return Err(self.reject(Action::Finish));
        };
        session.set_state(RunState::Finished);

        let record = RunRecord::from_session(&session, Utc::now(), self.kcal_per_km);
        match self.store.append(&record) {
            Ok(()) => {
                tracing::info!(
                    run_id = %record.id,
                    distance_m = record.distance_meters,
                    duration_s = record.duration_seconds,
                    samples = record.samples.len(),
                    "run finished"
                );
                self.history.push(record.clone());
                Ok(record)
            }
            Err(source) => {
                tracing::error!(
                    run_id = %record.id,
                    error = %source,
                    "failed to persist finished run"
                );
                Err(TrackingError::Persistence {
                    run_id: record.id,
                    source,
                })
            }
        }
    }

    /// Apply one producer delivery. Returns whether it changed the session.
    pub fn apply(&mut self, input: SessionInput) -> bool {
        if input.generation() != self.generation {
            tracing::debug!(
                input_generation = input.generation(),
                generation = self.generation,
                "discarding stale session input"
            );
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.state() != RunState::Running {
            return false;
        }
        match input {
            SessionInput::Sample { sample, .. } => {
                let increment = session.add_sample(sample);
                tracing::debug!(
                    increment_m = increment,
                    distance_m = session.distance_meters(),
                    "sample recorded"
                );
                true
            }
            SessionInput::Tick { .. } => session.tick(),
        }
    }

    /// Delete a persisted run.
    ///
    /// # Errors
    /// `RunNotFound` if it does not exist, or a store failure.
    pub fn delete_run(&mut self, run_id: &str) -> Result<RunRecord, StorageError> {
        let removed = self.store.delete(run_id)?;
        self.history.retain(|r| r.id != run_id);
        tracing::info!(run_id, "run deleted from history");
        Ok(removed)
    }

    /// Stop producers and drop any active session without persisting it.
    pub fn shutdown(&mut self) {
        self.close_subscriptions();
        if let Some(session) = self.session.take() {
            tracing::warn!(run_id = %session.id(), "discarding unfinished run on shutdown");
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reject(&self, action: Action) -> TrackingError {
        let state = self.state();
        tracing::warn!(%action, %state, "invalid run transition ignored");
        TrackingError::InvalidTransition { action, state }
    }

    fn open_subscriptions(&mut self) -> Result<(), TrackingError> {
        self.generation += 1;
        let generation = self.generation;
        let location =
            self.ingestor
                .start(&self.watch_options, generation, self.inbox.clone())?;
        let ticks = match self.ticker.start(generation, self.inbox.clone()) {
            Ok(ticks) => ticks,
            Err(err) => {
                self.ingestor.stop(location);
                self.generation += 1;
                return Err(err);
            }
        };
        self.location_sub = Some(location);
        self.tick_sub = Some(ticks);
        Ok(())
    }

    fn close_subscriptions(&mut self) {
        self.generation += 1;
        if let Some(location) = self.location_sub.take() {
            self.ingestor.stop(location);
        }
        if let Some(ticks) = self.tick_sub.take() {
            self.ticker.stop(ticks);
        }
    }
}

impl Drop for RunSessionController {
    fn drop(&mut self) {
        self.close_subscriptions();
    }
}
