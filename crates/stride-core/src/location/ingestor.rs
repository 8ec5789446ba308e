use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::{FixSink, LocationProvider, PermissionStatus, WatchId, WatchOptions};
use crate::error::TrackingError;
use crate::events::SessionInput;
use crate::sample::{LocationSample, RawFix};

/// An open location subscription.
#[derive(Debug)]
pub struct SubscriptionHandle {
    watch_id: WatchId,
    generation: u64,
}

impl SubscriptionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Turns platform fixes into generation-tagged samples on the session inbox.
pub struct LocationIngestor {
    provider: Box<dyn LocationProvider>,
}

impl LocationIngestor {
    pub fn new(provider: Box<dyn LocationProvider>) -> Self {
        Self { provider }
    }

    pub fn check_permission(&self) -> PermissionStatus {
        self.provider.check_permission()
    }

    pub fn request_permission(&mut self) -> PermissionStatus {
        self.provider.request_permission()
    }

    /// Subscribe to the provider.
    ///
    /// The sink runs on the provider's thread, so it never blocks: when the
    /// inbox is full the fix is dropped and logged.
    ///
    /// # Errors
    /// `PermissionDenied` without permission, `SourceUnavailable` when the
    /// provider refuses the watch.
    pub fn start(
        &mut self,
        options: &WatchOptions,
        generation: u64,
        inbox: mpsc::Sender<SessionInput>,
    ) -> Result<SubscriptionHandle, TrackingError> {
        if self.provider.check_permission() != PermissionStatus::Granted {
            return Err(TrackingError::PermissionDenied);
        }

        let sink: FixSink = Arc::new(move |fix: RawFix| {
            let sample = match LocationSample::try_from(fix) {
                Ok(sample) => sample,
                Err(err) => {
                    tracing::warn!(error = %err, generation, "dropping malformed location fix");
                    return;
                }
            };
            match inbox.try_send(SessionInput::Sample { generation, sample }) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(generation, "session inbox full, dropping location sample");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(generation, "session inbox closed, dropping location sample");
                }
            }
        });

        let watch_id = self.provider.watch_position(options, sink)?;
        tracing::debug!(generation, watch = watch_id.0, "location subscription opened");
        Ok(SubscriptionHandle {
            watch_id,
            generation,
        })
    }

    pub fn stop(&mut self, handle: SubscriptionHandle) {
        self.provider.clear_watch(handle.watch_id);
        tracing::debug!(
            generation = handle.generation,
            watch = handle.watch_id.0,
            "location subscription closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Provider that hands its sink back to the test.
    struct ManualProvider {
        permission: PermissionStatus,
        sinks: Arc<Mutex<Vec<FixSink>>>,
        cleared: Arc<Mutex<Vec<WatchId>>>,
    }

    impl LocationProvider for ManualProvider {
        fn check_permission(&self) -> PermissionStatus {
            self.permission
        }

        fn request_permission(&mut self) -> PermissionStatus {
            self.permission
        }

        fn watch_position(
            &mut self,
            _options: &WatchOptions,
            sink: FixSink,
        ) -> Result<WatchId, TrackingError> {
            let mut sinks = self.sinks.lock().unwrap();
            sinks.push(sink);
            Ok(WatchId(sinks.len() as u64))
        }

        fn clear_watch(&mut self, id: WatchId) {
            self.cleared.lock().unwrap().push(id);
        }
    }

    fn provider(permission: PermissionStatus) -> (ManualProvider, Arc<Mutex<Vec<FixSink>>>) {
        let sinks = Arc::new(Mutex::new(Vec::new()));
        (
            ManualProvider {
                permission,
                sinks: Arc::clone(&sinks),
                cleared: Arc::new(Mutex::new(Vec::new())),
            },
            sinks,
        )
    }

    #[test]
    fn denied_permission_opens_nothing() {
        let (p, sinks) = provider(PermissionStatus::Denied);
        let mut ingestor = LocationIngestor::new(Box::new(p));
        let (tx, _rx) = mpsc::channel(4);
        let err = ingestor.start(&WatchOptions::default(), 1, tx).unwrap_err();
        assert!(matches!(err, TrackingError::PermissionDenied));
        assert!(sinks.lock().unwrap().is_empty());
    }

    #[test]
    fn forwards_tagged_samples_and_drops_malformed() {
        let (p, sinks) = provider(PermissionStatus::Granted);
        let mut ingestor = LocationIngestor::new(Box::new(p));
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ingestor.start(&WatchOptions::default(), 7, tx).unwrap();
        assert_eq!(handle.generation(), 7);

        let sink = sinks.lock().unwrap()[0].clone();
        sink(RawFix::new(95.0, 0.0, 0));
        sink(RawFix::new(48.0, 2.0, 10).with_speed(3.0));

        match rx.try_recv().unwrap() {
            SessionInput::Sample { generation, sample } => {
                assert_eq!(generation, 7);
                assert_eq!(sample.timestamp(), 10);
                assert_eq!(sample.instantaneous_speed(), Some(3.0));
            }
            other => panic!("unexpected input {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_inbox_drops_instead_of_blocking() {
        let (p, sinks) = provider(PermissionStatus::Granted);
        let mut ingestor = LocationIngestor::new(Box::new(p));
        let (tx, mut rx) = mpsc::channel(1);
        ingestor.start(&WatchOptions::default(), 1, tx).unwrap();
        let sink = sinks.lock().unwrap()[0].clone();
        sink(RawFix::new(1.0, 1.0, 1));
        sink(RawFix::new(1.0, 1.0, 2));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
