//! Once-per-second duration ticks.
//!
//! Every tick counts as exactly one second of run time; there is no drift
//! correction. Ticks are tagged with the generation they were started under,
//! so ones still in flight after `stop` are discarded by the controller.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::TrackingError;
use crate::events::SessionInput;

/// A running tick task.
#[derive(Debug)]
pub struct TickHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl TickHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Spawns tick tasks feeding the session inbox.
#[derive(Debug, Clone)]
pub struct DurationTicker {
    period: Duration,
}

impl Default for DurationTicker {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl DurationTicker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking. The first tick arrives one period from now.
    ///
    /// # Errors
    /// `SourceUnavailable` when called outside a tokio runtime.
    pub fn start(
        &self,
        generation: u64,
        inbox: mpsc::Sender<SessionInput>,
    ) -> Result<TickHandle, TrackingError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            TrackingError::SourceUnavailable("no async runtime for duration ticker".into())
        })?;
        let period = self.period;
        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if inbox.send(SessionInput::Tick { generation }).await.is_err() {
                    break;
                }
            }
        });
        Ok(TickHandle { generation, task })
    }

    pub fn stop(&self, handle: TickHandle) {
        handle.task.abort();
    }
}
