//! Async front end for [`RunSessionController`].
//!
//! The controller runs inside one task. Commands reach it through an mpsc
//! channel with oneshot replies; producer inputs come through the session
//! inbox. Observers read the latest [`RunSnapshot`] from a watch channel.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::controller::RunSessionController;
use crate::error::{StorageError, TrackingError};
use crate::events::{RunEvent, RunSnapshot, SessionInput};
use crate::location::PermissionStatus;
use crate::record::RunRecord;
use crate::sample::LocationSample;

const COMMAND_CAPACITY: usize = 16;

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Start(Reply<Result<RunEvent, TrackingError>>),
    Pause(Reply<Result<RunEvent, TrackingError>>),
    Resume(Reply<Result<RunEvent, TrackingError>>),
    Finish(Reply<Result<RunRecord, TrackingError>>),
    RequestPermission(Reply<PermissionStatus>),
    History(Reply<Vec<RunRecord>>),
    Samples(Reply<Vec<LocationSample>>),
    DeleteRun(String, Reply<Result<RunRecord, StorageError>>),
    Shutdown(Reply<()>),
}

/// Cloneable handle to a running controller task.
#[derive(Clone)]
pub struct RunTracker {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<RunSnapshot>,
}

impl RunTracker {
    /// Move `controller` into a new task on the current runtime.
    ///
    /// `inputs` must be the receiver returned alongside the controller.
    pub fn spawn(
        controller: RunSessionController,
        inputs: mpsc::Receiver<SessionInput>,
    ) -> (Self, JoinHandle<()>) {
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (snapshot_tx, snapshots) = watch::channel(controller.snapshot());
        let task = tokio::spawn(run_loop(controller, command_rx, inputs, snapshot_tx));
        (Self { commands, snapshots }, task)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> RunSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.snapshots.clone()
    }

    pub async fn start_run(&self) -> Result<RunEvent, TrackingError> {
        self.request(Command::Start).await?
    }

    pub async fn pause_run(&self) -> Result<RunEvent, TrackingError> {
        self.request(Command::Pause).await?
    }

    pub async fn resume_run(&self) -> Result<RunEvent, TrackingError> {
        self.request(Command::Resume).await?
    }

    pub async fn finish_run(&self) -> Result<RunRecord, TrackingError> {
        self.request(Command::Finish).await?
    }

    pub async fn request_permission(&self) -> Result<PermissionStatus, TrackingError> {
        self.request(Command::RequestPermission).await
    }

    pub async fn history(&self) -> Result<Vec<RunRecord>, TrackingError> {
        self.request(Command::History).await
    }

    /// Samples of the active run; empty when idle.
    pub async fn samples(&self) -> Result<Vec<LocationSample>, TrackingError> {
        self.request(Command::Samples).await
    }

    pub async fn delete_run(&self, run_id: &str) -> crate::error::Result<RunRecord> {
        let run_id = run_id.to_string();
        Ok(self
            .request(|reply| Command::DeleteRun(run_id, reply))
            .await??)
    }

    /// Stop the controller task. An unfinished run is discarded.
    pub async fn shutdown(&self) -> Result<(), TrackingError> {
        self.request(Command::Shutdown).await
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, TrackingError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| TrackingError::TrackerClosed)?;
        rx.await.map_err(|_| TrackingError::TrackerClosed)
    }
}

async fn run_loop(
    mut controller: RunSessionController,
    mut commands: mpsc::Receiver<Command>,
    mut inputs: mpsc::Receiver<SessionInput>,
    snapshots: watch::Sender<RunSnapshot>,
) {
    loop {
        tokio::select! {
            biased;
            command = commands.recv() => {
                let Some(command) = command else { break };
                // Inputs queued before the command belong to the state the
                // command was issued against.
                drain(&mut controller, &mut inputs);
                let stop = handle(&mut controller, command);
                snapshots.send_replace(controller.snapshot());
                if stop {
                    break;
                }
            }
            input = inputs.recv() => {
                let Some(input) = input else { break };
                if controller.apply(input) {
                    snapshots.send_replace(controller.snapshot());
                }
            }
        }
    }
    controller.shutdown();
    snapshots.send_replace(controller.snapshot());
    tracing::debug!("run tracker stopped");
}

fn drain(controller: &mut RunSessionController, inputs: &mut mpsc::Receiver<SessionInput>) {
    while let Ok(input) = inputs.try_recv() {
        controller.apply(input);
    }
}

/// Returns true when the loop should stop.
fn handle(controller: &mut RunSessionController, command: Command) -> bool {
    // A dropped reply receiver just means the caller stopped waiting.
    match command {
        Command::Start(reply) => {
            let _ = reply.send(controller.start());
        }
        Command::Pause(reply) => {
            let _ = reply.send(controller.pause());
        }
        Command::Resume(reply) => {
            let _ = reply.send(controller.resume());
        }
        Command::Finish(reply) => {
            let _ = reply.send(controller.finish());
        }
        Command::RequestPermission(reply) => {
            let _ = reply.send(controller.request_permission());
        }
        Command::History(reply) => {
            let _ = reply.send(controller.history().to_vec());
        }
        Command::Samples(reply) => {
            let _ = reply.send(controller.samples().to_vec());
        }
        Command::DeleteRun(run_id, reply) => {
            let _ = reply.send(controller.delete_run(&run_id));
        }
        Command::Shutdown(reply) => {
            controller.shutdown();
            let _ = reply.send(());
            return true;
        }
    }
    false
}
