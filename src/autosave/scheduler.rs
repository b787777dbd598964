use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use compio::runtime::spawn;
use futures::{FutureExt, pin_mut, select_biased};
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures_channel::oneshot;
use snafu::Snafu;
use tracing::{debug, info, warn};

use crate::ext::PathExt;
use crate::notes::NoteStore;
use crate::storage::{self, PersistenceError};

/// Period used when no interval is configured.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one autosave tick, reported to whoever surfaces status to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveEvent {
    Saved { tick: u64 },
    Failed { tick: u64, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

struct RunningSchedule {
    cancel: oneshot::Sender<()>,
    finished: oneshot::Receiver<u64>,
}

/// Periodically writes whatever the shared store holds to `destination`.
///
/// A failed write is reported and logged, and the next tick simply tries again.
/// Dropping a running scheduler cancels it.
pub struct AutosaveScheduler {
    store: Arc<Mutex<NoteStore>>,
    destination: Arc<PathBuf>,
    period: Duration,
    observer: UnboundedSender<AutosaveEvent>,
    running: Option<RunningSchedule>,
}

impl AutosaveScheduler {
    /// Creates a stopped scheduler and the receiving end of its status channel.
    pub fn new(
        store: Arc<Mutex<NoteStore>>,
        destination: PathBuf,
        period: Duration,
    ) -> (Self, UnboundedReceiver<AutosaveEvent>) {
        let (observer, events) = mpsc::unbounded();
        let scheduler = Self {
            store,
            destination: Arc::new(destination),
            period,
            observer,
            running: None,
        };
        (scheduler, events)
    }

    pub fn state(&self) -> SchedulerState {
        match self.running {
            Some(_) => SchedulerState::Running,
            None => SchedulerState::Stopped,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawns the recurring save task on the current runtime.
    pub fn start(&mut self) -> Result<(), AutosaveError> {
        if self.running.is_some() {
            return Err(AutosaveError::DoubleStart);
        }

        let (cancel, cancel_rx) = oneshot::channel();
        let (finished_tx, finished) = oneshot::channel();
        spawn(run_schedule(
            self.store.clone(),
            self.destination.clone(),
            self.period,
            self.observer.clone(),
            cancel_rx,
            finished_tx,
        ))
        .detach();

        info!(
            "Autosaving to {} every {:?}",
            self.destination.best_effort_path_display(),
            self.period
        );
        self.running = Some(RunningSchedule { cancel, finished });
        Ok(())
    }

    /// Cancels the schedule and waits for the task to exit, so no tick fires
    /// once this returns. A save already in progress is allowed to finish.
    pub async fn stop(&mut self) -> Result<u64, AutosaveError> {
        let RunningSchedule { cancel, finished } =
            self.running.take().ok_or(AutosaveError::NotRunning)?;

        if cancel.send(()).is_err() {
            debug!("Autosave task already gone before cancellation");
        }
        let ticks = finished.await.unwrap_or_else(|_| {
            warn!("Autosave task ended without reporting its tick count");
            0
        });

        info!("Autosave stopped after {} ticks", ticks);
        Ok(ticks)
    }
}

async fn run_schedule(
    store: Arc<Mutex<NoteStore>>,
    destination: Arc<PathBuf>,
    period: Duration,
    observer: UnboundedSender<AutosaveEvent>,
    mut cancel: oneshot::Receiver<()>,
    finished: oneshot::Sender<u64>,
) {
    let mut tick = 0;

    loop {
        let delay = compio::time::sleep(period).fuse();
        pin_mut!(delay);
        // Cancellation wins over a due tick
        select_biased! {
            _ = cancel => break,
            _ = delay => {}
        }

        tick += 1;
        let event = match save_snapshot(&store, &destination).await {
            Ok(()) => {
                debug!("Autosave tick {} succeeded", tick);
                AutosaveEvent::Saved { tick }
            }
            Err(error) => {
                warn!("Autosave tick {} failed: {}", tick, error);
                AutosaveEvent::Failed {
                    tick,
                    message: error.to_string(),
                }
            }
        };

        if observer.unbounded_send(event).is_err() {
            debug!("No one is listening for autosave status");
        }
    }

    let _ = finished.send(tick);
}

/// Clones the tree under the lock and writes the copy after releasing it.
async fn save_snapshot(store: &Mutex<NoteStore>, destination: &Path) -> Result<(), PersistenceError> {
    let snapshot = store
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .snapshot();
    storage::save(&snapshot, destination).await
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum AutosaveError {
    #[snafu(display("Autosave is already running"))]
    DoubleStart,
    #[snafu(display("Autosave is not running"))]
    NotRunning,
}
