use std::time::Duration;

use lifedesk_shared::WorkspaceState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::{KeyValueStore, LocalCache};

/// Quiet period after the last edit before it is written
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug)]
enum Command {
    /// Write now, superseding any pending edit
    SaveNow(Box<WorkspaceState>),
    /// Write after the delay unless another edit arrives first
    Edit(Box<WorkspaceState>),
    /// Drop the pending edit
    Cancel,
    /// Write the pending edit now
    Flush,
    /// Write the pending edit and stop
    Shutdown,
}

struct Pending {
    state: Box<WorkspaceState>,
    deadline: Instant,
}

/// Sender side of the auto-save task. Sending never blocks the caller.
pub struct AutosaveHandle<S> {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<LocalCache<S>>,
}

/// Move `cache` into a background task that owns every write to it.
///
/// Must be called from within a tokio runtime.
pub fn spawn_autosave<S>(cache: LocalCache<S>, delay: Duration) -> AutosaveHandle<S>
where
    S: KeyValueStore + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(cache, delay, rx));
    AutosaveHandle { tx, task }
}

impl<S> AutosaveHandle<S> {
    pub fn save_now(&self, state: WorkspaceState) {
        self.send(Command::SaveNow(Box::new(state)));
    }

    pub fn edit(&self, state: WorkspaceState) {
        self.send(Command::Edit(Box::new(state)));
    }

    /// Discard a pending edit, e.g. when the editor that produced it closes
    pub fn cancel(&self) {
        self.send(Command::Cancel);
    }

    pub fn flush(&self) {
        self.send(Command::Flush);
    }

    /// Write whatever is pending, stop the task and hand the cache back
    pub async fn shutdown(self) -> Option<LocalCache<S>> {
        self.send(Command::Shutdown);
        match self.task.await {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::error!("Auto-save task failed: {}", e);
                None
            }
        }
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::warn!("Auto-save task is gone; change not persisted");
        }
    }
}

async fn run<S: KeyValueStore>(
    mut cache: LocalCache<S>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> LocalCache<S> {
    let mut pending: Option<Pending> = None;

    loop {
        let command = match pending.as_ref().map(|p| p.deadline) {
            Some(deadline) => {
                tokio::select! {
                    command = rx.recv() => command,
                    () = time::sleep_until(deadline) => {
                        if let Some(p) = pending.take() {
                            cache.save(&p.state);
                        }
                        continue;
                    }
                }
            }
            None => rx.recv().await,
        };

        match command {
            Some(Command::SaveNow(state)) => {
                pending = None;
                cache.save(&state);
            }
            Some(Command::Edit(state)) => {
                pending = Some(Pending {
                    state,
                    deadline: Instant::now() + delay,
                });
            }
            Some(Command::Cancel) => {
                if pending.take().is_some() {
                    tracing::debug!("Discarded pending edit");
                }
            }
            Some(Command::Flush) => {
                if let Some(p) = pending.take() {
                    cache.save(&p.state);
                }
            }
            Some(Command::Shutdown) | None => {
                if let Some(p) = pending.take() {
                    cache.save(&p.state);
                }
                break;
            }
        }
    }

    cache
}
