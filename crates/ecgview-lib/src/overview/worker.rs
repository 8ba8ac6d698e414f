//! Background thread that drives an [`OverviewBuilder`] one batch at a time.

use super::{OverviewBuilder, OverviewState, OverviewStatus, STEPS_PER_SLICE};
use crate::{config::HrConfig, signal::SampleSource};
use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use log::{debug, info};
use std::{
    sync::Arc,
    thread::JoinHandle,
    time::{Duration, Instant},
};

pub type SharedSource = Arc<dyn SampleSource + Send + Sync>;

pub enum OverviewCommand {
    Start {
        generation: u64,
        source: SharedSource,
        config: HrConfig,
    },
    Cancel,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum OverviewUpdate {
    Progress {
        generation: u64,
        progress: f64,
        points: usize,
    },
    Complete {
        generation: u64,
        state: OverviewState,
    },
    Cancelled {
        generation: u64,
    },
}

impl OverviewUpdate {
    pub fn generation(&self) -> u64 {
        match self {
            OverviewUpdate::Progress { generation, .. }
            | OverviewUpdate::Complete { generation, .. }
            | OverviewUpdate::Cancelled { generation } => *generation,
        }
    }
}

/// Handle to the overview thread. Updates from superseded builds are filtered out
/// before they reach the caller.
pub struct OverviewWorker {
    command_tx: Sender<OverviewCommand>,
    update_rx: Receiver<OverviewUpdate>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl OverviewWorker {
    pub fn spawn() -> Self {
        Self::with_batch_size(STEPS_PER_SLICE)
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        let (command_tx, command_rx) = bounded(32);
        let (update_tx, update_rx) = unbounded();
        let builder = OverviewBuilder::new().with_batch_size(batch_size);
        let handle =
            std::thread::spawn(move || WorkerLoop::new(command_rx, update_tx, builder).run());
        Self {
            command_tx,
            update_rx,
            handle: Some(handle),
            generation: 0,
        }
    }

    /// Begin a build that supersedes whatever the thread is working on.
    ///
    /// Fails when the worker thread is no longer running.
    pub fn start(&mut self, source: SharedSource, config: HrConfig) -> Result<u64> {
        self.generation += 1;
        self.command_tx
            .send(OverviewCommand::Start {
                generation: self.generation,
                source,
                config,
            })
            .map_err(|e| anyhow!("Failed to start overview build: {e}"))?;
        Ok(self.generation)
    }

    pub fn cancel(&self) -> Result<()> {
        self.command_tx
            .send(OverviewCommand::Cancel)
            .map_err(|e| anyhow!("Failed to cancel overview build: {e}"))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pending updates of the current build, without blocking.
    pub fn try_updates(&self) -> Vec<OverviewUpdate> {
        self.update_rx
            .try_iter()
            .filter(|update| update.generation() == self.generation)
            .collect()
    }

    /// Next update of the current build, or `None` when `timeout` elapses first.
    pub fn next_update(&self, timeout: Duration) -> Option<OverviewUpdate> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let update = self.update_rx.recv_timeout(remaining).ok()?;
            if update.generation() == self.generation {
                return Some(update);
            }
            debug!("dropping stale overview update from build {}", update.generation());
        }
    }

    /// Block until the current build completes. `None` on timeout or cancellation.
    pub fn wait_for_completion(&self, timeout: Duration) -> Option<OverviewState> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.next_update(remaining)? {
                OverviewUpdate::Complete { state, .. } => return Some(state),
                OverviewUpdate::Cancelled { .. } => return None,
                OverviewUpdate::Progress { .. } => {}
            }
        }
    }
}

impl Drop for OverviewWorker {
    fn drop(&mut self) {
        let _ = self.command_tx.send(OverviewCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct WorkerLoop {
    command_rx: Receiver<OverviewCommand>,
    update_tx: Sender<OverviewUpdate>,
    builder: OverviewBuilder,
    active: Option<(u64, SharedSource)>,
}

impl WorkerLoop {
    fn new(
        command_rx: Receiver<OverviewCommand>,
        update_tx: Sender<OverviewUpdate>,
        builder: OverviewBuilder,
    ) -> Self {
        Self {
            command_rx,
            update_tx,
            builder,
            active: None,
        }
    }

    fn run(mut self) {
        loop {
            // Block only while idle; during a build, check for commands between batches.
            let command = if self.active.is_some() {
                match self.command_rx.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.command_rx.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                }
            };
            match command {
                Some(OverviewCommand::Start {
                    generation,
                    source,
                    config,
                }) => {
                    if let Some((previous, _)) = self.active.take() {
                        info!("overview build {} superseded by {}", previous, generation);
                    }
                    self.builder.start(source.as_ref(), &config);
                    self.active = Some((generation, source));
                }
                Some(OverviewCommand::Cancel) => {
                    if let Some((generation, _)) = self.active.take() {
                        self.builder.invalidate();
                        let _ = self.update_tx.send(OverviewUpdate::Cancelled { generation });
                    }
                }
                Some(OverviewCommand::Shutdown) => break,
                None => self.step(),
            }
        }
        debug!("overview worker stopped");
    }

    fn step(&mut self) {
        let Some((generation, source)) = &self.active else {
            return;
        };
        let generation = *generation;
        let status = self.builder.poll(source.as_ref());
        let _ = self.update_tx.send(OverviewUpdate::Progress {
            generation,
            progress: self.builder.progress(),
            points: self.builder.points().len(),
        });
        if status != OverviewStatus::Building {
            let _ = self.update_tx.send(OverviewUpdate::Complete {
                generation,
                state: self.builder.state().clone(),
            });
            self.active = None;
        }
    }
}
