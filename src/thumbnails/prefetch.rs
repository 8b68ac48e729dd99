//! Background worker that warms the thumbnail cache ahead of the UI.
//!
//! - One thread per result set, walking groups then images in display order
//! - Cooperative cancellation checked before every image
//! - Reports finished groups over a flume channel together with their
//!   thumbnails; the UI thread decides whether the group is resident
//! - Never evicts: once the cache budget is full the walk ends early

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::Sender;
use tracing::{debug, error, trace};

use super::cache::{Thumbnail, ThumbnailCache, Warmed};
use super::sizing::size_for_image;
use crate::error::{GridError, Result};
use crate::models::{Group, ThumbSize};

/// Lifecycle of a [`PrefetchWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopped,
}

/// Progress reported by the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchEvent {
    /// Every image of group `index` is cached. `thumbnails` follows the
    /// group's image order; `None` marks a failed decode.
    GroupWarmed {
        generation: u64,
        index: usize,
        thumbnails: Vec<Option<Thumbnail>>,
    },
    /// The walk ended. `cancelled` and `budget_full` tell an early end apart
    /// from a complete walk.
    Finished {
        generation: u64,
        decoded: usize,
        failed: usize,
        cancelled: bool,
        budget_full: bool,
    },
}

impl PrefetchEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::GroupWarmed { generation, .. } | Self::Finished { generation, .. } => *generation,
        }
    }
}

/// Handle to the single prefetch thread.
pub struct PrefetchWorker {
    state: WorkerState,
    /// Cancel flag of the current walk; replaced on every start.
    cancel: Arc<AtomicBool>,
    /// `None` when idle or after a join.
    handle: Option<JoinHandle<()>>,
    /// Cloned into every walk.
    events: Sender<PrefetchEvent>,
    /// Generation of the last successful start.
    generation: u64,
}

impl PrefetchWorker {
    pub fn new(events: Sender<PrefetchEvent>) -> Self {
        Self {
            state: WorkerState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
            handle: None,
            events,
            generation: 0,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Generation of the most recently started walk.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the thread has run to completion (or was never started).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Spawn the worker over `groups`. Returns the generation tagging its events.
    pub fn start(
        &mut self,
        groups: Arc<[Group]>,
        cache: ThumbnailCache,
        max_box: ThumbSize,
    ) -> Result<u64> {
        if self.state == WorkerState::Running {
            return Err(GridError::WorkerAlreadyRunning);
        }

        let generation = self.generation + 1;
        let cancel = Arc::new(AtomicBool::new(false));
        let job = Walk {
            generation,
            groups,
            cache,
            max_box,
            cancel: Arc::clone(&cancel),
            events: self.events.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("thumb-prefetch-{generation}"))
            .spawn(move || job.run())
            .map_err(GridError::WorkerSpawn)?;

        self.generation = generation;
        self.cancel = cancel;
        self.handle = Some(handle);
        self.state = WorkerState::Running;
        debug!(generation, "Started prefetch worker");
        Ok(generation)
    }

    #[cfg(test)]
    pub(crate) fn sender(&self) -> Sender<PrefetchEvent> {
        self.events.clone()
    }

    /// Cancel the walk and wait for the thread to exit.
    ///
    /// Once this returns, the worker makes no further cache writes. Blocks for
    /// at most one decode. Must not be called from the worker thread.
    pub fn stop(&mut self) {
        if self.state != WorkerState::Running {
            return;
        }
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(generation = self.generation, "Prefetch worker panicked");
            }
        }
        self.state = WorkerState::Stopped;
        debug!(generation = self.generation, "Stopped prefetch worker");
    }
}

impl Drop for PrefetchWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Walk {
    generation: u64,
    groups: Arc<[Group]>,
    cache: ThumbnailCache,
    max_box: ThumbSize,
    cancel: Arc<AtomicBool>,
    events: Sender<PrefetchEvent>,
}

impl Walk {
    fn run(self) {
        let generation = self.generation;
        debug!(generation, groups = self.groups.len(), "Prefetch walk started");

        let mut decoded = 0;
        let mut failed = 0;
        let mut cancelled = false;
        let mut budget_full = false;

        'groups: for (index, group) in self.groups.iter().enumerate() {
            let mut thumbnails = Vec::with_capacity(group.len());
            for image in group.images() {
                if self.cancel.load(Ordering::SeqCst) {
                    cancelled = true;
                    break 'groups;
                }
                let size = size_for_image(image, group, self.max_box);
                match self.cache.warm(image, size) {
                    Warmed::Ready(thumbnail) => {
                        if thumbnail.is_some() {
                            decoded += 1;
                        } else {
                            failed += 1;
                        }
                        thumbnails.push(thumbnail);
                    }
                    Warmed::BudgetFull => {
                        budget_full = true;
                        debug!(generation, index, "Cache budget full, ending prefetch");
                        break 'groups;
                    }
                }
            }
            trace!(generation, index, "Group warmed");
            self.send(PrefetchEvent::GroupWarmed {
                generation,
                index,
                thumbnails,
            });
        }

        debug!(generation, decoded, failed, cancelled, budget_full, "Prefetch walk finished");
        self.send(PrefetchEvent::Finished {
            generation,
            decoded,
            failed,
            cancelled,
            budget_full,
        });
    }

    fn send(&self, event: PrefetchEvent) {
        if self.events.send(event).is_err() {
            trace!(generation = self.generation, "Prefetch event receiver dropped");
        }
    }
}
