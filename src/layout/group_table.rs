//! Windowed table of group rows.
//!
//! Only the rows intersecting the viewport, plus the three anchor rows, have
//! live [`GroupPanel`]s. Scrolling adds and removes panels incrementally; only
//! [`GroupTable::refresh`] rebuilds the resident set wholesale.
//!
//! The table lives on the UI thread. The resident set is never shared with the
//! prefetch worker: the worker reports finished groups over a channel and
//! [`GroupTable::pump`] applies them here.
//!
//! Rows wait for the worker only while it is still walking. Once its walk is
//! over (for instance because the cache budget filled up), rows that need
//! thumbnails get them on the UI thread.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use flume::Receiver;
use tracing::{debug, trace};

use super::panel::GroupPanel;
use super::throttle::{PaintThrottle, ViewportRequest};
use super::window::{visible_range, Anchors};
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::models::Group;
use crate::scanner::Engine;
use crate::thumbnails::{PrefetchEvent, PrefetchWorker, Thumbnail, ThumbnailCache, WorkerState};

/// What caused a resident row's thumbnails to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    /// The row was materialized and filled on the UI thread.
    Materialized,
    /// The prefetch worker finished the row's group.
    Prefetch,
}

/// Notification that a resident row needs repainting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowUpdate {
    pub index: usize,
    pub source: UpdateSource,
}

/// Panels created and dropped by one windowing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowChange {
    pub visible: Range<usize>,
    pub materialized: Vec<usize>,
    pub discarded: Vec<usize>,
}

impl WindowChange {
    /// True if the pass neither created nor dropped a panel.
    pub fn is_empty(&self) -> bool {
        self.materialized.is_empty() && self.discarded.is_empty()
    }
}

type RowCallback = Box<dyn Fn(RowUpdate)>;

/// Virtualized list of group rows over one result set.
///
/// Owns the thumbnail cache and the prefetch worker. Not `Send`: it belongs to
/// the UI thread.
pub struct GroupTable {
    config: GridConfig,
    /// Source of result sets for [`GroupTable::reload`].
    engine: Arc<dyn Engine>,
    cache: ThumbnailCache,
    worker: PrefetchWorker,
    /// Receiving end of the worker's event channel.
    events: Receiver<PrefetchEvent>,
    /// Generation of the worker whose events are current.
    generation: u64,
    /// The current worker sent `Finished`.
    prefetch_finished: bool,
    /// ... and its walk covered every group.
    prefetch_complete: bool,
    groups: Arc<[Group]>,
    /// `None` for an empty result set.
    anchors: Option<Anchors>,
    /// Live panels by group index. Always includes the anchors.
    resident: BTreeMap<usize, GroupPanel>,
    throttle: PaintThrottle,
    on_row_updated: Option<RowCallback>,
}

impl GroupTable {
    pub fn new(engine: Arc<dyn Engine>, config: GridConfig) -> Self {
        let cache = ThumbnailCache::new(Arc::clone(&engine), config.memory_bytes());
        let (tx, rx) = flume::unbounded();
        let throttle = PaintThrottle::new(config.paint_throttle);
        Self {
            config,
            engine,
            cache,
            worker: PrefetchWorker::new(tx),
            events: rx,
            generation: 0,
            prefetch_finished: false,
            prefetch_complete: false,
            groups: Arc::from(Vec::new()),
            anchors: None,
            resident: BTreeMap::new(),
            throttle,
            on_row_updated: None,
        }
    }

    /// Register the repaint notification for resident rows.
    pub fn connect_row_updated<F>(&mut self, callback: F)
    where
        F: Fn(RowUpdate) + 'static,
    {
        self.on_row_updated = Some(Box::new(callback));
    }

    /// Fetch a fresh result set from the engine and install it.
    pub fn reload(&mut self) -> Result<()> {
        let groups = self.engine.list_groups().map_err(GridError::Engine)?;
        self.refresh(groups)
    }

    /// Replace the result set.
    ///
    /// Strictly ordered: stop the worker, clear the cache, install the groups,
    /// reset the resident set to the anchors, start a new worker.
    ///
    /// Events still queued from the stopped worker are dropped, so none of
    /// them can reach the new result set even if the new worker fails to start.
    pub fn refresh(&mut self, groups: Vec<Group>) -> Result<()> {
        self.worker.stop();
        let dropped = self.events.drain().count();
        if dropped > 0 {
            trace!(dropped, "Dropped queued prefetch events");
        }
        self.cache.clear();

        self.groups = Arc::from(groups);
        self.anchors = Anchors::compute(&self.groups);
        self.resident.clear();
        self.throttle.reset();
        self.prefetch_finished = false;
        self.prefetch_complete = false;

        if let Some(anchors) = self.anchors {
            for index in anchors.indices() {
                self.materialize(index);
            }
        }

        self.generation = self.worker.start(
            Arc::clone(&self.groups),
            self.cache.clone(),
            self.config.max_box,
        )?;
        debug!(
            groups = self.groups.len(),
            anchors = ?self.anchors,
            generation = self.generation,
            "Refreshed group table"
        );
        Ok(())
    }

    /// Window the table using the height of a resident row.
    ///
    /// Without any resident panel there is no row height to work with and
    /// nothing happens.
    pub fn on_viewport_changed(&mut self, offset: f64, viewport_height: f64) -> WindowChange {
        match self.row_height() {
            Some(row_height) => self.apply_window(offset, viewport_height, f64::from(row_height)),
            None => WindowChange::default(),
        }
    }

    /// Window the table with an explicit row height.
    ///
    /// Non-anchor panels outside the visible range are discarded, visible rows
    /// without a panel are materialized. Rows that stay visible are untouched.
    pub fn apply_window(
        &mut self,
        offset: f64,
        viewport_height: f64,
        row_height: f64,
    ) -> WindowChange {
        let visible = visible_range(offset, viewport_height, row_height, self.groups.len());
        let mut change = WindowChange {
            visible: visible.clone(),
            ..Default::default()
        };

        let anchors = self.anchors;
        let is_anchor = |index: usize| anchors.is_some_and(|a| a.contains(index));
        let outside: Vec<usize> = self
            .resident
            .range(..visible.start)
            .chain(self.resident.range(visible.end..))
            .map(|(&index, _)| index)
            .filter(|&index| !is_anchor(index))
            .collect();
        for index in outside {
            self.resident.remove(&index);
            change.discarded.push(index);
        }

        for index in visible {
            if !self.resident.contains_key(&index) {
                self.materialize(index);
                change.materialized.push(index);
            }
        }

        if !change.is_empty() {
            trace!(
                visible = ?change.visible,
                materialized = change.materialized.len(),
                discarded = change.discarded.len(),
                resident = self.resident.len(),
                "Windowed group table"
            );
        }
        change
    }

    /// Paint-driven windowing, subject to the configured throttle.
    ///
    /// Returns `None` when the pass was deferred; the deferred viewport is
    /// applied by a later `on_paint`, [`Self::flush_pending`] or [`Self::pump`].
    pub fn on_paint(
        &mut self,
        offset: f64,
        viewport_height: f64,
        now: Instant,
    ) -> Option<WindowChange> {
        let request = ViewportRequest {
            offset,
            viewport_height,
        };
        let request = self.throttle.admit(request, now)?;
        Some(self.on_viewport_changed(request.offset, request.viewport_height))
    }

    /// Apply a viewport deferred by the paint throttle, if any.
    pub fn flush_pending(&mut self) -> Option<WindowChange> {
        let request = self.throttle.take_pending()?;
        Some(self.on_viewport_changed(request.offset, request.viewport_height))
    }

    /// Apply worker progress and deferred viewports. Call regularly on the UI thread.
    ///
    /// Returns the number of worker events consumed.
    pub fn pump(&mut self) -> usize {
        let mut consumed = 0;
        let events: Vec<PrefetchEvent> = self.events.try_iter().collect();
        for event in events {
            consumed += 1;
            if event.generation() != self.generation {
                trace!(
                    stale = event.generation(),
                    current = self.generation,
                    "Ignoring stale prefetch event"
                );
                continue;
            }
            match event {
                PrefetchEvent::GroupWarmed {
                    index, thumbnails, ..
                } => self.push_warmed(index, &thumbnails),
                PrefetchEvent::Finished {
                    decoded,
                    failed,
                    cancelled,
                    budget_full,
                    ..
                } => {
                    self.prefetch_finished = true;
                    self.prefetch_complete = !cancelled && !budget_full;
                    debug!(decoded, failed, cancelled, budget_full, "Prefetch finished");
                    if budget_full {
                        self.fill_resident_cold();
                    }
                }
            }
        }
        self.flush_pending();
        consumed
    }

    fn push_warmed(&mut self, index: usize, thumbnails: &[Option<Thumbnail>]) {
        let Some(panel) = self.resident.get_mut(&index) else {
            return;
        };
        if panel.accept(thumbnails) {
            self.notify(RowUpdate {
                index,
                source: UpdateSource::Prefetch,
            });
        }
    }

    /// Decode whatever resident rows still miss; the worker will not deliver it.
    fn fill_resident_cold(&mut self) {
        let mut changed = Vec::new();
        for (&index, panel) in self.resident.iter_mut() {
            let Some(group) = self.groups.get(index) else {
                continue;
            };
            if !panel.is_complete() && panel.fill(group, &self.cache, true) {
                changed.push(index);
            }
        }
        for index in changed {
            self.notify(RowUpdate {
                index,
                source: UpdateSource::Materialized,
            });
        }
    }

    fn materialize(&mut self, index: usize) {
        let Some(group) = self.groups.get(index) else {
            return;
        };
        let mut panel = GroupPanel::new(index, group, &self.config);
        let decode_cold = self.config.decode_cold_on_materialize || self.prefetch_finished;
        let changed = panel.fill(group, &self.cache, decode_cold);
        self.resident.insert(index, panel);
        if changed {
            self.notify(RowUpdate {
                index,
                source: UpdateSource::Materialized,
            });
        }
    }

    fn notify(&self, update: RowUpdate) {
        if let Some(callback) = &self.on_row_updated {
            callback(update);
        }
    }

    /// Height of any resident row; rows are uniform.
    pub fn row_height(&self) -> Option<u32> {
        self.resident.values().next().map(GroupPanel::height)
    }

    /// Total scrollable height, once a row has been measured.
    pub fn total_extent(&self) -> Option<f64> {
        self.row_height()
            .map(|height| height as f64 * self.groups.len() as f64)
    }

    pub fn resident_indices(&self) -> BTreeSet<usize> {
        self.resident.keys().copied().collect()
    }

    pub fn panel(&self, index: usize) -> Option<&GroupPanel> {
        self.resident.get(&index)
    }

    pub fn anchors(&self) -> Option<Anchors> {
        self.anchors
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn worker_state(&self) -> WorkerState {
        self.worker.state()
    }

    /// True once the current worker has walked every group.
    pub fn is_prefetch_complete(&self) -> bool {
        self.prefetch_complete
    }

    /// True once the current worker has reported the end of its walk,
    /// complete or not.
    pub fn is_prefetch_finished(&self) -> bool {
        self.prefetch_finished
    }

    /// True while the worker thread is alive. A thread that died without
    /// reporting back counts as not running.
    pub fn is_prefetch_running(&self) -> bool {
        self.worker.state() == WorkerState::Running && !self.worker.is_finished()
    }

    /// Stop the prefetch worker without touching the result set.
    pub fn stop_prefetch(&mut self) {
        self.worker.stop();
    }
}
