//! Optional rate limit for paint-driven windowing passes.
//!
//! A throttled request is not dropped: the latest one is kept pending and
//! handed back by [`PaintThrottle::take_pending`], so coalesced paints can
//! never leave a row unmaterialized.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRequest {
    pub offset: f64,
    pub viewport_height: f64,
}

#[derive(Debug, Default)]
pub struct PaintThrottle {
    interval: Option<Duration>,
    last_run: Option<Instant>,
    pending: Option<ViewportRequest>,
}

impl PaintThrottle {
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            last_run: None,
            pending: None,
        }
    }

    /// Decide whether `request` runs now. If not, it replaces any pending one.
    pub fn admit(&mut self, request: ViewportRequest, now: Instant) -> Option<ViewportRequest> {
        let ready = match (self.interval, self.last_run) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        };
        if ready {
            self.last_run = Some(now);
            self.pending = None;
            Some(request)
        } else {
            self.pending = Some(request);
            None
        }
    }

    pub fn take_pending(&mut self) -> Option<ViewportRequest> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn reset(&mut self) {
        self.last_run = None;
        self.pending = None;
    }
}
