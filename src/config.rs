//! Grid configuration.

use std::time::Duration;

use crate::models::ThumbSize;

/// Default memory budget for decoded thumbnails in megabytes.
pub const DEFAULT_MEMORY_MB: usize = 192;

/// Minimum memory budget in megabytes.
pub const MIN_MEMORY_MB: usize = 16;

/// Maximum memory budget in megabytes.
pub const MAX_MEMORY_MB: usize = 1024;

/// Default maximum thumbnail box.
pub const DEFAULT_MAX_BOX: ThumbSize = ThumbSize::new(128, 128);

/// Vertical chrome (caption, margins) added to every row.
pub const DEFAULT_ROW_PADDING: u32 = 24;

/// Interval used by [`GridConfigBuilder::throttle_paints`].
pub const DEFAULT_PAINT_THROTTLE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Ceiling for any thumbnail; each group is scaled to fit inside it.
    pub max_box: ThumbSize,
    /// Extra height of a row beyond its thumbnail box.
    pub row_padding: u32,
    /// Memory budget for the thumbnail cache in megabytes.
    pub memory_mb: usize,
    /// Decode cold thumbnails on the calling thread when a row is materialized.
    /// When false, rows only pick up warm thumbnails and wait for the prefetch worker
    /// until its walk is over.
    pub decode_cold_on_materialize: bool,
    /// Minimum interval between windowing passes driven by paint events.
    pub paint_throttle: Option<Duration>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_box: DEFAULT_MAX_BOX,
            row_padding: DEFAULT_ROW_PADDING,
            memory_mb: DEFAULT_MEMORY_MB,
            decode_cold_on_materialize: true,
            paint_throttle: None,
        }
    }
}

impl GridConfig {
    pub fn builder() -> GridConfigBuilder {
        GridConfigBuilder::new()
    }

    /// Memory budget in bytes, clamped to the supported range.
    pub fn memory_bytes(&self) -> usize {
        self.memory_mb.clamp(MIN_MEMORY_MB, MAX_MEMORY_MB) * 1024 * 1024
    }
}

/// Builder for [`GridConfig`].
pub struct GridConfigBuilder {
    config: GridConfig,
}

impl GridConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GridConfig::default(),
        }
    }

    pub fn max_box(mut self, width: u32, height: u32) -> Self {
        self.config.max_box = ThumbSize::new(width.max(1), height.max(1));
        self
    }

    pub fn row_padding(mut self, padding: u32) -> Self {
        self.config.row_padding = padding;
        self
    }

    pub fn memory_mb(mut self, mb: usize) -> Self {
        self.config.memory_mb = mb;
        self
    }

    pub fn decode_cold_on_materialize(mut self, enabled: bool) -> Self {
        self.config.decode_cold_on_materialize = enabled;
        self
    }

    pub fn paint_throttle(mut self, interval: Option<Duration>) -> Self {
        self.config.paint_throttle = interval;
        self
    }

    /// Turn the paint throttle on at [`DEFAULT_PAINT_THROTTLE`].
    pub fn throttle_paints(self) -> Self {
        self.paint_throttle(Some(DEFAULT_PAINT_THROTTLE))
    }

    pub fn build(self) -> GridConfig {
        self.config
    }
}

impl Default for GridConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
