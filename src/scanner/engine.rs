//! Interface to the external comparison engine.

use std::path::Path;

use anyhow::Result;
use image::RgbaImage;

use crate::models::{Group, ThumbSize};

/// The collaborator that owns comparison results and pixel decoding.
///
/// Both operations are synchronous. `decode` may be slow (I/O and resampling)
/// and is called from the UI thread as well as the prefetch worker.
pub trait Engine: Send + Sync {
    /// Decode `path` and resample it to exactly `size`.
    fn decode(&self, path: &Path, size: ThumbSize) -> Result<RgbaImage>;

    /// Snapshot of the current result set, in display order.
    fn list_groups(&self) -> Result<Vec<Group>>;
}
