//! Materialized view state of one group row.

use std::sync::Arc;

use crate::config::GridConfig;
use crate::models::{Group, ThumbSize};
use crate::thumbnails::sizing::{group_box, size_for_image};
use crate::thumbnails::{Thumbnail, ThumbnailCache};

/// Live view state for a resident group row.
///
/// Holds one slot per member image. A slot stays `None` until a thumbnail is
/// available, or permanently if the image failed to decode.
#[derive(Debug, Clone)]
pub struct GroupPanel {
    /// Position of the group in the result set.
    index: usize,
    group_id: u64,
    box_size: ThumbSize,
    /// Requested size per member image, in group order.
    sizes: Vec<ThumbSize>,
    /// One slot per member image, parallel to `sizes`.
    thumbnails: Vec<Option<Thumbnail>>,
    height: u32,
}

impl GroupPanel {
    pub fn new(index: usize, group: &Group, config: &GridConfig) -> Self {
        let sizes = group
            .images()
            .iter()
            .map(|image| size_for_image(image, group, config.max_box))
            .collect();
        Self {
            index,
            group_id: group.id,
            box_size: group_box(group, config.max_box),
            sizes,
            thumbnails: vec![None; group.len()],
            // Uniform across rows: the box ceiling plus chrome, not this group's box.
            height: config.max_box.height + config.row_padding,
        }
    }

    /// Pull thumbnails for `group` from the cache into empty or outdated slots.
    ///
    /// With `decode_cold` set, cold images are decoded on the calling thread;
    /// otherwise only warm entries are taken. Returns true if any slot changed.
    pub fn fill(&mut self, group: &Group, cache: &ThumbnailCache, decode_cold: bool) -> bool {
        let mut changed = false;
        for ((image, size), slot) in group
            .images()
            .iter()
            .zip(&self.sizes)
            .zip(self.thumbnails.iter_mut())
        {
            if !decode_cold && !cache.exists(image, *size) {
                continue;
            }
            changed |= replace_slot(slot, cache.get(image, *size));
        }
        changed
    }

    /// Take thumbnails handed over by the prefetch worker, in image order.
    ///
    /// `None` entries are failed decodes and leave their slot alone. Returns
    /// true if any slot changed.
    pub fn accept(&mut self, thumbnails: &[Option<Thumbnail>]) -> bool {
        let mut changed = false;
        for (slot, thumb) in self.thumbnails.iter_mut().zip(thumbnails) {
            if thumb.is_some() {
                changed |= replace_slot(slot, thumb.clone());
            }
        }
        changed
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    /// Rendered row height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Box all thumbnails of this row are laid out in.
    pub fn box_size(&self) -> ThumbSize {
        self.box_size
    }

    pub fn thumbnails(&self) -> &[Option<Thumbnail>] {
        &self.thumbnails
    }

    pub fn thumbnail(&self, position: usize) -> Option<&Thumbnail> {
        self.thumbnails.get(position)?.as_ref()
    }

    pub fn requested_size(&self, position: usize) -> Option<ThumbSize> {
        self.sizes.get(position).copied()
    }

    /// Number of slots holding a thumbnail.
    pub fn filled(&self) -> usize {
        self.thumbnails.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.filled() == self.thumbnails.len()
    }
}

fn replace_slot(slot: &mut Option<Thumbnail>, thumb: Option<Thumbnail>) -> bool {
    let same = match (&thumb, &*slot) {
        (Some(new), Some(old)) => Arc::ptr_eq(new, old),
        (None, None) => true,
        _ => false,
    };
    if !same {
        *slot = thumb;
    }
    !same
}
