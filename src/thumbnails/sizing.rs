//! Requested thumbnail sizes.
//!
//! A single configured maximum box yields a different absolute size per image:
//! each group is scaled by one factor chosen so that its `size_max` fits the
//! box, and every member is scaled by that same factor. The derived size, not
//! the box, is what the cache is keyed on.

use crate::models::{Group, ImageDescriptor, ThumbSize};

/// Scale `natural` to fit inside `max_box`, preserving aspect ratio.
///
/// Degenerate inputs fall back to the box itself; the result is never zero-sized.
pub fn fit_within(natural: ThumbSize, max_box: ThumbSize) -> ThumbSize {
    if natural.is_empty() {
        return ThumbSize::new(max_box.width.max(1), max_box.height.max(1));
    }
    scale(natural, scale_factor(natural, max_box), max_box)
}

/// Box every thumbnail of `group` is laid out in.
pub fn group_box(group: &Group, max_box: ThumbSize) -> ThumbSize {
    fit_within(group.size_max(), max_box)
}

/// Size requested from the cache for `image` as a member of `group`.
pub fn size_for_image(image: &ImageDescriptor, group: &Group, max_box: ThumbSize) -> ThumbSize {
    let natural = image.natural_size();
    let size_max = group.size_max();
    if natural.is_empty() || size_max.is_empty() {
        return fit_within(natural, max_box);
    }
    scale(natural, scale_factor(size_max, max_box), max_box)
}

fn scale_factor(reference: ThumbSize, max_box: ThumbSize) -> f64 {
    let sx = max_box.width as f64 / reference.width as f64;
    let sy = max_box.height as f64 / reference.height as f64;
    sx.min(sy)
}

fn scale(natural: ThumbSize, factor: f64, max_box: ThumbSize) -> ThumbSize {
    let width = (natural.width as f64 * factor).round() as u32;
    let height = (natural.height as f64 * factor).round() as u32;
    ThumbSize::new(
        width.clamp(1, max_box.width.max(1)),
        height.clamp(1, max_box.height.max(1)),
    )
}
