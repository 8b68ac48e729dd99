//! Scroll arithmetic for the windowed group table.

use std::collections::BTreeSet;
use std::ops::Range;

use crate::models::Group;

/// Group indices that stay resident regardless of scroll position.
///
/// The first, last and largest rows pin the table's measured extent, so they
/// are materialized even when out of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchors {
    pub first: usize,
    pub last: usize,
    /// Index of the group with the most members (first one on ties).
    pub largest: usize,
    /// Member count of `largest`.
    pub largest_len: usize,
}

impl Anchors {
    /// Single pass over `groups`. `None` for an empty result set.
    pub fn compute(groups: &[Group]) -> Option<Self> {
        let last = groups.len().checked_sub(1)?;
        let mut largest = 0;
        let mut largest_len = 0;
        for (index, group) in groups.iter().enumerate() {
            if group.len() > largest_len {
                largest = index;
                largest_len = group.len();
            }
        }
        Some(Self {
            first: 0,
            last,
            largest,
            largest_len,
        })
    }

    pub fn contains(&self, index: usize) -> bool {
        index == self.first || index == self.last || index == self.largest
    }

    /// Distinct anchor indices in ascending order.
    pub fn indices(&self) -> BTreeSet<usize> {
        [self.first, self.last, self.largest].into_iter().collect()
    }
}

/// Rows intersecting the viewport, as a half-open index range.
///
/// `min = floor(offset / row)`, `max = ceil((offset + viewport) / row)`, with
/// `min` clamped to the last row and `max` to the row count, so an offset past
/// the end still yields the last row.
pub fn visible_range(
    offset: f64,
    viewport_height: f64,
    row_height: f64,
    len: usize,
) -> Range<usize> {
    if len == 0 || row_height.is_nan() || row_height <= 0.0 {
        return 0..0;
    }
    let offset = sanitize(offset);
    let viewport_height = sanitize(viewport_height);

    let min = ((offset / row_height).floor() as usize).min(len - 1);
    let max = (((offset + viewport_height) / row_height).ceil() as usize).min(len);
    min..max.max(min)
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
