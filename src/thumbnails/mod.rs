//! Thumbnail pipeline for the grouped result grid.
//!
//! This module provides:
//! - `ThumbnailCache` - Size-aware in-memory cache shared with the worker
//! - `PrefetchWorker` - Background thread warming the cache in display order
//! - `sizing` - Requested thumbnail sizes derived from the maximum box

pub mod cache;
pub mod prefetch;
pub mod sizing;

pub use cache::{CacheStats, Thumbnail, ThumbnailCache, Warmed};
pub use prefetch::{PrefetchEvent, PrefetchWorker, WorkerState};
