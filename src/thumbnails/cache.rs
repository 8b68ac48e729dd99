//! Size-aware thumbnail cache shared by the UI thread and the prefetch worker.
//!
//! Entries are keyed by image identity and remember the size they were decoded
//! at. A lookup is only a hit when that size equals the requested one; any
//! other size is a miss and the new decode replaces the old entry.
//!
//! One mutex guards the map. It is never held across a decode, so two callers
//! racing on the same cold image may both decode it; the last insert wins and
//! both results are equivalent.
//!
//! The byte budget is enforced two ways. [`ThumbnailCache::get`] evicts least
//! recently used entries to make room. [`ThumbnailCache::warm`] never evicts:
//! it reports [`Warmed::BudgetFull`] instead, so background warming cannot push
//! out thumbnails it decoded earlier.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::models::{ImageDescriptor, ImageId, ThumbSize};
use crate::scanner::Engine;

/// A decoded thumbnail, shared read-only with callers.
pub type Thumbnail = Arc<RgbaImage>;

#[derive(Clone)]
struct CacheEntry {
    /// `None` records a failed decode at `size`.
    bitmap: Option<Thumbnail>,
    /// Size the entry answers for. For present bitmaps this is their actual size.
    size: ThumbSize,
}

impl CacheEntry {
    fn new(bitmap: Option<Thumbnail>, requested: ThumbSize) -> Self {
        let size = bitmap
            .as_ref()
            .map(|b| ThumbSize::new(b.width(), b.height()))
            .unwrap_or(requested);
        Self { bitmap, size }
    }

    fn memory_bytes(&self) -> usize {
        if self.bitmap.is_some() {
            self.size.rgba_bytes()
        } else {
            0
        }
    }
}

struct Inner {
    entries: LruCache<ImageId, CacheEntry>,
    memory_bytes: usize,
}

/// Outcome of [`ThumbnailCache::warm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warmed {
    /// The entry is cached. `None` records a failed decode.
    Ready(Option<Thumbnail>),
    /// Caching the entry would exceed the budget; nothing was evicted.
    BudgetFull,
}

/// Counters for cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub decodes: u64,
    pub failures: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    decodes: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

/// Thread-safe thumbnail cache. Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct ThumbnailCache {
    inner: Arc<Mutex<Inner>>,
    engine: Arc<dyn Engine>,
    max_memory_bytes: usize,
    counters: Arc<Counters>,
}

impl ThumbnailCache {
    pub fn new(engine: Arc<dyn Engine>, max_memory_bytes: usize) -> Self {
        debug!(max_memory_bytes, "Initialized thumbnail cache");
        Self {
            inner: Arc::new(Mutex::new(Inner {
                // Unbounded by count; the byte budget does the bounding.
                entries: LruCache::unbounded(),
                memory_bytes: 0,
            })),
            engine,
            max_memory_bytes,
            counters: Arc::new(Counters::default()),
        }
    }

    /// True if a valid entry for `image` at exactly `size` is cached.
    ///
    /// Does not decode and does not touch LRU order.
    pub fn exists(&self, image: &ImageDescriptor, size: ThumbSize) -> bool {
        self.inner
            .lock()
            .entries
            .peek(&image.id)
            .is_some_and(|entry| entry.size == size)
    }

    /// Return the thumbnail for `image` at `size`, decoding it on a miss.
    ///
    /// `None` means the engine could not decode the image at this size. That
    /// outcome is cached too and only retried for a different size.
    pub fn get(&self, image: &ImageDescriptor, size: ThumbSize) -> Option<Thumbnail> {
        {
            let mut inner = self.inner.lock();
            if let Some(entry) = inner.entries.get(&image.id) {
                if entry.size == size {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(id = %image.id, %size, "Cache hit");
                    return entry.bitmap.clone();
                }
                trace!(id = %image.id, cached = %entry.size, requested = %size, "Stale entry");
            }
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let bitmap = self.decode(image, size);
        self.insert(image.id, CacheEntry::new(bitmap.clone(), size), true);
        bitmap
    }

    /// Like [`get`](Self::get), but never evicts another entry.
    ///
    /// A miss whose bitmap would not fit in the remaining budget returns
    /// [`Warmed::BudgetFull`] without decoding. Used by the prefetch worker.
    pub fn warm(&self, image: &ImageDescriptor, size: ThumbSize) -> Warmed {
        {
            let mut inner = self.inner.lock();
            if let Some(entry) = inner.entries.get(&image.id) {
                if entry.size == size {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Warmed::Ready(entry.bitmap.clone());
                }
            }
            let stale = inner.entries.peek(&image.id).map_or(0, CacheEntry::memory_bytes);
            let needed = inner.memory_bytes.saturating_sub(stale) + size.rgba_bytes();
            if needed > self.max_memory_bytes {
                return Warmed::BudgetFull;
            }
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let bitmap = self.decode(image, size);
        if self.insert(image.id, CacheEntry::new(bitmap.clone(), size), false) {
            Warmed::Ready(bitmap)
        } else {
            Warmed::BudgetFull
        }
    }

    fn decode(&self, image: &ImageDescriptor, size: ThumbSize) -> Option<Thumbnail> {
        self.counters.decodes.fetch_add(1, Ordering::Relaxed);
        match self.engine.decode(&image.path, size) {
            Ok(bitmap) => Some(Arc::new(bitmap)),
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(path = ?image.path, %size, error = ?e, "Failed to decode thumbnail");
                None
            }
        }
    }

    /// Store `entry`, replacing any entry for `id`. Without `evict`, an entry
    /// that does not fit is dropped and false is returned.
    fn insert(&self, id: ImageId, entry: CacheEntry, evict: bool) -> bool {
        let new_bytes = entry.memory_bytes();
        let mut inner = self.inner.lock();

        let stale = inner.entries.peek(&id).map_or(0, CacheEntry::memory_bytes);
        if !evict && inner.memory_bytes.saturating_sub(stale) + new_bytes > self.max_memory_bytes
        {
            trace!(%id, new_bytes, "No room to warm thumbnail");
            return false;
        }
        if let Some(old) = inner.entries.pop(&id) {
            inner.memory_bytes = inner.memory_bytes.saturating_sub(old.memory_bytes());
        }

        while inner.memory_bytes + new_bytes > self.max_memory_bytes {
            let Some((_, evicted)) = inner.entries.pop_lru() else {
                break;
            };
            inner.memory_bytes = inner.memory_bytes.saturating_sub(evicted.memory_bytes());
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(
                evicted_bytes = evicted.memory_bytes(),
                current_bytes = inner.memory_bytes,
                "Evicted thumbnail"
            );
        }

        inner.memory_bytes += new_bytes;
        inner.entries.put(id, entry);
        true
    }

    /// Drop a single image's entry. Returns true if one was present.
    pub fn remove(&self, image: &ImageDescriptor) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.pop(&image.id) {
            Some(old) => {
                inner.memory_bytes = inner.memory_bytes.saturating_sub(old.memory_bytes());
                true
            }
            None => false,
        }
    }

    /// Empty the cache.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.memory_bytes = 0;
        debug!("Cleared thumbnail cache");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held by decoded bitmaps.
    pub fn memory_usage(&self) -> usize {
        self.inner.lock().memory_bytes
    }

    pub fn max_memory(&self) -> usize {
        self.max_memory_bytes
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            decodes: self.counters.decodes.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;
    use std::path::PathBuf;

    fn image(name: &str) -> ImageDescriptor {
        ImageDescriptor::from_path(PathBuf::from(name), 640, 480)
    }

    fn cache(engine: &Arc<ScriptedEngine>) -> ThumbnailCache {
        ThumbnailCache::new(engine.clone(), 64 * 1024 * 1024)
    }

    #[test]
    fn test_exists_after_get_same_size_only() {
        let engine = Arc::new(ScriptedEngine::new());
        let cache = cache(&engine);
        let img = image("/a.png");

        let thumb = cache.get(&img, ThumbSize::new(64, 48)).unwrap();
        assert_eq!(thumb.dimensions(), (64, 48));
        assert!(cache.exists(&img, ThumbSize::new(64, 48)));
        assert!(!cache.exists(&img, ThumbSize::new(32, 24)));
        assert!(!cache.exists(&image("/other.png"), ThumbSize::new(64, 48)));
    }

    #[test]
    fn test_hit_does_not_decode_again() {
        let engine = Arc::new(ScriptedEngine::new());
        let cache = cache(&engine);
        let img = image("/a.png");

        let first = cache.get(&img, ThumbSize::new(64, 64)).unwrap();
        let second = cache.get(&img, ThumbSize::new(64, 64)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.decode_count(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_size_change_replaces_entry() {
        let engine = Arc::new(ScriptedEngine::new());
        let cache = cache(&engine);
        let img = image("/a.png");

        cache.get(&img, ThumbSize::new(64, 64));
        cache.get(&img, ThumbSize::new(100, 75));
        assert_eq!(cache.len(), 1);
        assert!(cache.exists(&img, ThumbSize::new(100, 75)));
        assert!(!cache.exists(&img, ThumbSize::new(64, 64)));
        assert_eq!(cache.memory_usage(), 100 * 75 * 4);
        assert_eq!(engine.decode_count(), 2);
    }

    #[test]
    fn test_same_size_served_without_redecode() {
        // Only the requested size invalidates; a changed source file does not.
        let engine = Arc::new(ScriptedEngine::new());
        let cache = cache(&engine);
        let img = image("/a.png");

        cache.get(&img, ThumbSize::new(64, 64));
        engine.fail_path("/a.png");
        assert!(cache.get(&img, ThumbSize::new(64, 64)).is_some());
        assert_eq!(engine.decode_count(), 1);
    }

    #[test]
    fn test_clear_empties_everything() {
        let engine = Arc::new(ScriptedEngine::new());
        let cache = cache(&engine);
        let images: Vec<_> = (0..5).map(|i| image(&format!("/{i}.png"))).collect();
        for img in &images {
            cache.get(img, ThumbSize::new(16, 16));
        }
        assert_eq!(cache.len(), 5);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.memory_usage(), 0);
        for img in &images {
            assert!(!cache.exists(img, ThumbSize::new(16, 16)));
        }
    }

    #[test]
    fn test_failure_cached_for_same_size() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.fail_path("/broken.png");
        let cache = cache(&engine);
        let img = image("/broken.png");

        assert!(cache.get(&img, ThumbSize::new(32, 32)).is_none());
        assert!(cache.exists(&img, ThumbSize::new(32, 32)));
        assert!(cache.get(&img, ThumbSize::new(32, 32)).is_none());
        assert_eq!(engine.decode_count(), 1);

        // A different size retries.
        engine.heal_path("/broken.png");
        assert!(cache.get(&img, ThumbSize::new(48, 48)).is_some());
        assert_eq!(engine.decode_count(), 2);
        assert_eq!(cache.stats().failures, 1);
    }

    #[test]
    fn test_eviction_respects_budget() {
        let engine = Arc::new(ScriptedEngine::new());
        // Room for two 32x32 RGBA bitmaps.
        let cache = ThumbnailCache::new(engine.clone(), 2 * 32 * 32 * 4);
        let a = image("/a.png");
        let b = image("/b.png");
        let c = image("/c.png");
        let size = ThumbSize::new(32, 32);

        cache.get(&a, size);
        cache.get(&b, size);
        cache.get(&a, size);
        cache.get(&c, size);

        assert!(cache.memory_usage() <= cache.max_memory());
        assert!(cache.exists(&a, size));
        assert!(!cache.exists(&b, size));
        assert!(cache.exists(&c, size));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_warm_never_evicts() {
        let engine = Arc::new(ScriptedEngine::new());
        let cache = ThumbnailCache::new(engine.clone(), 2 * 32 * 32 * 4);
        let size = ThumbSize::new(32, 32);
        let a = image("/a.png");
        let b = image("/b.png");
        let c = image("/c.png");

        assert!(matches!(cache.warm(&a, size), Warmed::Ready(Some(_))));
        assert!(matches!(cache.warm(&b, size), Warmed::Ready(Some(_))));
        assert_eq!(cache.warm(&c, size), Warmed::BudgetFull);
        assert_eq!(engine.decode_count(), 2);

        // Cached entries are still served once the budget is full.
        assert!(matches!(cache.warm(&a, size), Warmed::Ready(Some(_))));
        assert!(cache.exists(&a, size));
        assert!(cache.exists(&b, size));
        assert!(!cache.exists(&c, size));
        assert_eq!(cache.stats().evictions, 0);

        // Failed decodes take no room.
        engine.fail_path("/c.png");
        assert_eq!(cache.get(&a, size).map(|t| t.dimensions()), Some((32, 32)));
        assert!(cache.remove(&b));
        assert_eq!(cache.warm(&c, size), Warmed::Ready(None));
        assert!(cache.exists(&c, size));
    }

    #[test]
    fn test_remove() {
        let engine = Arc::new(ScriptedEngine::new());
        let cache = cache(&engine);
        let img = image("/a.png");
        cache.get(&img, ThumbSize::new(8, 8));
        assert!(cache.remove(&img));
        assert!(!cache.remove(&img));
        assert_eq!(cache.memory_usage(), 0);
    }

    #[test]
    fn test_concurrent_access() {
        let engine = Arc::new(ScriptedEngine::new());
        let cache = cache(&engine);
        let images: Vec<_> = (0..32).map(|i| image(&format!("/{i}.png"))).collect();
        let size = ThumbSize::new(16, 16);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for img in &images {
                        assert!(cache.get(img, size).is_some());
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..10 {
                    cache.clear();
                }
            });
        });

        for img in &images {
            assert!(cache.get(img, size).is_some());
            assert!(cache.exists(img, size));
        }
    }
}
