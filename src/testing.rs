//! In-memory engine for unit tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::models::{Group, ImageDescriptor, ThumbSize};
use crate::scanner::Engine;

#[derive(Default)]
pub struct ScriptedEngine {
    decodes: AtomicUsize,
    failing: Mutex<HashSet<PathBuf>>,
    delay: Mutex<Option<Duration>>,
    groups: Mutex<Vec<Group>>,
    decoded_paths: Mutex<Vec<PathBuf>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(groups: Vec<Group>) -> Self {
        let engine = Self::new();
        *engine.groups.lock() = groups;
        engine
    }

    pub fn fail_path(&self, path: &str) {
        self.failing.lock().insert(PathBuf::from(path));
    }

    pub fn heal_path(&self, path: &str) {
        self.failing.lock().remove(Path::new(path));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn decoded_paths(&self) -> Vec<PathBuf> {
        self.decoded_paths.lock().clone()
    }
}

impl Engine for ScriptedEngine {
    fn decode(&self, path: &Path, size: ThumbSize) -> Result<RgbaImage> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.decodes.fetch_add(1, Ordering::SeqCst);
        self.decoded_paths.lock().push(path.to_path_buf());
        if self.failing.lock().contains(path) {
            return Err(anyhow!("scripted failure for {:?}", path));
        }
        Ok(RgbaImage::from_pixel(size.width, size.height, Rgba([1, 2, 3, 255])))
    }

    fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups.lock().clone())
    }
}

/// A group of `count` 200x100 images named `/g{id}/{n}.png`.
pub fn group(id: u64, count: usize) -> Group {
    let images = (0..count)
        .map(|n| ImageDescriptor::from_path(PathBuf::from(format!("/g{id}/{n}.png")), 200, 100))
        .collect();
    Group::new(id, images)
}
