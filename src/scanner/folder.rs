//! A filesystem-backed engine that groups images by their parent folder.
//!
//! This is not a duplicate detector; it only provides real groups and real
//! decoding so the grid can be driven without the native comparison library.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader, RgbaImage};
use tracing::{debug, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

use super::engine::Engine;
use crate::error::GridError;
use crate::models::{Group, ImageDescriptor, ThumbSize};

/// Configuration for the folder engine.
#[derive(Debug, Clone)]
pub struct FolderConfig {
    /// Maximum directory depth (0 = unlimited).
    pub max_depth: usize,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
    /// Groups with fewer members are dropped.
    pub min_group_size: usize,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            follow_symlinks: false,
            min_group_size: 1,
        }
    }
}

pub struct FolderEngine {
    root: PathBuf,
    config: FolderConfig,
}

impl FolderEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, FolderConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: FolderConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and collect image files, sorted by path.
    fn discover(&self) -> Result<Vec<PathBuf>, GridError> {
        let mut walker = WalkDir::new(&self.root).follow_links(self.config.follow_symlinks);
        if self.config.max_depth > 0 {
            walker = walker.max_depth(self.config.max_depth);
        }

        let mut paths = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // The root itself being unreadable is fatal; anything below it is not.
                Err(e) if e.depth() == 0 => {
                    return Err(GridError::Scan {
                        path: self.root.clone(),
                        source: e,
                    })
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            if is_image_path(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        paths.sort();
        Ok(paths)
    }
}

impl Engine for FolderEngine {
    fn decode(&self, path: &Path, size: ThumbSize) -> Result<RgbaImage> {
        if size.is_empty() {
            return Err(anyhow!("Refusing to decode {:?} at {}", path, size));
        }
        let img = image::open(path).with_context(|| format!("Failed to load image: {:?}", path))?;
        let thumb = img.resize_exact(size.width, size.height, FilterType::CatmullRom);
        Ok(thumb.to_rgba8())
    }

    fn list_groups(&self) -> Result<Vec<Group>> {
        let paths = self.discover()?;

        let mut by_folder: BTreeMap<PathBuf, Vec<ImageDescriptor>> = BTreeMap::new();
        for path in paths {
            let (width, height) = match read_dimensions(&path) {
                Ok(dims) => dims,
                Err(e) => {
                    warn!(?path, error = ?e, "Skipping image without readable dimensions");
                    continue;
                }
            };
            let folder = path.parent().map(Path::to_path_buf).unwrap_or_default();
            by_folder
                .entry(folder)
                .or_default()
                .push(ImageDescriptor::from_path(path, width, height));
        }

        let groups: Vec<Group> = by_folder
            .into_iter()
            .filter(|(_, images)| images.len() >= self.config.min_group_size)
            .map(|(folder, images)| {
                let id = xxh3_64(folder.as_os_str().as_encoded_bytes());
                Group::new(id, images)
            })
            .collect();

        debug!(root = ?self.root, groups = groups.len(), "Listed folder groups");
        Ok(groups)
    }
}

/// Check the extension against the formats the `image` crate is built with.
pub fn is_image_path(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    matches!(
        ImageFormat::from_extension(ext),
        Some(
            ImageFormat::Jpeg
                | ImageFormat::Png
                | ImageFormat::WebP
                | ImageFormat::Gif
                | ImageFormat::Bmp
                | ImageFormat::Tiff
        )
    )
}

/// Read pixel dimensions without decoding the whole image.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to guess image format")?;
    reader
        .into_dimensions()
        .with_context(|| format!("Failed to read dimensions: {:?}", path))
}
