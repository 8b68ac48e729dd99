use std::fmt;
use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

/// Opaque, session-stable identity of one image in a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

impl ImageId {
    /// Derive an identity from the image path.
    pub fn from_path(path: &Path) -> Self {
        Self(xxh3_64(path.as_os_str().as_encoded_bytes()))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Pixel dimensions, used both for natural image sizes and requested thumbnail sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ThumbSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Component-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes needed for an RGBA buffer of this size.
    pub fn rgba_bytes(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

impl fmt::Display for ThumbSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One image as reported by the comparison engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub id: ImageId,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl ImageDescriptor {
    pub fn new(id: ImageId, path: PathBuf, width: u32, height: u32) -> Self {
        Self {
            id,
            path,
            width,
            height,
        }
    }

    /// Create a descriptor whose identity is derived from its path.
    pub fn from_path(path: PathBuf, width: u32, height: u32) -> Self {
        let id = ImageId::from_path(&path);
        Self::new(id, path, width, height)
    }

    pub fn natural_size(&self) -> ThumbSize {
        ThumbSize::new(self.width, self.height)
    }
}
