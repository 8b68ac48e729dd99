use super::image::{ImageDescriptor, ThumbSize};

/// A set of images the engine judged related, shown as one row.
///
/// Built wholesale from engine results and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: u64,
    images: Vec<ImageDescriptor>,
    size_max: ThumbSize,
}

impl Group {
    pub fn new(id: u64, images: Vec<ImageDescriptor>) -> Self {
        let size_max = images
            .iter()
            .fold(ThumbSize::default(), |acc, image| acc.max(image.natural_size()));
        Self {
            id,
            images,
            size_max,
        }
    }

    /// Member images in display order.
    pub fn images(&self) -> &[ImageDescriptor] {
        &self.images
    }

    /// Largest width and largest height across all members.
    pub fn size_max(&self) -> ThumbSize {
        self.size_max
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
