//! Result sources for the grid.

pub mod engine;
pub mod folder;

pub use engine::Engine;
pub use folder::{FolderConfig, FolderEngine};
