//! Thumbnail virtualization and prefetch cache for grouped image results.

pub mod config;
pub mod error;
pub mod layout;
pub mod models;
pub mod scanner;
pub mod thumbnails;

#[cfg(test)]
mod testing;

pub use config::GridConfig;
pub use error::{GridError, Result};
pub use layout::GroupTable;
