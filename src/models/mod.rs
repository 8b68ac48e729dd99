pub mod group;
pub mod image;

pub use self::group::*;
pub use self::image::*;
