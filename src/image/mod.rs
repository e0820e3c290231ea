//! Reactive image loading.
//!
//! - [`ImageSource`]: validated `src` / `srcset` / `sizes` descriptor
//! - [`ImageLoader`]: one load attempt per call, [`FsImageLoader`] by default
//! - [`use_image`]: async state that reloads whenever the source changes

mod loader;
mod source;
pub mod srcset;
mod use_image;

pub use loader::{FsImageLoader, ImageLoader, LoadedImage};
pub use source::{ImageSource, ImageSourceBuilder};
pub use srcset::Viewport;
pub use use_image::{use_image, use_image_with, UseImage, UseImageOptions};
