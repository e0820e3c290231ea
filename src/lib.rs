//! # Tincan Use
//!
//! Small reactive utilities built on explicit signals.
//!
//! ## Signals (Low-level primitives)
//!
//! Observer building blocks with no ambient dependency tracking:
//! - `Signal<T>` - Shared value that notifies subscribers when changed
//! - `watch` - Deep-equality change observation returning a `Subscription`
//! - `MaybeSignal<T>` - Either a static value or a signal
//!
//! ## Hooks (High-level utilities)
//!
//! Adapters from imperative async APIs to reactive values:
//! - `AsyncState<T, E>` - Latest result, loading flag and error of an async task
//! - `use_image` - Loads an image and reloads it whenever its source changes
//!
//! Loads are guarded by a generation counter: when a newer execution starts,
//! older ones can no longer write state.

pub mod async_state;
pub mod error;
pub mod image;
pub mod signal;

// Re-export main types for convenience
pub use self::async_state::{use_async_state, AsyncState, AsyncStateOptions};
pub use self::error::{Error, LoadError, SourceError};
pub use self::image::{
    use_image, use_image_with, FsImageLoader, ImageLoader, ImageSource, LoadedImage, UseImage,
    UseImageOptions, Viewport,
};
pub use self::signal::{watch, MaybeSignal, Signal, Subscription};
