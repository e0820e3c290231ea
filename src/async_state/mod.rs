//! Reactive state for asynchronous operations.
//!
//! An [`AsyncState`] wraps a repeatable async task and exposes its latest
//! result, readiness, loading flag and error as signals.

mod async_state;
mod options;

pub use async_state::{use_async_state, AsyncState};
pub use options::AsyncStateOptions;
