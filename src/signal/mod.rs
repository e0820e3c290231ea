//! Explicit reactive primitives.
//!
//! This module provides the observer building blocks the hooks are made of:
//! - Signals: shared values with subscriber callbacks
//! - Watch: deep-equality change observation over a signal
//! - MaybeSignal: a value that is either static or reactive

mod maybe;
mod signal;
mod watch;

pub use maybe::MaybeSignal;
pub use signal::{Signal, Subscription};
pub use watch::watch;
