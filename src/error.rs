use std::sync::Arc;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The single failure kind of a resource load.
///
/// Whether the address could not be found, could not be read or could not be
/// decoded, the consumer sees a `LoadError`. The underlying cause is still
/// reachable through [`std::error::Error::source`].
#[derive(Debug, Clone, Error)]
#[error("failed to load `{src}`")]
pub struct LoadError {
    src: String,
    #[source]
    source: Arc<dyn std::error::Error + Send + Sync>,
}

impl LoadError {
    pub fn new(src: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            src: src.into(),
            source: Arc::from(source.into()),
        }
    }

    /// The address that failed to load.
    pub fn src(&self) -> &str {
        &self.src
    }
}

// Causes are opaque, so two errors are equal when they name the same
// address and render the same cause.
impl PartialEq for LoadError {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src && self.source.to_string() == other.source.to_string()
    }
}

/// A descriptor that was rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("image source address is empty")]
    EmptySource,
    #[error("invalid srcset candidate `{0}`")]
    InvalidSrcset(String),
    #[error("invalid sizes entry `{0}`")]
    InvalidSizes(String),
}

/// Errors raised while setting up a hook.
#[derive(Debug, Error)]
pub enum Error {
    #[error("hook must be created inside a tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error(transparent)]
    Source(#[from] SourceError),
}
