use std::sync::Arc;
use std::time::Duration;

type Callback<V> = Arc<dyn Fn(&V) + Send + Sync>;

/// Configuration for an [`AsyncState`](super::AsyncState).
///
/// Built with the `with_*` methods from [`Default`]:
///
/// ```
/// use std::time::Duration;
/// use tincan_use::AsyncStateOptions;
///
/// let options = AsyncStateOptions::<u32, String>::default()
///     .with_delay(Duration::from_millis(50))
///     .with_reset_on_execute(false);
///
/// assert!(options.immediate);
/// assert!(!options.reset_on_execute);
/// ```
pub struct AsyncStateOptions<T, E> {
    /// Delay before the task runs, for the immediate execution and for
    /// re-executions triggered by a watcher.
    pub delay: Duration,
    /// Execute once as soon as the state is created.
    pub immediate: bool,
    /// Reset `state` to `initial_state` at the start of every execution.
    pub reset_on_execute: bool,
    /// Value of `state` before the first success and after each reset.
    pub initial_state: Option<T>,
    /// Return the task's error from `execute` instead of only storing it.
    pub throw_error: bool,
    pub(crate) on_success: Option<Callback<T>>,
    pub(crate) on_error: Option<Callback<E>>,
}

impl<T, E> AsyncStateOptions<T, E> {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn with_reset_on_execute(mut self, reset: bool) -> Self {
        self.reset_on_execute = reset;
        self
    }

    pub fn with_initial_state(mut self, initial: T) -> Self {
        self.initial_state = Some(initial);
        self
    }

    pub fn with_throw_error(mut self, throw_error: bool) -> Self {
        self.throw_error = throw_error;
        self
    }

    /// Called with the result of every successful, non-superseded execution.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Called with the error of every failed, non-superseded execution.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl<T, E> Default for AsyncStateOptions<T, E> {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            immediate: true,
            reset_on_execute: true,
            initial_state: None,
            throw_error: false,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T: Clone, E> Clone for AsyncStateOptions<T, E> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay,
            immediate: self.immediate,
            reset_on_execute: self.reset_on_execute,
            initial_state: self.initial_state.clone(),
            throw_error: self.throw_error,
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T: std::fmt::Debug, E> std::fmt::Debug for AsyncStateOptions<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncStateOptions")
            .field("delay", &self.delay)
            .field("immediate", &self.immediate)
            .field("reset_on_execute", &self.reset_on_execute)
            .field("initial_state", &self.initial_state)
            .field("throw_error", &self.throw_error)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
