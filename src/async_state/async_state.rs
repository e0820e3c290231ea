use super::options::AsyncStateOptions;
use crate::error::Error;
use crate::signal::Signal;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

type Task<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Reactive state of a repeatable asynchronous operation.
///
/// Tracks the latest result (`state`), whether it is ready, whether an
/// execution is in flight, and the latest error. Each of these is a
/// [`Signal`], so consumers can subscribe to or [`watch`](crate::watch) them.
///
/// Every execution gets a new generation. Only the newest generation may
/// write results, so a slow execution that was superseded by a newer one can
/// never overwrite its state.
///
/// Subscribers are notified after the internal lock is released, so a
/// subscriber may start a new execution, for example to switch to a fallback
/// when `error` is set.
///
/// An execution that is cancelled (its future dropped, its task aborted) or
/// that panics before committing leaves `is_loading` cleared if it was still
/// the newest, so [`settled`](Self::settled) always resolves.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tincan_use::{AsyncState, AsyncStateOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let state = AsyncState::new(
///     || async { Ok::<_, String>(42) },
///     AsyncStateOptions::default().with_immediate(false),
/// );
/// assert_eq!(state.state(), None);
///
/// state.execute(Duration::ZERO).await.unwrap();
/// assert_eq!(state.state(), Some(42));
/// assert!(state.is_ready());
/// # }
/// ```
pub struct AsyncState<T, E> {
    inner: Arc<Inner<T, E>>,
}

struct Inner<T, E> {
    state: Signal<Option<T>>,
    is_ready: Signal<bool>,
    is_loading: Signal<bool>,
    error: Signal<Option<E>>,
    // Newest generation; also serialises resets against commits.
    generation: Mutex<u64>,
    task: Task<T, E>,
    options: AsyncStateOptions<T, E>,
}

/// One execution's claim on the state.
///
/// Dropped without committing while still the newest generation, it clears
/// `is_loading`.
struct Ticket<T, E> {
    inner: Arc<Inner<T, E>>,
    generation: u64,
    committed: bool,
}

impl<T, E> Ticket<T, E> {
    fn is_current(&self) -> bool {
        *self
            .inner
            .generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            == self.generation
    }
}

impl<T, E> Drop for Ticket<T, E> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        let abandoned = {
            let generation = self
                .inner
                .generation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let current = *generation == self.generation;
            if current {
                self.inner.is_loading.set_silent(false);
            }
            current
        };

        if abandoned {
            tracing::debug!(generation = self.generation, "execution ended without a result");
            self.inner.is_loading.notify();
        }
    }
}

impl<T, E> AsyncState<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + std::fmt::Display + 'static,
{
    /// Wrap `task` in a new async state.
    ///
    /// Nothing runs until [`execute`](Self::execute) is called; see
    /// [`use_async_state`] for the variant honouring `options.immediate`.
    pub fn new<F, Fut>(task: F, options: AsyncStateOptions<T, E>) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let task: Task<T, E> = Arc::new(move || task().boxed());

        Self {
            inner: Arc::new(Inner {
                state: Signal::new(options.initial_state.clone()),
                is_ready: Signal::new(false),
                is_loading: Signal::new(false),
                error: Signal::new(None),
                generation: Mutex::new(0),
                task,
                options,
            }),
        }
    }

    /// Run the task after `delay` and record its outcome.
    ///
    /// Returns the state after the execution. If `throw_error` is set and
    /// the task failed, the error is returned instead (also when this
    /// execution was superseded and its error was not recorded).
    pub async fn execute(&self, delay: Duration) -> Result<Option<T>, E> {
        let ticket = self.begin();
        self.run(ticket, delay).await
    }

    /// Start an execution on `handle`.
    ///
    /// The reset (`is_loading`, cleared `error`, and `state` when
    /// `reset_on_execute` is set) is applied before this returns; the delay
    /// and the task itself run on the runtime.
    pub fn spawn_execute(
        &self,
        handle: &Handle,
        delay: Duration,
    ) -> JoinHandle<Result<Option<T>, E>> {
        let ticket = self.begin();
        let this = self.clone();
        handle.spawn(async move { this.run(ticket, delay).await })
    }

    /// Wait until no execution is in flight.
    ///
    /// Returns immediately when the state is idle.
    pub async fn settled(&self) {
        let notify = Arc::new(Notify::new());
        let _subscription = self.inner.is_loading.subscribe({
            let notify = Arc::clone(&notify);
            move |loading| {
                if !*loading {
                    notify.notify_one();
                }
            }
        });

        while self.is_loading() {
            notify.notified().await;
        }
    }

    pub fn state(&self) -> Option<T> {
        self.inner.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.is_ready.get()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.is_loading.get()
    }

    pub fn error(&self) -> Option<E> {
        self.inner.error.get()
    }

    pub fn state_signal(&self) -> &Signal<Option<T>> {
        &self.inner.state
    }

    pub fn is_ready_signal(&self) -> &Signal<bool> {
        &self.inner.is_ready
    }

    pub fn is_loading_signal(&self) -> &Signal<bool> {
        &self.inner.is_loading
    }

    pub fn error_signal(&self) -> &Signal<Option<E>> {
        &self.inner.error
    }

    pub fn options(&self) -> &AsyncStateOptions<T, E> {
        &self.inner.options
    }

    // Writes happen under the generation lock, notifications after it is
    // released.
    fn begin(&self) -> Ticket<T, E> {
        let inner = &*self.inner;
        let reset = inner.options.reset_on_execute;

        let generation = {
            let mut generation = inner.generation.lock().unwrap_or_else(PoisonError::into_inner);
            *generation += 1;

            if reset {
                inner.state.set_silent(inner.options.initial_state.clone());
            }
            inner.error.set_silent(None);
            inner.is_ready.set_silent(false);
            inner.is_loading.set_silent(true);
            *generation
        };

        tracing::debug!(generation, "async state execution started");
        if reset {
            inner.state.notify();
        }
        inner.error.notify();
        inner.is_ready.notify();
        inner.is_loading.notify();

        Ticket {
            inner: Arc::clone(&self.inner),
            generation,
            committed: false,
        }
    }

    async fn run(&self, mut ticket: Ticket<T, E>, delay: Duration) -> Result<Option<T>, E> {
        let inner = &*self.inner;
        let generation = ticket.generation;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
            if !ticket.is_current() {
                tracing::debug!(generation, "superseded during delay, skipping task");
                return Ok(self.state());
            }
        }

        let result = (inner.task)().await;

        ticket.committed = {
            let current = inner.generation.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == generation {
                match &result {
                    Ok(data) => {
                        inner.state.set_silent(Some(data.clone()));
                        inner.is_ready.set_silent(true);
                    }
                    Err(err) => inner.error.set_silent(Some(err.clone())),
                }
                inner.is_loading.set_silent(false);
                true
            } else {
                false
            }
        };

        if ticket.committed {
            match &result {
                Ok(_) => {
                    inner.state.notify();
                    inner.is_ready.notify();
                }
                Err(_) => inner.error.notify(),
            }
            inner.is_loading.notify();

            match &result {
                Ok(data) => {
                    tracing::debug!(generation, "async state ready");
                    if let Some(on_success) = &inner.options.on_success {
                        on_success(data);
                    }
                }
                Err(err) => {
                    tracing::debug!(generation, error = %err, "async state failed");
                    if let Some(on_error) = &inner.options.on_error {
                        on_error(err);
                    }
                }
            }
        } else {
            tracing::debug!(generation, "discarding superseded result");
        }

        match result {
            Err(err) if inner.options.throw_error => Err(err),
            _ => Ok(self.state()),
        }
    }
}

impl<T, E> Clone for AsyncState<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> std::fmt::Debug for AsyncState<T, E>
where
    T: std::fmt::Debug,
    E: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncState")
            .field("state", &self.inner.state)
            .field("is_ready", &self.inner.is_ready)
            .field("is_loading", &self.inner.is_loading)
            .field("error", &self.inner.error)
            .finish()
    }
}

/// Create an [`AsyncState`] and, when `options.immediate` is set, start the
/// first execution on the current tokio runtime.
///
/// Fails with [`Error::NoRuntime`] when called outside a runtime.
pub fn use_async_state<T, E, F, Fut>(
    task: F,
    options: AsyncStateOptions<T, E>,
) -> Result<AsyncState<T, E>, Error>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + std::fmt::Display + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let handle = Handle::try_current()?;
    let state = AsyncState::new(task, options);
    if state.options().immediate {
        let delay = state.options().delay;
        drop(state.spawn_execute(&handle, delay));
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn manual() -> AsyncStateOptions<u32, String> {
        AsyncStateOptions::default().with_immediate(false)
    }

    #[tokio::test]
    async fn execute_success_sets_state() {
        let state = AsyncState::new(|| async { Ok::<u32, String>(7) }, manual());

        let result = state.execute(Duration::ZERO).await;

        assert_eq!(result, Ok(Some(7)));
        assert_eq!(state.state(), Some(7));
        assert!(state.is_ready());
        assert!(!state.is_loading());
        assert_eq!(state.error(), None);
    }

    #[tokio::test]
    async fn execute_failure_sets_error() {
        let state = AsyncState::new(|| async { Err::<u32, _>("boom".to_string()) }, manual());

        let result = state.execute(Duration::ZERO).await;

        assert_eq!(result, Ok(None));
        assert_eq!(state.state(), None);
        assert_eq!(state.error().as_deref(), Some("boom"));
        assert!(!state.is_ready());
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn throw_error_returns_err() {
        let state = AsyncState::new(
            || async { Err::<u32, _>("boom".to_string()) },
            manual().with_throw_error(true),
        );

        assert_eq!(state.execute(Duration::ZERO).await, Err("boom".to_string()));
        assert_eq!(state.error().as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn reset_on_execute_clears_previous_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = AsyncState::new(
            {
                let calls = calls.clone();
                move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Ok(1)
                        } else {
                            Err("second".to_string())
                        }
                    }
                }
            },
            manual(),
        );

        state.execute(Duration::ZERO).await.unwrap();
        assert_eq!(state.state(), Some(1));

        state.execute(Duration::ZERO).await.unwrap();
        assert_eq!(state.state(), None);
        assert_eq!(state.error().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn without_reset_previous_state_survives_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = AsyncState::new(
            {
                let calls = calls.clone();
                move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Ok(1)
                        } else {
                            Err("second".to_string())
                        }
                    }
                }
            },
            manual().with_reset_on_execute(false),
        );

        state.execute(Duration::ZERO).await.unwrap();
        state.execute(Duration::ZERO).await.unwrap();
        assert_eq!(state.state(), Some(1));
        assert_eq!(state.error().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn initial_state_is_restored_on_reset() {
        let state = AsyncState::new(
            || async { Err::<u32, _>("nope".to_string()) },
            manual().with_initial_state(99),
        );
        assert_eq!(state.state(), Some(99));

        state.state_signal().set(Some(1));
        state.execute(Duration::ZERO).await.unwrap();
        assert_eq!(state.state(), Some(99));
    }

    #[tokio::test]
    async fn callbacks_receive_outcome() {
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let ok = AsyncState::new(
            || async { Ok::<u32, String>(1) },
            manual().on_success({
                let successes = successes.clone();
                move |value| {
                    successes.fetch_add(*value as usize, Ordering::SeqCst);
                }
            }),
        );
        let failing = AsyncState::new(
            || async { Err::<u32, _>("x".to_string()) },
            manual().on_error({
                let failures = failures.clone();
                move |_| {
                    failures.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        ok.execute(Duration::ZERO).await.unwrap();
        failing.execute(Duration::ZERO).await.unwrap();

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn superseded_result_is_discarded() {
        let (tx_first, rx_first) = oneshot::channel::<Result<u32, String>>();
        let (tx_second, rx_second) = oneshot::channel::<Result<u32, String>>();
        let pending = Arc::new(Mutex::new(VecDeque::from([rx_first, rx_second])));

        let state = AsyncState::new(
            move || {
                let rx = pending.lock().unwrap().pop_front().expect("unexpected execution");
                async move { rx.await.expect("sender dropped") }
            },
            manual(),
        );

        let first = state.execute(Duration::ZERO);
        let second = state.execute(Duration::ZERO);
        let driver = async {
            tokio::task::yield_now().await;
            tx_second.send(Ok(2)).unwrap();
            tokio::task::yield_now().await;
            tx_first.send(Ok(1)).unwrap();
        };

        let (first, second, ()) = tokio::join!(first, second, driver);

        assert!(first.is_ok());
        assert_eq!(second, Ok(Some(2)));
        assert_eq!(state.state(), Some(2));
        assert!(!state.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_defers_task() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = AsyncState::new(
            {
                let calls = calls.clone();
                move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<u32, String>(5) }
                }
            },
            manual(),
        );

        let task = state.spawn_execute(&Handle::current(), Duration::from_millis(100));
        assert!(state.is_loading());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(task.await.unwrap(), Ok(Some(5)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.state(), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn executions_within_delay_are_debounced() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = AsyncState::new(
            {
                let calls = calls.clone();
                move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) as u32;
                    async move { Ok::<u32, String>(n) }
                }
            },
            manual(),
        );

        let handle = Handle::current();
        let first = state.spawn_execute(&handle, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = state.spawn_execute(&handle, Duration::from_millis(100));

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.state(), Some(0));
    }

    #[tokio::test]
    async fn error_subscriber_may_start_a_new_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = AsyncState::new(
            {
                let calls = calls.clone();
                move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Err("first".to_string())
                        } else {
                            Ok(2)
                        }
                    }
                }
            },
            manual(),
        );

        let handle = Handle::current();
        let _retry = state.error_signal().subscribe({
            let state = state.clone();
            move |error| {
                if error.is_some() {
                    drop(state.spawn_execute(&handle, Duration::ZERO));
                }
            }
        });

        assert_eq!(state.execute(Duration::ZERO).await, Ok(None));
        assert!(state.is_loading());

        tokio::time::timeout(Duration::from_secs(5), state.settled())
            .await
            .unwrap();
        assert_eq!(state.state(), Some(2));
        assert_eq!(state.error(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_execution_clears_loading() {
        let state = AsyncState::new(
            || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<u32, String>(1)
            },
            manual(),
        );

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), state.execute(Duration::ZERO)).await;
        assert!(cancelled.is_err());

        assert!(!state.is_loading());
        assert!(!state.is_ready());
        assert_eq!(state.state(), None);
        tokio::time::timeout(Duration::from_millis(500), state.settled())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_execution_clears_loading() {
        let state = AsyncState::new(|| async { Ok::<u32, String>(1) }, manual());

        let task = state.spawn_execute(&Handle::current(), Duration::from_secs(1));
        assert!(state.is_loading());
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(!state.is_loading());
        state.settled().await;
    }

    #[tokio::test]
    async fn panicking_task_clears_loading() {
        let crash = true;
        let state = AsyncState::new(
            move || async move {
                if crash {
                    panic!("task crashed");
                }
                Ok::<u32, String>(1)
            },
            manual(),
        );

        let task = state.spawn_execute(&Handle::current(), Duration::ZERO);
        assert!(task.await.unwrap_err().is_panic());

        assert!(!state.is_loading());
        assert_eq!(state.error(), None);
        state.settled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_a_superseded_execution_keeps_newer_one_loading() {
        let state = AsyncState::new(
            || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<u32, String>(1)
            },
            manual(),
        );

        let handle = Handle::current();
        let older = state.spawn_execute(&handle, Duration::ZERO);
        let newer = state.spawn_execute(&handle, Duration::ZERO);
        older.abort();
        assert!(older.await.unwrap_err().is_cancelled());
        assert!(state.is_loading());

        assert_eq!(newer.await.unwrap(), Ok(Some(1)));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn use_async_state_runs_immediately() {
        let state = use_async_state(
            || async { Ok::<u32, String>(3) },
            AsyncStateOptions::default(),
        )
        .unwrap();
        assert!(state.is_loading());

        state.settled().await;
        assert!(!state.is_loading());

        assert_eq!(state.state(), Some(3));
    }

    #[test]
    fn use_async_state_requires_runtime() {
        let result = use_async_state(
            || async { Ok::<u32, String>(3) },
            AsyncStateOptions::default(),
        );
        assert!(matches!(result, Err(Error::NoRuntime(_))));
    }
}
