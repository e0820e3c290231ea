use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;
type Subscribers<T> = Mutex<BTreeMap<usize, Subscriber<T>>>;

/// A reactive value that notifies its subscribers when changed.
///
/// Signals are explicit observables: nothing is tracked implicitly. Interested
/// parties call [`Signal::subscribe`] (or [`watch`](crate::signal::watch)) and
/// keep the returned [`Subscription`] alive for as long as they want updates.
///
/// Clones share the same value and the same subscribers.
///
/// # Examples
///
/// ```
/// use tincan_use::Signal;
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
///
/// let count = Signal::new(0);
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let _sub = count.subscribe({
///     let seen = seen.clone();
///     move |value| seen.store(*value, Ordering::SeqCst)
/// });
///
/// count.set(42);
/// assert_eq!(seen.load(Ordering::SeqCst), 42);
/// ```
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    subscribers: Arc<Subscribers<T>>,
    next_id: Arc<AtomicUsize>,
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(initial: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
            subscribers: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, new_value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = new_value;
        self.notify();
    }

    /// Update the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut value = self.value.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut *value);
        }
        self.notify();
    }

    // Store a value without notifying; the caller must follow up with
    // `notify` once it no longer holds any lock a subscriber could need.
    pub(crate) fn set_silent(&self, new_value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = new_value;
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&*value)
    }

    /// Subscribe to changes.
    ///
    /// The callback runs after every [`set`](Self::set) or
    /// [`update`](Self::update), receiving the new value. It is not called
    /// with the current value on subscription. Dropping the returned
    /// [`Subscription`] removes the callback.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(callback));

        let subscribers: Weak<Subscribers<T>> = Arc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subscribers) = subscribers.upgrade() {
                subscribers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
            }
        })
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // Snapshot both the value and the subscriber list so callbacks run with
    // no lock held and may freely read or write signals.
    pub(crate) fn notify(&self) {
        let subscribers: Vec<Subscriber<T>> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        if subscribers.is_empty() {
            return;
        }

        let value = self.get();
        tracing::trace!(subscribers = subscribers.len(), "notifying signal subscribers");
        for subscriber in subscribers {
            subscriber(&value);
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Signal").field("value", &*value).finish()
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// RAII guard for a signal subscription.
///
/// The callback is removed from the signal when this guard is dropped.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Keep the callback registered for the lifetime of the signal.
    pub fn detach(mut self) {
        self.unsubscribe.take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
