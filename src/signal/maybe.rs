use super::signal::Signal;

/// A value that is either fixed or observed through a [`Signal`].
///
/// Hooks accept `impl Into<MaybeSignal<T>>` so callers can pass a plain value
/// when it never changes, or a signal when the hook should react to updates.
#[derive(Clone, Debug)]
pub enum MaybeSignal<T> {
    /// A value that never changes.
    Static(T),
    /// A value read from, and watched through, a signal.
    Reactive(Signal<T>),
}

impl<T: Clone + Send + Sync + 'static> MaybeSignal<T> {
    /// Dereference to the current value.
    pub fn get(&self) -> T {
        match self {
            MaybeSignal::Static(value) => value.clone(),
            MaybeSignal::Reactive(signal) => signal.get(),
        }
    }

    /// The underlying signal, if this value is reactive.
    pub fn as_signal(&self) -> Option<&Signal<T>> {
        match self {
            MaybeSignal::Static(_) => None,
            MaybeSignal::Reactive(signal) => Some(signal),
        }
    }

    pub fn is_reactive(&self) -> bool {
        matches!(self, MaybeSignal::Reactive(_))
    }
}

impl<T> From<T> for MaybeSignal<T> {
    fn from(value: T) -> Self {
        MaybeSignal::Static(value)
    }
}

impl<T> From<Signal<T>> for MaybeSignal<T> {
    fn from(signal: Signal<T>) -> Self {
        MaybeSignal::Reactive(signal)
    }
}

impl<T> From<&Signal<T>> for MaybeSignal<T> {
    fn from(signal: &Signal<T>) -> Self {
        MaybeSignal::Reactive(signal.clone())
    }
}
