use super::signal::{Signal, Subscription};
use std::sync::{Mutex, PoisonError};

/// Watch a signal for changes, comparing values by deep equality.
///
/// The callback receives `(new, old)` and only runs when the new value
/// differs from the last value this watcher observed. Because the comparison
/// is `PartialEq` over the whole value, a change to any nested field
/// triggers it, while writes that leave the value equal do not.
///
/// The watcher is not called for the value current at creation time.
///
/// # Examples
///
/// ```
/// use tincan_use::{watch, Signal};
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
///
/// let name = Signal::new(String::from("a.png"));
/// let runs = Arc::new(AtomicUsize::new(0));
///
/// let _watch = watch(&name, {
///     let runs = runs.clone();
///     move |_new, _old| {
///         runs.fetch_add(1, Ordering::SeqCst);
///     }
/// });
///
/// name.set(String::from("a.png")); // unchanged
/// name.set(String::from("b.png"));
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// ```
pub fn watch<T, F>(source: &Signal<T>, callback: F) -> Subscription
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&T, &T) + Send + Sync + 'static,
{
    let last = Mutex::new(source.get());

    source.subscribe(move |value| {
        let old = {
            let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == *value {
                return;
            }
            std::mem::replace(&mut *last, value.clone())
        };
        callback(value, &old);
    })
}
