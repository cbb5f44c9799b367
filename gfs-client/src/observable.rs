//! A minimal observable cell.
//!
//! [`Observable`] holds one value and an ordered list of callbacks. Setting a
//! different value runs every callback synchronously, in the order they were
//! registered, before `set` returns. [`Derived`] projects an observable
//! through a pure function and only reports changes of the projected value.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Neither lock guards a partially written value, so poisoning is ignored.
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A shared, observable value.
///
/// Clones share the same cell. Concurrent `set` calls are serialized from the
/// update through the last callback, so subscribers see changes in the order
/// they were applied. A callback may read the cell or subscribe to it, but
/// must not `set` the cell that is notifying it.
pub struct Observable<T> {
    inner: Arc<Mutex<Inner<T>>>,
    notify: Arc<Mutex<()>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Creates a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value,
                next_id: 0,
                subscribers: Vec::new(),
            })),
            notify: Arc::new(Mutex::new(())),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Replaces the value and notifies subscribers if it changed.
    ///
    /// Returns `true` when subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        let _notifying = lock(&self.notify);
        let callbacks = {
            let mut inner = lock(&self.inner);
            if inner.value == value {
                return false;
            }
            inner.value = value.clone();
            inner
                .subscribers
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect::<Vec<_>>()
        };

        for callback in callbacks {
            callback(&value);
        }
        true
    }

    /// Registers `callback` for future changes.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped or unsubscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).subscribers.retain(|(sub_id, _)| *sub_id != id);
            }
        })
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    /// Projects this cell through `project`.
    pub fn map<U, F>(&self, project: F) -> Derived<U>
    where
        U: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let source = self.clone();
        let project = Arc::new(project);
        let read = {
            let source = source.clone();
            let project = Arc::clone(&project);
            Arc::new(move || project(&source.get())) as Arc<dyn Fn() -> U + Send + Sync>
        };
        let watch = Arc::new(move |callback: Arc<dyn Fn(&U) + Send + Sync>| {
            let last = Mutex::new(project(&source.get()));
            let project = Arc::clone(&project);
            source.subscribe(move |value| {
                let next = project(value);
                let changed = {
                    let mut last = lock(&last);
                    if *last == next {
                        false
                    } else {
                        *last = next.clone();
                        true
                    }
                };
                if changed {
                    callback(&next);
                }
            })
        }) as WatchFn<U>;

        Derived { read, watch }
    }
}

type WatchFn<U> = Arc<dyn Fn(Arc<dyn Fn(&U) + Send + Sync>) -> Subscription + Send + Sync>;

/// A read-only view computed from an [`Observable`].
///
/// Holds no state of its own; every read recomputes from the source.
pub struct Derived<U> {
    read: Arc<dyn Fn() -> U + Send + Sync>,
    watch: WatchFn<U>,
}

impl<U> Clone for Derived<U> {
    fn clone(&self) -> Self {
        Self {
            read: Arc::clone(&self.read),
            watch: Arc::clone(&self.watch),
        }
    }
}

impl<U: fmt::Debug> fmt::Debug for Derived<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived").field("value", &(self.read)()).finish()
    }
}

impl<U> Derived<U> {
    /// Current projected value.
    pub fn get(&self) -> U {
        (self.read)()
    }

    /// Registers `callback` for changes of the projected value.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&U) + Send + Sync + 'static,
    {
        (self.watch)(Arc::new(callback))
    }
}

/// Handle that keeps a callback registered.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Detaches the callback now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keeps the callback registered for the lifetime of the source.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &T| sink.lock().unwrap().push(value.clone()))
    }

    #[test]
    fn test_get_and_set() {
        let cell = Observable::new(1);
        assert_eq!(cell.get(), 1);
        assert!(cell.set(2));
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn test_subscribers_run_in_registration_order() {
        let cell = Observable::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<_> = (0..3)
            .map(|index| {
                let order = Arc::clone(&order);
                cell.subscribe(move |value: &i32| order.lock().unwrap().push((index, *value)))
            })
            .collect();

        cell.set(5);
        assert_eq!(*order.lock().unwrap(), vec![(0, 5), (1, 5), (2, 5)]);
        drop(subs);
    }

    #[test]
    fn test_unchanged_value_does_not_notify() {
        let cell = Observable::new("a".to_string());
        let (seen, callback) = recorder::<String>();
        let _sub = cell.subscribe(callback);

        assert!(!cell.set("a".to_string()));
        assert!(cell.set("b".to_string()));
        assert_eq!(*seen.lock().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_subscribe_does_not_replay_current_value() {
        let cell = Observable::new(9);
        let (seen, callback) = recorder::<i32>();
        let _sub = cell.subscribe(callback);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let cell = Observable::new(0);
        let (seen, callback) = recorder::<i32>();
        let sub = cell.subscribe(callback);
        assert_eq!(cell.subscriber_count(), 1);

        cell.set(1);
        drop(sub);
        cell.set(2);

        assert_eq!(cell.subscriber_count(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_detached_subscription_stays_registered() {
        let cell = Observable::new(0);
        let (seen, callback) = recorder::<i32>();
        cell.subscribe(callback).detach();

        cell.set(3);
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_callback_can_read_the_cell() {
        let cell = Observable::new(0);
        let reader = cell.clone();
        let (seen, callback) = recorder::<i32>();
        let _sub = cell.subscribe(move |_: &i32| callback(&reader.get()));

        cell.set(4);
        assert_eq!(*seen.lock().unwrap(), vec![4]);
    }

    #[test]
    fn test_derived_recomputes_from_source() {
        let cell = Observable::new(Some("token".to_string()));
        let present = cell.map(Option::is_some);
        assert!(present.get());

        cell.set(None);
        assert!(!present.get());
    }

    #[test]
    fn test_derived_notifies_only_on_change() {
        let cell = Observable::new(1);
        let is_even = cell.map(|value: &i32| value % 2 == 0);
        let (seen, callback) = recorder::<bool>();
        let _sub = is_even.subscribe(callback);

        cell.set(3);
        cell.set(4);
        cell.set(6);
        cell.set(7);

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_concurrent_sets_notify_in_applied_order() {
        let cell = Observable::new(0_u32);
        let parity = cell.map(|value: &u32| value % 2 == 0);
        let (seen, callback) = recorder::<u32>();
        let _sub = cell.subscribe(callback);
        let (parity_seen, parity_callback) = recorder::<bool>();
        let _parity_sub = parity.subscribe(parity_callback);

        let writers: Vec<_> = (1..=4_u32)
            .map(|thread| {
                let cell = cell.clone();
                std::thread::spawn(move || {
                    for step in 0..250 {
                        cell.set(thread * 1000 + step);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(seen.lock().unwrap().last().copied(), Some(cell.get()));
        assert_eq!(parity_seen.lock().unwrap().last().copied(), Some(parity.get()));
    }

    #[test]
    fn test_subscription_outliving_source_is_harmless() {
        let cell = Observable::new(0);
        let sub = cell.subscribe(|_| {});
        drop(cell);
        sub.unsubscribe();
    }
}
