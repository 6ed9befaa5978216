// ============================================================================
// spark-async - Signal Primitive
// The writable reactive value components are built from
// ============================================================================

use std::rc::Rc;

use crate::core::context::with_context;
use crate::core::types::{never_equals, AnySource, EqualsFn, SourceInner};
use crate::reactivity::tracking::{notify_write, track_read};

// =============================================================================
// SIGNAL<T>
// =============================================================================

/// A reactive value of type `T`.
///
/// Reading inside an effect (or a `watch` selector) registers a dependency;
/// writing a different value re-runs every dependent reaction synchronously.
///
/// # Example
///
/// ```
/// use spark_async::signal;
///
/// let count = signal(0);
/// assert_eq!(count.get(), 0);
///
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<SourceInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self {
            inner: Rc::new(SourceInner::new(value)),
        }
    }

    /// Create a signal with a custom equality function.
    pub fn new_with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(SourceInner::new_with_equals(value, equals)),
        }
    }

    /// Get the current value (cloning), tracking the read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        track_read(self.as_any_source());
        self.inner.get()
    }

    /// Get the current value without registering a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.get()
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(self.as_any_source());
        self.inner.with(f)
    }

    /// Set the value. Returns true if it changed (per the equality function).
    pub fn set(&self, value: T) -> bool {
        let changed = self.inner.set(value);
        if changed {
            self.bump_and_notify();
        }
        changed
    }

    /// Update the value in place.
    ///
    /// ```
    /// use spark_async::signal;
    ///
    /// let items = signal(vec![1, 2]);
    /// items.update(|v| v.push(3));
    /// assert_eq!(items.get(), vec![1, 2, 3]);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        if self.inner.update(f) {
            self.bump_and_notify();
        }
    }

    pub fn inner(&self) -> &Rc<SourceInner<T>> {
        &self.inner
    }

    pub fn as_any_source(&self) -> Rc<dyn AnySource> {
        self.inner.clone()
    }

    fn bump_and_notify(&self) {
        with_context(|ctx| {
            let wv = ctx.increment_write_version();
            self.inner.set_write_version(wv);
        });
        notify_write(self.as_any_source());
    }
}

impl<T: std::fmt::Debug + Clone + 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.peek())
            .finish()
    }
}

// =============================================================================
// CREATION FUNCTIONS
// =============================================================================

/// Create a new reactive signal.
pub fn signal<T>(value: T) -> Signal<T>
where
    T: PartialEq + 'static,
{
    Signal::new(value)
}

/// Create a signal with a custom equality function.
///
/// ```
/// use spark_async::signal_with_equals;
///
/// let always_notify = signal_with_equals(0, |_, _| false);
/// assert!(always_notify.set(0));
/// ```
pub fn signal_with_equals<T: 'static>(value: T, equals: EqualsFn<T>) -> Signal<T> {
    Signal::new_with_equals(value, equals)
}

/// Create a signal that treats every write as a change.
///
/// Used for values without a meaningful `PartialEq` (async field results).
pub fn mutable_source<T: 'static>(value: T) -> Signal<T> {
    Signal::new_with_equals(value, never_equals)
}
