// ============================================================================
// spark-async - Debounced Invoker
// Trailing-edge debounce on the current tokio LocalSet
// ============================================================================
//
// Each trigger aborts the pending timer task and spawns a new one, so the
// action runs once, `wait` after the last trigger. Timers are local tasks:
// the action may touch `Rc`/`RefCell` state freely.
// ============================================================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;

// =============================================================================
// DEBOUNCER
// =============================================================================

struct DebouncerInner {
    wait: Duration,
    action: Box<dyn Fn()>,
    pending: RefCell<Option<JoinHandle<()>>>,
}

impl DebouncerInner {
    fn take_pending(&self) -> Option<JoinHandle<()>> {
        self.pending.borrow_mut().take()
    }

    /// Timer elapsed: clear the pending slot, then run the action.
    fn fire(&self) {
        drop(self.take_pending());
        (self.action)();
    }
}

impl Drop for DebouncerInner {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}

/// Trailing debounce over a zero-argument action.
///
/// # Panics
///
/// [`trigger`](Self::trigger) spawns onto the current `tokio::task::LocalSet`
/// and panics when called outside of one.
///
/// # Example
///
/// ```
/// use spark_async::Debouncer;
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// # tokio::task::LocalSet::new().run_until(async {
/// let runs = Rc::new(Cell::new(0));
/// let debouncer = Debouncer::new(Duration::from_millis(25), {
///     let runs = runs.clone();
///     move || runs.set(runs.get() + 1)
/// });
///
/// debouncer.trigger();
/// debouncer.trigger();
/// tokio::time::sleep(Duration::from_millis(30)).await;
/// assert_eq!(runs.get(), 1);
/// # }).await;
/// # }
/// ```
pub struct Debouncer {
    inner: Rc<DebouncerInner>,
}

impl Debouncer {
    pub fn new(wait: Duration, action: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(DebouncerInner {
                wait,
                action: Box::new(action),
                pending: RefCell::new(None),
            }),
        }
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }

    /// Restart the quiet period.
    pub fn trigger(&self) {
        let weak: Weak<DebouncerInner> = Rc::downgrade(&self.inner);
        let wait = self.inner.wait;

        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(wait).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire();
            }
        });

        let superseded = self.inner.pending.replace(Some(handle));
        if let Some(old) = superseded {
            old.abort();
        }
        tracing::trace!(wait_ms = wait.as_millis() as u64, "debounce triggered");
    }

    /// Discard the pending execution. Idempotent.
    pub fn cancel(&self) {
        if let Some(handle) = self.inner.take_pending() {
            handle.abort();
            tracing::trace!("debounce cancelled");
        }
    }

    /// Run the pending execution now. No-op when nothing is pending.
    pub fn flush(&self) {
        if let Some(handle) = self.inner.take_pending() {
            handle.abort();
            tracing::trace!("debounce flushed");
            (self.inner.action)();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("wait", &self.inner.wait)
            .field("pending", &self.is_pending())
            .finish()
    }
}

// =============================================================================
// DEBOUNCED FUNCTION
// =============================================================================

/// A debounced one-argument function.
///
/// Only the argument of the last call within the quiet period is forwarded.
/// Created by [`AsyncFactory::debounce_function`](crate::AsyncFactory::debounce_function).
pub struct DebouncedFn<A> {
    arg: Rc<RefCell<Option<A>>>,
    debouncer: Debouncer,
}

impl<A: 'static> DebouncedFn<A> {
    pub fn new(wait: Duration, f: impl Fn(A) + 'static) -> Self {
        let arg: Rc<RefCell<Option<A>>> = Rc::new(RefCell::new(None));
        let debouncer = Debouncer::new(wait, {
            let arg = arg.clone();
            move || {
                let last = arg.borrow_mut().take();
                if let Some(last) = last {
                    f(last);
                }
            }
        });
        Self { arg, debouncer }
    }

    pub fn call(&self, arg: A) {
        *self.arg.borrow_mut() = Some(arg);
        self.debouncer.trigger();
    }

    pub fn cancel(&self) {
        self.debouncer.cancel();
        self.arg.borrow_mut().take();
    }

    pub fn flush(&self) {
        self.debouncer.flush();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}
