// ============================================================================
// spark-async - Async Field State
// value / promise / loading / error and the single invoke transition
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::primitives::signal::{mutable_source, signal, signal_with_equals, Signal};
use crate::reactivity::batching::batch;

/// A caught producer failure, as exposed by `error()`.
pub type FieldError = Rc<anyhow::Error>;

/// The outcome of one invocation.
///
/// Cloneable and never fails: it resolves to the value that was applied,
/// which is the producer's result or the field's default.
pub type Promise<V> = Shared<LocalBoxFuture<'static, V>>;

/// Side effect run with every contained producer failure.
pub type ErrorHandler = Rc<dyn Fn(&anyhow::Error)>;

fn same_error(a: &Option<FieldError>, b: &Option<FieldError>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

// =============================================================================
// FIELD STATE
// =============================================================================

/// Reactive state shared by computed and data fields.
pub struct FieldState<V> {
    value: Signal<V>,
    loading: Signal<bool>,
    error: Signal<Option<FieldError>>,
    promise: RefCell<Option<Promise<V>>>,
    default: V,
    handler: Option<ErrorHandler>,
    label: Rc<str>,
}

impl<V: Clone + 'static> FieldState<V> {
    pub fn new(default: V, handler: Option<ErrorHandler>, label: impl Into<Rc<str>>) -> Self {
        Self {
            value: mutable_source(default.clone()),
            loading: signal(false),
            error: signal_with_equals(None, same_error),
            promise: RefCell::new(None),
            default,
            handler,
            label: label.into(),
        }
    }

    pub fn value(&self) -> V {
        self.value.get()
    }

    pub fn with_value<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        self.value.with(f)
    }

    pub fn loading(&self) -> bool {
        self.loading.get()
    }

    pub fn error(&self) -> Option<FieldError> {
        self.error.get()
    }

    pub fn promise(&self) -> Option<Promise<V>> {
        self.promise.borrow().clone()
    }

    pub fn default_value(&self) -> &V {
        &self.default
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Track `pending` to completion and apply its outcome.
    ///
    /// Marks the field loading, stores the returned promise, and spawns it on
    /// the current `LocalSet` so it settles whether or not anyone awaits it.
    /// On success the error is cleared and the value replaced; on failure the
    /// handler runs, the error is recorded and the value reset to the default.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio::task::LocalSet`.
    pub fn run(&self, pending: LocalBoxFuture<'static, anyhow::Result<V>>) -> Promise<V> {
        self.loading.set(true);

        let value = self.value.clone();
        let loading = self.loading.clone();
        let error = self.error.clone();
        let default = self.default.clone();
        let handler = self.handler.clone();
        let label = self.label.clone();

        let settled = async move {
            let outcome = pending.await;
            batch(|| {
                let applied = match outcome {
                    Ok(result) => {
                        tracing::trace!(field = %label, "producer resolved");
                        error.set(None);
                        value.set(result.clone());
                        result
                    }
                    Err(e) => {
                        tracing::debug!(field = %label, error = %e, "producer failed");
                        if let Some(handler) = &handler {
                            handler(&e);
                        }
                        error.set(Some(Rc::new(e)));
                        value.set(default.clone());
                        default
                    }
                };
                loading.set(false);
                applied
            })
        }
        .boxed_local()
        .shared();

        *self.promise.borrow_mut() = Some(settled.clone());
        drop(tokio::task::spawn_local(settled.clone()));
        settled
    }
}

impl<V> std::fmt::Debug for FieldState<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldState")
            .field("label", &self.label)
            .field("loading", &self.loading.inner().with(|l| *l))
            .field("has_promise", &self.promise.borrow().is_some())
            .finish()
    }
}
