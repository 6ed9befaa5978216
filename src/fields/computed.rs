// ============================================================================
// spark-async - Async Computed
// A field recomputed from watched owner fields by an async producer
// ============================================================================
//
// Construction runs the eager invoke (if any) before a single subscription
// exists. `bind()` (normally from the owner's created hook) registers the
// two trigger paths:
//
//   watch closely  -> invoke()
//   watch          -> queued = true, debouncer.trigger() -> invoke()
//
// Subscriptions and the debounce action hold the core weakly, so dropping
// the field tears everything down.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::TryFutureExt;
use futures::future::FutureExt;

use crate::error::ConfigError;
use crate::fields::binder::WatchBinder;
use crate::fields::debounce::Debouncer;
use crate::fields::host::{Component, Lifecycle, Observe, Subscription};
use crate::fields::options::{ComputedOptions, ComputedProducer};
use crate::fields::state::{ErrorHandler, FieldError, FieldState, Promise};
use crate::fields::variant::Variant;
use crate::primitives::scope::on_scope_dispose;
use crate::primitives::signal::{signal, Signal};
use crate::reactivity::batching::untrack;

// =============================================================================
// CORE
// =============================================================================

struct Queue {
    queued: Signal<bool>,
    debouncer: Debouncer,
}

struct ComputedCore<C, V> {
    owner: Rc<C>,
    state: FieldState<V>,
    producer: ComputedProducer<V>,
    binder: WatchBinder<C>,
    queue: Option<Queue>,
    variant: Variant,
    observer: Rc<dyn Observe>,
    subscriptions: RefCell<Vec<Subscription>>,
    bound: Cell<bool>,
}

impl<C: Component, V: Clone + 'static> ComputedCore<C, V> {
    fn invoke(&self) -> Promise<V> {
        if let Some(queue) = &self.queue {
            queue.debouncer.cancel();
            queue.queued.set(false);
        }

        tracing::debug!(field = %self.state.label(), variant = %self.variant, "invoking producer");
        let inputs = self.binder.inputs(&self.owner);
        let pending = untrack(|| (self.producer)(inputs));
        self.state.run(pending)
    }

    fn schedule(&self) {
        if let Some(queue) = &self.queue {
            queue.queued.set(true);
            queue.debouncer.trigger();
        }
    }

    fn cancel(&self) {
        if let Some(queue) = &self.queue {
            queue.debouncer.cancel();
            queue.queued.set(false);
        }
    }
}

// =============================================================================
// ASYNC COMPUTED
// =============================================================================

/// An asynchronously computed field.
///
/// Created by [`AsyncFactory::computed`](crate::AsyncFactory::computed).
/// `V` is `T` for defaulted fields and `Option<T>` otherwise. All getters
/// are reactive.
pub struct AsyncComputed<C, V> {
    core: Rc<ComputedCore<C, V>>,
}

pub(crate) struct ComputedParts<C, V> {
    pub owner: Rc<C>,
    pub producer: ComputedProducer<V>,
    pub default: V,
    pub binder: WatchBinder<C>,
    pub wait: Option<Duration>,
    pub variant: Variant,
    pub handler: Option<ErrorHandler>,
    pub label: String,
    pub observer: Rc<dyn Observe>,
}

impl<C: Component, V: Clone + 'static> AsyncComputed<C, V> {
    pub(crate) fn from_options<T: 'static>(
        owner: &Rc<C>,
        options: ComputedOptions<C, T, V>,
        default_wait: Duration,
        default_handler: Option<ErrorHandler>,
        observer: Rc<dyn Observe>,
    ) -> Result<Self, ConfigError> {
        if options.debounce.is_some() && options.watch.is_none() {
            return Err(ConfigError::DebounceWithoutWatch);
        }

        let binder = WatchBinder::new(options.watch, options.watch_closely, options.deep);
        binder.validate_names(owner)?;

        let variant = Variant::new(options.eager, options.defaulted, binder.is_debounced());
        let wait = variant
            .debounced
            .then(|| options.debounce.unwrap_or(default_wait));

        let get = options.get;
        let lift = options.lift;
        let producer: ComputedProducer<V> =
            Rc::new(move |inputs| get(inputs).map_ok(lift).boxed_local());

        Ok(Self::new(ComputedParts {
            owner: Rc::clone(owner),
            producer,
            default: options.default,
            binder,
            wait,
            variant,
            handler: options.error.or(default_handler),
            label: options.label.unwrap_or_else(|| "computed".to_owned()),
            observer,
        }))
    }

    pub(crate) fn new(parts: ComputedParts<C, V>) -> Self {
        let ComputedParts {
            owner,
            producer,
            default,
            binder,
            wait,
            variant,
            handler,
            label,
            observer,
        } = parts;

        let core = Rc::new_cyclic(|weak: &Weak<ComputedCore<C, V>>| {
            let queue = wait.map(|wait| {
                let weak = weak.clone();
                Queue {
                    queued: signal(false),
                    debouncer: Debouncer::new(wait, move || {
                        if let Some(core) = weak.upgrade() {
                            drop(core.invoke());
                        }
                    }),
                }
            });

            ComputedCore {
                owner,
                state: FieldState::new(default, handler, label),
                producer,
                binder,
                queue,
                variant,
                observer,
                subscriptions: RefCell::new(Vec::new()),
                bound: Cell::new(false),
            }
        });

        if variant.eager {
            drop(core.invoke());
        }

        Self { core }
    }

    // =========================================================================
    // STATE
    // =========================================================================

    pub fn value(&self) -> V {
        self.core.state.value()
    }

    pub fn with_value<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        self.core.state.with_value(f)
    }

    /// The last started invocation. `None` until the first one.
    pub fn promise(&self) -> Option<Promise<V>> {
        self.core.state.promise()
    }

    pub fn loading(&self) -> bool {
        self.core.state.loading()
    }

    pub fn error(&self) -> Option<FieldError> {
        self.core.state.error()
    }

    /// Whether a debounced invocation is pending. `None` for fields without
    /// a "watch" specification.
    pub fn queued(&self) -> Option<bool> {
        self.core.queue.as_ref().map(|queue| queue.queued.get())
    }

    pub fn variant(&self) -> Variant {
        self.core.variant
    }

    pub fn label(&self) -> &str {
        self.core.state.label()
    }

    pub fn is_bound(&self) -> bool {
        self.core.bound.get()
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Run the producer now with fresh inputs, superseding any queued run.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio::task::LocalSet`.
    pub fn invoke(&self) -> Promise<V> {
        self.core.invoke()
    }

    /// Drop a queued run. No-op for undebounced fields.
    pub fn cancel(&self) {
        self.core.cancel();
    }

    /// Run a queued invocation immediately. No-op when nothing is queued.
    pub fn now(&self) {
        if let Some(queue) = &self.core.queue {
            queue.debouncer.flush();
        }
    }

    // =========================================================================
    // BINDING
    // =========================================================================

    /// Register the trigger paths with the owner.
    ///
    /// Selectors are evaluated once here: each must return an object and
    /// their keys must not overlap. Inside an effect scope, stopping the
    /// scope also cancels a pending debounce.
    pub fn bind(&self) -> Result<(), ConfigError> {
        bind_core(&self.core)
    }

    /// Defer [`bind`](Self::bind) to the owner's created hook.
    pub fn attach(&self, lifecycle: &dyn Lifecycle) {
        let weak = Rc::downgrade(&self.core);
        lifecycle.on_created(Box::new(move || match weak.upgrade() {
            Some(core) => bind_core(&core),
            None => Ok(()),
        }));
    }
}

fn bind_core<C: Component, V: Clone + 'static>(core: &Rc<ComputedCore<C, V>>) -> Result<(), ConfigError> {
    if core.bound.get() {
        return Err(ConfigError::AlreadyBound);
    }
    core.binder.check_selectors(&core.owner)?;

    let on_watch = {
        let weak = Rc::downgrade(core);
        Box::new(move || {
            if let Some(core) = weak.upgrade() {
                core.schedule();
            }
        })
    };
    let on_watch_closely = {
        let weak = Rc::downgrade(core);
        Box::new(move || {
            if let Some(core) = weak.upgrade() {
                drop(core.invoke());
            }
        })
    };

    let subscriptions = core
        .binder
        .register(&core.owner, &*core.observer, on_watch, on_watch_closely);
    core.subscriptions.borrow_mut().extend(subscriptions);
    core.bound.set(true);

    if core.queue.is_some() {
        let weak = Rc::downgrade(core);
        on_scope_dispose(move || {
            if let Some(core) = weak.upgrade() {
                core.cancel();
            }
        });
    }

    tracing::debug!(field = %core.state.label(), variant = %core.variant, "bound");
    Ok(())
}

impl<C, V> std::fmt::Debug for AsyncComputed<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncComputed")
            .field("state", &self.core.state)
            .field("variant", &self.core.variant)
            .field("binder", &self.core.binder)
            .field("bound", &self.core.bound.get())
            .finish()
    }
}
