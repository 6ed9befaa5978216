// ============================================================================
// spark-async - Host Capabilities
// What async fields need from the component framework around them
// ============================================================================
//
// Fields never reach into the signal host directly. They read the owner
// through `Component`, subscribe through `Observe`, and defer binding to a
// `Lifecycle` created hook. `SignalObserver` and `Hooks` implement the last
// two on top of this crate's signals and scopes.
// ============================================================================

use std::cell::RefCell;
use std::fmt;

use serde_json::Value;

use crate::error::ConfigError;
use crate::primitives::scope::EffectScope;
use crate::primitives::watch::{watch, WatchOptions};

// =============================================================================
// COMPONENT
// =============================================================================

/// An owner whose named fields async fields can watch.
///
/// `field` reads through the owner's signals, so calling it inside a selector
/// tracks the read. Returns `None` for names the owner does not expose.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use spark_async::{signal, Component, Signal};
///
/// struct Search {
///     query: Signal<String>,
/// }
///
/// impl Component for Search {
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "query" => Some(json!(self.query.get())),
///             _ => None,
///         }
///     }
/// }
///
/// let search = Search { query: signal("rust".to_string()) };
/// assert_eq!(search.field("query"), Some(json!("rust")));
/// ```
pub trait Component: 'static {
    fn field(&self, name: &str) -> Option<Value>;
}

// =============================================================================
// OBSERVE
// =============================================================================

/// A registered observation. Dropping it stops the observation.
#[must_use = "dropping a Subscription stops it"]
pub struct Subscription {
    stop: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(stop: impl FnOnce() + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// Stop observing now.
    pub fn stop(mut self) {
        self.stop_now();
    }

    fn stop_now(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.stop.is_some())
            .finish()
    }
}

/// The host's observation primitive.
///
/// `selector` is re-evaluated reactively; `callback` runs when it produces a
/// new value (per `options.deep`), never at registration unless
/// `options.immediate`.
pub trait Observe {
    fn observe(
        &self,
        selector: Box<dyn Fn() -> Value>,
        callback: Box<dyn FnMut()>,
        options: WatchOptions,
    ) -> Subscription;
}

/// [`Observe`] backed by [`watch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalObserver;

impl Observe for SignalObserver {
    fn observe(
        &self,
        selector: Box<dyn Fn() -> Value>,
        mut callback: Box<dyn FnMut()>,
        options: WatchOptions,
    ) -> Subscription {
        let watcher = watch(selector, move |_, _| callback(), options);
        Subscription::new(move || watcher.stop())
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Hook run when the owner component is created.
pub type CreatedHook = Box<dyn FnOnce() -> Result<(), ConfigError>>;

/// The host's lifecycle registration.
pub trait Lifecycle {
    fn on_created(&self, hook: CreatedHook);
}

/// A component's created hooks, optionally bound to the scope that owns the
/// component's effects.
///
/// When a scope is attached, hooks run inside it, so every watcher they
/// register is stopped by [`Hooks::teardown`].
#[derive(Default)]
pub struct Hooks {
    created: RefCell<Vec<CreatedHook>>,
    scope: Option<EffectScope>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(scope: EffectScope) -> Self {
        Self {
            created: RefCell::new(Vec::new()),
            scope: Some(scope),
        }
    }

    pub fn scope(&self) -> Option<&EffectScope> {
        self.scope.as_ref()
    }

    /// Run every registered hook once, in registration order.
    ///
    /// Stops at the first failing hook; hooks after it are discarded.
    pub fn created(&self) -> Result<(), ConfigError> {
        let hooks: Vec<_> = self.created.borrow_mut().drain(..).collect();
        let run_all = move || hooks.into_iter().try_for_each(|hook| hook());

        match &self.scope {
            Some(scope) => scope.run(run_all).unwrap_or_else(|| {
                tracing::warn!("created hooks skipped: scope already stopped");
                Ok(())
            }),
            None => run_all(),
        }
    }

    /// Stop the attached scope, severing every subscription made in it.
    pub fn teardown(&self) {
        if let Some(scope) = &self.scope {
            scope.stop();
        }
    }

    pub fn pending(&self) -> usize {
        self.created.borrow().len()
    }
}

impl Lifecycle for Hooks {
    fn on_created(&self, hook: CreatedHook) {
        self.created.borrow_mut().push(hook);
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pending", &self.pending())
            .field("scope", &self.scope)
            .finish()
    }
}
