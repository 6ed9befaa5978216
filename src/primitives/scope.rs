// ============================================================================
// spark-async - Effect Scope
//
// Groups effects and cleanups so a component can be torn down in one call
// ============================================================================
//
// A component runs its setup inside `scope.run(..)`. Every effect created
// there (including the watchers an async field binds) and every
// `on_scope_dispose` callback belongs to the scope; `stop()` disposes them
// together.
//
// - run(fn) - Execute a function with this scope active
// - stop() - Dispose all effects, run cleanups, stop child scopes
// - Nested scopes are stopped with their parent unless detached
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::primitives::effect::{destroy_effect, EffectInner};

// =============================================================================
// THREAD-LOCAL SCOPE STATE
// =============================================================================

thread_local! {
    static ACTIVE_SCOPE: RefCell<Option<Rc<EffectScopeInner>>> = const { RefCell::new(None) };
}

fn get_active_scope() -> Option<Rc<EffectScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.borrow().clone())
}

/// Set the active scope, returning the previous one
fn set_active_scope(scope: Option<Rc<EffectScopeInner>>) -> Option<Rc<EffectScopeInner>> {
    ACTIVE_SCOPE.with(|s| s.replace(scope))
}

/// Cleanup function type for scope disposal
pub type ScopeCleanupFn = Box<dyn FnOnce()>;

// =============================================================================
// EFFECT SCOPE INNER
// =============================================================================

pub struct EffectScopeInner {
    active: Cell<bool>,
    effects: RefCell<Vec<Rc<EffectInner>>>,
    cleanups: RefCell<Vec<ScopeCleanupFn>>,
    parent: RefCell<Option<Weak<EffectScopeInner>>>,
    scopes: RefCell<Vec<Rc<EffectScopeInner>>>,
    self_weak: RefCell<Weak<EffectScopeInner>>,
}

impl EffectScopeInner {
    fn new(detached: bool) -> Rc<Self> {
        let parent = if detached { None } else { get_active_scope() };

        let scope = Rc::new(Self {
            active: Cell::new(true),
            effects: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            parent: RefCell::new(parent.as_ref().map(Rc::downgrade)),
            scopes: RefCell::new(Vec::new()),
            self_weak: RefCell::new(Weak::new()),
        });

        *scope.self_weak.borrow_mut() = Rc::downgrade(&scope);

        if let Some(ref parent_scope) = parent {
            parent_scope.scopes.borrow_mut().push(scope.clone());
        }

        scope
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        if !self.active.get() {
            return None;
        }

        let self_rc = self.self_weak.borrow().upgrade()?;

        struct RestoreScope(Option<Rc<EffectScopeInner>>);

        impl Drop for RestoreScope {
            fn drop(&mut self) {
                set_active_scope(self.0.take());
            }
        }

        let _restore = RestoreScope(set_active_scope(Some(self_rc)));
        Some(f())
    }

    pub fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }

        let effects: Vec<_> = self.effects.borrow_mut().drain(..).collect();
        for effect in effects {
            destroy_effect(&effect);
        }

        // Reverse registration order
        let cleanups: Vec<_> = self.cleanups.borrow_mut().drain(..).collect();
        for cleanup in cleanups.into_iter().rev() {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(cleanup)).is_err() {
                tracing::warn!("scope cleanup panicked");
            }
        }

        let child_scopes: Vec<_> = self.scopes.borrow_mut().drain(..).collect();
        for child in child_scopes {
            child.stop();
        }

        let parent = self.parent.borrow().as_ref().and_then(|w| w.upgrade());
        if let Some(parent) = parent {
            let me = self as *const Self;
            parent.scopes.borrow_mut().retain(|s| !std::ptr::eq(Rc::as_ptr(s), me));
        }
    }

    pub fn add_effect(&self, effect: Rc<EffectInner>) {
        self.effects.borrow_mut().push(effect);
    }

    pub fn add_cleanup(&self, cleanup: ScopeCleanupFn) {
        self.cleanups.borrow_mut().push(cleanup);
    }
}

impl Drop for EffectScopeInner {
    fn drop(&mut self) {
        if self.active.get() {
            self.stop();
        }
    }
}

// =============================================================================
// EFFECT SCOPE (Public wrapper)
// =============================================================================

/// A group of effects and cleanups that share a lifetime.
///
/// # Example
///
/// ```
/// use spark_async::{effect, effect_scope, on_scope_dispose, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let runs = Rc::new(Cell::new(0));
/// let disposed = Rc::new(Cell::new(false));
///
/// let scope = effect_scope(false);
/// scope.run(|| {
///     let _watch = effect({
///         let (count, runs) = (count.clone(), runs.clone());
///         move || {
///             let _ = count.get();
///             runs.set(runs.get() + 1);
///         }
///     });
///     let disposed = disposed.clone();
///     on_scope_dispose(move || disposed.set(true));
/// });
///
/// count.set(1);
/// assert_eq!(runs.get(), 2);
///
/// scope.stop();
/// count.set(2);
/// assert_eq!(runs.get(), 2);
/// assert!(disposed.get());
/// ```
#[derive(Clone)]
pub struct EffectScope {
    inner: Rc<EffectScopeInner>,
}

impl EffectScope {
    fn from_inner(inner: Rc<EffectScopeInner>) -> Self {
        Self { inner }
    }

    /// Whether the scope is still active (not stopped)
    pub fn active(&self) -> bool {
        self.inner.is_active()
    }

    /// Run a function within this scope.
    ///
    /// Returns None if the scope has been stopped.
    pub fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        self.inner.run(f)
    }

    /// Stop the scope.
    ///
    /// - All effects are destroyed
    /// - Cleanup callbacks run in reverse order
    /// - Child scopes are stopped
    pub fn stop(&self) {
        self.inner.stop();
    }
}

impl Drop for EffectScope {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.inner.stop();
        }
    }
}

impl std::fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScope")
            .field("active", &self.active())
            .field("effects", &self.inner.effects.borrow().len())
            .finish()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create an effect scope.
///
/// A scope created inside another scope's `run()` is stopped with it unless
/// `detached` is true.
pub fn effect_scope(detached: bool) -> EffectScope {
    EffectScope::from_inner(EffectScopeInner::new(detached))
}

/// The scope whose `run()` is currently executing, if any.
pub fn get_current_scope() -> Option<EffectScope> {
    get_active_scope().map(EffectScope::from_inner)
}

/// Register a cleanup on the current scope.
///
/// Returns false (and does nothing) outside of a scope.
pub fn on_scope_dispose<F: FnOnce() + 'static>(f: F) -> bool {
    match get_active_scope() {
        Some(scope) => {
            scope.add_cleanup(Box::new(f));
            true
        }
        None => {
            tracing::trace!("on_scope_dispose called outside of a scope");
            false
        }
    }
}

/// Register an effect with the current scope. Called when an effect is created.
pub(crate) fn register_effect_with_scope(effect: &Rc<EffectInner>) {
    if let Some(scope) = get_active_scope() {
        scope.add_effect(effect.clone());
    }
}
