// ============================================================================
// spark-async - Effect System
// Synchronous side effects that re-run when dependencies change
// ============================================================================
//
// Effects are the only reaction kind in the signal host. Every watcher an
// async field registers is an effect underneath.
//
// - Automatic dependency tracking
// - Cleanup/teardown before each re-run and on disposal
// - RAII disposal through the `Effect` handle
// - Writes made while an effect runs are deferred until it returns
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};
use crate::primitives::scope::register_effect_with_scope;
use crate::reactivity::tracking::{flush_pending_reactions, remove_reactions, set_signal_status};

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// Cleanup function returned by effects, runs before next execution
pub type CleanupFn = Box<dyn FnOnce()>;

/// Effect function signature - returns optional cleanup
pub type EffectFn = Box<dyn FnMut() -> Option<CleanupFn>>;

// =============================================================================
// EFFECT INNER
// =============================================================================

/// The inner effect implementation.
///
/// Implements AnyReaction (but NOT AnySource - effects have no dependents).
pub struct EffectInner {
    flags: Cell<u32>,

    /// The effect function. Taken out while it runs.
    func: RefCell<Option<EffectFn>>,

    /// Sources this effect read during its last run
    deps: RefCell<Vec<Rc<dyn AnySource>>>,

    /// Teardown from the last run
    teardown: RefCell<Option<CleanupFn>>,

    /// Weak self-reference for trait object conversion
    self_weak: RefCell<Weak<EffectInner>>,
}

impl EffectInner {
    pub fn new(kind: u32, func: EffectFn) -> Rc<Self> {
        let effect = Rc::new(Self {
            flags: Cell::new(EFFECT | kind | DIRTY),
            func: RefCell::new(Some(func)),
            deps: RefCell::new(Vec::new()),
            teardown: RefCell::new(None),
            self_weak: RefCell::new(Weak::new()),
        });

        *effect.self_weak.borrow_mut() = Rc::downgrade(&effect);

        effect
    }

    pub fn as_weak_reaction(&self) -> Weak<dyn AnyReaction> {
        match self.self_weak.borrow().upgrade() {
            Some(rc) => Rc::downgrade(&(rc as Rc<dyn AnyReaction>)),
            None => Weak::<EffectInner>::new() as Weak<dyn AnyReaction>,
        }
    }

    /// Whether the effect function has completed at least one run
    pub fn has_run(&self) -> bool {
        self.flags.get() & EFFECT_RAN != 0
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        if let Some(cleanup) = self.teardown.get_mut().take() {
            cleanup();
        }
    }
}

// =============================================================================
// AnyReaction IMPLEMENTATION
// =============================================================================

impl AnyReaction for EffectInner {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }

    fn add_dep(&self, source: Rc<dyn AnySource>) {
        self.deps.borrow_mut().push(source);
    }

    fn remove_deps_from(&self, start: usize) {
        self.deps.borrow_mut().truncate(start);
    }

    fn for_each_dep(&self, f: &mut dyn FnMut(&Rc<dyn AnySource>) -> bool) {
        for dep in self.deps.borrow().iter() {
            if !f(dep) {
                break;
            }
        }
    }

    fn update(&self) {
        if self.is_destroyed() {
            return;
        }

        let rc_self = self.self_weak.borrow().upgrade();
        if let Some(rc_self) = rc_self {
            update_effect(&rc_self);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// EFFECT HANDLE
// =============================================================================

/// Handle to a running effect.
///
/// Dropping the last handle disposes the effect, unless an `EffectScope`
/// still owns it (the scope disposes it on `stop()`).
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    pub fn inner(&self) -> &Rc<EffectInner> {
        &self.inner
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// Destroy the effect: unlink it from its dependencies and run teardown.
    pub fn dispose(&self) {
        destroy_effect(&self.inner);
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.dispose();
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("deps", &self.inner.dep_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

// =============================================================================
// TEARDOWN / DESTROY
// =============================================================================

pub(crate) fn execute_teardown(effect: &EffectInner) {
    let teardown = effect.teardown.borrow_mut().take();
    if let Some(cleanup) = teardown {
        cleanup();
    }
}

/// Destroy an effect. Safe to call more than once, and from inside the
/// effect's own run.
pub(crate) fn destroy_effect(effect: &Rc<EffectInner>) {
    if effect.is_destroyed() {
        return;
    }

    remove_reactions(effect.clone() as Rc<dyn AnyReaction>, 0);

    effect.set_flags(effect.flags() | DESTROYED);

    execute_teardown(effect);

    // Release captured state
    let func = effect.func.borrow_mut().take();
    drop(func);
    effect.deps.borrow_mut().clear();
}

// =============================================================================
// UPDATE EFFECT
// =============================================================================

/// Run an effect and re-collect its dependencies.
///
/// 1. Marks the effect clean and runs the previous teardown
/// 2. Executes the function with this effect as the active reaction
/// 3. Replaces the old dependency set with the one just read
/// 4. Flushes writes the function made, once it has returned
pub(crate) fn update_effect(effect: &Rc<EffectInner>) {
    if effect.is_destroyed() {
        return;
    }

    // Already running further up the stack
    let Some(mut func) = effect.func.borrow_mut().take() else {
        return;
    };

    set_signal_status(&**effect, CLEAN);
    execute_teardown(effect);

    let (prev_reaction, prev_deps, was_flushing) = with_context(|ctx| {
        let prev_r = ctx.set_active_reaction(Some(effect.as_weak_reaction()));
        ctx.increment_read_version();
        let prev_d = ctx.swap_new_deps(Vec::new());
        let was_flushing = ctx.set_flushing(true);
        (prev_r, prev_d, was_flushing)
    });
    effect.set_flags(effect.flags() | REACTION_IS_UPDATING);

    let teardown = func();

    effect.set_flags((effect.flags() & !REACTION_IS_UPDATING) | EFFECT_RAN);
    let new_deps = with_context(|ctx| {
        let deps = ctx.swap_new_deps(prev_deps);
        ctx.set_active_reaction(prev_reaction);
        ctx.set_flushing(was_flushing);
        deps
    });

    if effect.is_destroyed() {
        // Disposed from inside its own run
        drop(func);
        if let Some(cleanup) = teardown {
            cleanup();
        }
    } else {
        remove_reactions(effect.clone() as Rc<dyn AnyReaction>, 0);
        let weak = effect.as_weak_reaction();
        for dep in new_deps {
            dep.add_reaction(weak.clone());
            effect.add_dep(dep);
        }

        *effect.func.borrow_mut() = Some(func);
        *effect.teardown.borrow_mut() = teardown;
    }

    let should_flush = with_context(|ctx| !ctx.is_batching() && !ctx.is_flushing());
    if should_flush {
        flush_pending_reactions();
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create an effect that runs now and again whenever a signal it read changes.
///
/// # Example
///
/// ```
/// use spark_async::{effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let seen = Rc::new(Cell::new(-1));
///
/// let handle = effect({
///     let (count, seen) = (count.clone(), seen.clone());
///     move || seen.set(count.get())
/// });
/// count.set(2);
/// assert_eq!(seen.get(), 2);
///
/// handle.dispose();
/// count.set(3);
/// assert_eq!(seen.get(), 2);
/// ```
pub fn effect<F>(mut f: F) -> Effect
where
    F: FnMut() + 'static,
{
    effect_with_cleanup(move || {
        f();
        None
    })
}

/// Create an effect that may return a cleanup function.
///
/// The cleanup runs before each re-execution and when the effect is disposed.
pub fn effect_with_cleanup<F>(f: F) -> Effect
where
    F: FnMut() -> Option<CleanupFn> + 'static,
{
    create_effect(0, Box::new(f))
}

pub(crate) fn create_effect(kind: u32, func: EffectFn) -> Effect {
    let inner = EffectInner::new(kind, func);
    register_effect_with_scope(&inner);
    update_effect(&inner);
    Effect { inner }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::signal;

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[test]
    fn runs_immediately_and_on_change() {
        let s = signal(1);
        let runs = counter();
        let _e = effect({
            let (s, runs) = (s.clone(), runs.clone());
            move || {
                let _ = s.get();
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!(runs.get(), 1);

        s.set(2);
        assert_eq!(runs.get(), 2);

        s.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn dependencies_are_recollected_each_run() {
        let flag = signal(true);
        let a = signal(1);
        let b = signal(10);
        let runs = counter();
        let _e = effect({
            let (flag, a, b, runs) = (flag.clone(), a.clone(), b.clone(), runs.clone());
            move || {
                let _ = if flag.get() { a.get() } else { b.get() };
                runs.set(runs.get() + 1);
            }
        });

        flag.set(false);
        assert_eq!(runs.get(), 2);

        a.set(2);
        assert_eq!(runs.get(), 2);

        b.set(20);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_dispose() {
        let s = signal(0);
        let cleanups = counter();
        let e = effect_with_cleanup({
            let (s, cleanups) = (s.clone(), cleanups.clone());
            move || {
                let _ = s.get();
                let cleanups = cleanups.clone();
                Some(Box::new(move || cleanups.set(cleanups.get() + 1)) as CleanupFn)
            }
        });

        s.set(1);
        assert_eq!(cleanups.get(), 1);

        e.dispose();
        assert_eq!(cleanups.get(), 2);
        assert!(e.is_destroyed());
    }

    #[test]
    fn dropping_handle_disposes() {
        let s = signal(0);
        let runs = counter();
        let e = effect({
            let (s, runs) = (s.clone(), runs.clone());
            move || {
                let _ = s.get();
                runs.set(runs.get() + 1);
            }
        });
        drop(e);

        s.set(1);
        assert_eq!(runs.get(), 1);
        assert_eq!(s.inner().reaction_count(), 0);
    }

    #[test]
    fn writes_inside_an_effect_are_deferred() {
        let source = signal(1);
        let mirror = signal(0);
        let observed = Rc::new(RefCell::new(Vec::new()));

        let _writer = effect({
            let (source, mirror) = (source.clone(), mirror.clone());
            move || {
                mirror.set(source.get() * 2);
            }
        });
        let _reader = effect({
            let (mirror, observed) = (mirror.clone(), observed.clone());
            move || observed.borrow_mut().push(mirror.get())
        });

        source.set(5);
        assert_eq!(*observed.borrow(), vec![2, 10]);
    }

    #[test]
    fn dispose_inside_own_run_is_safe() {
        let s = signal(0);
        let slot: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));
        let e = effect({
            let (s, slot) = (s.clone(), slot.clone());
            move || {
                if s.get() > 0 {
                    if let Some(e) = slot.borrow().as_ref() {
                        e.dispose();
                    }
                }
            }
        });
        *slot.borrow_mut() = Some(e.clone());

        s.set(1);
        assert!(e.is_destroyed());
        s.set(2);
        slot.borrow_mut().take();
    }

    #[test]
    #[should_panic(expected = "Maximum update depth exceeded")]
    fn self_triggering_effect_panics() {
        let s = signal(0);
        let _e = effect({
            let s = s.clone();
            move || {
                let v = s.get();
                s.set(v + 1);
            }
        });
        s.set(100);
    }
}
