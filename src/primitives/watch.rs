// ============================================================================
// spark-async - Watch
//
// Run a callback when a selected value changes
// ============================================================================
//
// A watcher is an effect that re-evaluates a selector and hands the new and
// previous values to a callback. The selector is tracked; the callback is not.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::constants::WATCHER;
use crate::primitives::effect::{create_effect, Effect};
use crate::reactivity::batching::untrack;

// =============================================================================
// OPTIONS
// =============================================================================

/// Options controlling when a watcher fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchOptions {
    /// Fire only when the selected value differs structurally from the
    /// previous one. When false, every re-evaluation fires.
    pub deep: bool,

    /// Fire once at creation with no previous value.
    pub immediate: bool,
}

impl WatchOptions {
    pub fn deep() -> Self {
        Self {
            deep: true,
            immediate: false,
        }
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }
}

// =============================================================================
// WATCHER
// =============================================================================

/// Handle to a running watcher.
///
/// Dropping the last handle stops the watcher unless a scope owns it.
pub struct Watcher {
    effect: Effect,
}

impl Watcher {
    /// Stop the watcher. The callback never fires again.
    pub fn stop(&self) {
        self.effect.dispose();
    }

    pub fn is_active(&self) -> bool {
        !self.effect.is_destroyed()
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Watch a derived value.
///
/// `callback` receives the new value and the previous one.
///
/// # Example
///
/// ```
/// use spark_async::{signal, watch, WatchOptions};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let count = signal(1);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let _watcher = watch(
///     { let count = count.clone(); move || count.get() * 10 },
///     { let seen = seen.clone(); move |new: &i32, old: Option<&i32>| {
///         seen.borrow_mut().push((*new, old.copied()));
///     }},
///     WatchOptions::deep(),
/// );
///
/// count.set(2);
/// assert_eq!(*seen.borrow(), vec![(20, Some(10))]);
/// ```
pub fn watch<R, S, F>(selector: S, mut callback: F, options: WatchOptions) -> Watcher
where
    R: PartialEq + 'static,
    S: Fn() -> R + 'static,
    F: FnMut(&R, Option<&R>) + 'static,
{
    let previous: Rc<RefCell<Option<R>>> = Rc::new(RefCell::new(None));
    let WatchOptions { deep, immediate } = options;

    let effect = create_effect(
        WATCHER,
        Box::new(move || {
            let next = selector();
            let prev = previous.borrow_mut().take();

            let fire = match &prev {
                None => immediate,
                Some(prev) => !deep || *prev != next,
            };
            if fire {
                untrack(|| callback(&next, prev.as_ref()));
            }

            *previous.borrow_mut() = Some(next);
            None
        }),
    );

    Watcher { effect }
}
