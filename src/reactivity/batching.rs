// ============================================================================
// spark-async - Batching
// Grouping writes and reading without tracking
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::tracking::flush_pending_reactions;

// =============================================================================
// BATCH
// =============================================================================

/// Batch multiple signal writes into a single reaction cycle.
///
/// # Example
///
/// ```
/// use spark_async::{batch, effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let b = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _effect = effect({
///     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
///     move || {
///         let _ = a.get() + b.get();
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
///
/// batch(|| {
///     a.set(10);
///     b.set(20);
/// });
/// assert_eq!(runs.get(), 2);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    // Exit the batch even if `f` panics
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());
            if depth == 0 && !with_context(|ctx| ctx.is_flushing()) {
                flush_pending_reactions();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

// =============================================================================
// UNTRACK
// =============================================================================

/// Read signals without creating dependencies.
///
/// # Example
///
/// ```
/// use spark_async::{effect, signal, untrack};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let b = signal(2);
/// let runs = Rc::new(Cell::new(0));
///
/// let _effect = effect({
///     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
///     move || {
///         let _ = a.get();
///         let _ = untrack(|| b.get());
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// b.set(20);
/// assert_eq!(runs.get(), 1);
/// a.set(10);
/// assert_eq!(runs.get(), 2);
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let prev = with_context(|ctx| ctx.set_untracking(true));

    struct UntrackGuard {
        prev: bool,
    }

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_untracking(self.prev));
        }
    }

    let _guard = UntrackGuard { prev };
    f()
}
