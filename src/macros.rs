// ============================================================================
// spark-async - Ergonomic Macros
// ============================================================================

/// Clone variables into a move closure.
///
/// Saves the `let x = x.clone();` block before every closure that captures
/// signals or counters.
///
/// # Usage
///
/// ```rust
/// use spark_async::{cloned, effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let a = signal(1);
/// let seen = Rc::new(Cell::new(0));
///
/// let _e = effect(cloned!(a, seen => move || seen.set(a.get())));
/// a.set(4);
/// assert_eq!(seen.get(), 4);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create an effect with automatic variable capturing.
///
/// Wraps `effect(cloned!(... => move || ...))` and returns the handle.
///
/// # Usage
///
/// ```rust
/// use spark_async::{effect, signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = signal(0);
/// let runs = Rc::new(Cell::new(0));
///
/// let _e = effect!(count, runs => {
///     let _ = count.get();
///     runs.set(runs.get() + 1);
/// });
/// count.set(1);
/// assert_eq!(runs.get(), 2);
/// ```
#[macro_export]
macro_rules! effect {
    ($($deps:ident),+ => $body:expr) => {
        $crate::effect($crate::cloned!($($deps),+ => move || { $body; }))
    };
    ($body:expr) => {
        $crate::effect(move || { $body; })
    };
}
