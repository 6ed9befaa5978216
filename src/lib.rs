// ============================================================================
// spark-async - Async Computed and Data Fields for Reactive Components
// ============================================================================
//
// A component declares a value produced by an async function. The field
// watches other fields of its owner and re-runs the producer, debounced
// ("watch") or at once ("watch closely"), exposing value / promise /
// loading / error / queued as reactive state.
//
// Layout:
//   core/, reactivity/, primitives/  - the signal host fields are built on
//   fields/                          - async fields, factory and host traits
// ============================================================================

//! Async computed and data fields for signal-based components.
//!
//! The public surface is the field layer plus signals, effects, scopes and
//! `watch`. Dependency bookkeeping stays inside the crate:
//!
//! ```compile_fail
//! use spark_async::with_context;
//! ```
//!
//! ```compile_fail
//! use spark_async::notify_write;
//! ```

#[macro_use]
mod macros;

pub mod config;
pub(crate) mod core;
pub mod error;
pub mod fields;
pub mod primitives;
pub(crate) mod reactivity;

// Async fields
pub use config::AsyncConfig;
pub use error::ConfigError;
pub use fields::{
    AsyncComputed, AsyncData, AsyncFactory, Component, ComputedOptions, CreatedHook, DataOptions,
    DebouncedFn, Debouncer, ErrorHandler, FieldError, FieldState, Hooks, Inputs, Lifecycle,
    Observe, Promise, SignalObserver, Subscription, Variant, WatchBinder, WatchSpec,
};

// Signal host
pub use core::context::{is_batching, is_tracking};
pub use core::types::{default_equals, never_equals, AnyReaction, AnySource, EqualsFn, SourceInner};
pub use primitives::effect::{effect, effect_with_cleanup, CleanupFn, Effect, EffectFn, EffectInner};
pub use primitives::scope::{
    effect_scope, get_current_scope, on_scope_dispose, EffectScope, ScopeCleanupFn,
};
pub use primitives::signal::{mutable_source, signal, signal_with_equals, Signal};
pub use primitives::watch::{watch, WatchOptions, Watcher};
pub use reactivity::batching::{batch, untrack};

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants;
    use serde_json::{json, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn flags_are_distinct() {
        let all = [
            constants::SOURCE,
            constants::EFFECT,
            constants::WATCHER,
            constants::CLEAN,
            constants::DIRTY,
            constants::REACTION_IS_UPDATING,
            constants::DESTROYED,
            constants::EFFECT_RAN,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
    }

    #[test]
    fn heterogeneous_sources_share_one_trait() {
        let sources: Vec<Rc<dyn AnySource>> = vec![
            Rc::new(SourceInner::new(42i32)),
            Rc::new(SourceInner::new(String::from("hello"))),
            Rc::new(SourceInner::new(json!({ "a": 1 }))),
        ];
        for source in &sources {
            assert!(source.flags() & constants::SOURCE != 0);
            assert!(source.is_clean());
        }
    }

    #[test]
    fn watchers_see_batched_writes_once() {
        let a = signal(1);
        let b = signal(2);
        let fired = Rc::new(Cell::new(0));
        let _w = watch(
            cloned!(a, b => move || a.get() + b.get()),
            cloned!(fired => move |_: &i32, _: Option<&i32>| fired.set(fired.get() + 1)),
            WatchOptions::deep(),
        );

        batch(|| {
            a.set(10);
            b.set(20);
        });
        assert_eq!(fired.get(), 1);
    }

    struct Pair {
        left: Signal<i64>,
        right: Signal<i64>,
    }

    impl Component for Pair {
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "left" => Some(json!(self.left.get())),
                "right" => Some(json!(self.right.get())),
                _ => None,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn factory_builds_a_working_field() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let factory = AsyncFactory::new(AsyncConfig::with_debounce_ms(10));
                let pair = Rc::new(Pair {
                    left: signal(1),
                    right: signal(2),
                });

                let sum = factory
                    .computed(
                        &pair,
                        ComputedOptions::new(|inputs: Inputs| async move {
                            let get = |k: &str| inputs.get(k).and_then(Value::as_i64).unwrap_or(0);
                            Ok(get("left") + get("right"))
                        })
                        .watch_closely(["left", "right"])
                        .default_value(0),
                    )
                    .unwrap();
                sum.bind().unwrap();

                pair.right.set(5);
                assert_eq!(sum.promise().unwrap().await, 6);
                assert_eq!(sum.value(), 6);
            })
            .await;
    }
}
