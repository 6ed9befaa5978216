// ============================================================================
// spark-async - Primitives Module
// The signal host: signal, effect, scope, watch
// ============================================================================

pub mod effect;
pub mod scope;
pub mod signal;
pub mod watch;

pub use effect::{effect, effect_with_cleanup, CleanupFn, Effect, EffectFn, EffectInner};
pub use scope::{effect_scope, get_current_scope, on_scope_dispose, EffectScope, ScopeCleanupFn};
pub use signal::{mutable_source, signal, signal_with_equals, Signal};
pub use watch::{watch, WatchOptions, Watcher};
