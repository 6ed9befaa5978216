// ============================================================================
// spark-async - Async Fields
// Computed and data fields produced by async producers
// ============================================================================
//
//   debounce  - trailing debounce on the tokio LocalSet
//   state     - value / promise / loading / error and the invoke transition
//   variant   - the eight eager x defaulted x debounced configurations
//   options   - builders for computed and data fields
//   binder    - watch specs, input bundles, subscription registration
//   host      - Component / Observe / Lifecycle capabilities
//   computed  - AsyncComputed
//   data      - AsyncData
//   factory   - AsyncFactory
// ============================================================================

pub mod binder;
pub mod computed;
pub mod data;
pub mod debounce;
pub mod factory;
pub mod host;
pub mod options;
pub mod state;
pub mod variant;

pub use binder::WatchBinder;
pub use computed::AsyncComputed;
pub use data::AsyncData;
pub use debounce::{DebouncedFn, Debouncer};
pub use factory::AsyncFactory;
pub use host::{Component, CreatedHook, Hooks, Lifecycle, Observe, SignalObserver, Subscription};
pub use options::{ComputedOptions, DataOptions, Inputs, WatchSpec};
pub use state::{ErrorHandler, FieldError, FieldState, Promise};
pub use variant::Variant;
