// ============================================================================
// spark-async - Field Options
// Declarative builders for computed and data fields
// ============================================================================

use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::Value;

use crate::fields::state::ErrorHandler;

/// The producer input bundle: watched keys mapped to their current values.
pub type Inputs = serde_json::Map<String, Value>;

pub(crate) type ComputedProducer<T> = Rc<dyn Fn(Inputs) -> LocalBoxFuture<'static, anyhow::Result<T>>>;

pub(crate) type DataProducer<C, T> = Rc<dyn Fn(&C) -> LocalBoxFuture<'static, anyhow::Result<T>>>;

// =============================================================================
// WATCH SPEC
// =============================================================================

/// Which owner fields a trigger path observes.
pub enum WatchSpec<C> {
    /// Named owner fields, read through [`Component::field`](crate::Component::field).
    Fields(Vec<String>),
    /// An arbitrary selector. Must return a JSON object.
    Select(Rc<dyn Fn(&C) -> Value>),
}

impl<C> WatchSpec<C> {
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(names.into_iter().map(Into::into).collect())
    }

    pub fn select(f: impl Fn(&C) -> Value + 'static) -> Self {
        Self::Select(Rc::new(f))
    }

    /// The declared names, for name-list specs.
    pub fn names(&self) -> Option<&[String]> {
        match self {
            Self::Fields(names) => Some(names),
            Self::Select(_) => None,
        }
    }
}

impl<C> Clone for WatchSpec<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Fields(names) => Self::Fields(names.clone()),
            Self::Select(f) => Self::Select(f.clone()),
        }
    }
}

impl<C> fmt::Debug for WatchSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(names) => f.debug_tuple("Fields").field(names).finish(),
            Self::Select(_) => f.write_str("Select(..)"),
        }
    }
}

fn wrap_error_handler(f: impl Fn(&anyhow::Error) + 'static) -> ErrorHandler {
    Rc::new(f)
}

// =============================================================================
// COMPUTED OPTIONS
// =============================================================================

/// Options for an async computed field.
///
/// `T` is what the producer yields; `V` is what the field exposes: `Option<T>`
/// until [`default_value`](Self::default_value) fixes it to `T`.
///
/// # Example
///
/// ```
/// use spark_async::{ComputedOptions, Inputs};
/// # struct Form;
///
/// let options = ComputedOptions::<Form, i64>::new(|inputs: Inputs| async move {
///     Ok(inputs["num"].as_i64().unwrap_or_default() + 1)
/// })
/// .watch(["num"])
/// .default_value(0)
/// .eager();
/// # let _ = options;
/// ```
pub struct ComputedOptions<C, T, V = Option<T>> {
    pub(crate) get: ComputedProducer<T>,
    pub(crate) lift: fn(T) -> V,
    pub(crate) default: V,
    pub(crate) defaulted: bool,
    pub(crate) watch: Option<WatchSpec<C>>,
    pub(crate) watch_closely: Option<WatchSpec<C>>,
    pub(crate) eager: bool,
    pub(crate) debounce: Option<Duration>,
    pub(crate) deep: bool,
    pub(crate) error: Option<ErrorHandler>,
    pub(crate) label: Option<String>,
}

impl<C, T: 'static> ComputedOptions<C, T> {
    pub fn new<F, Fut>(get: F) -> Self
    where
        F: Fn(Inputs) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<T>> + 'static,
    {
        Self {
            get: Rc::new(move |inputs: Inputs| get(inputs).boxed_local()),
            lift: Some,
            default: None,
            defaulted: false,
            watch: None,
            watch_closely: None,
            eager: false,
            debounce: None,
            deep: true,
            error: None,
            label: None,
        }
    }

    /// Supply a default: the field exposes `T` and falls back to `value` on
    /// failure.
    pub fn default_value(self, value: T) -> ComputedOptions<C, T, T> {
        ComputedOptions {
            get: self.get,
            lift: std::convert::identity,
            default: value,
            defaulted: true,
            watch: self.watch,
            watch_closely: self.watch_closely,
            eager: self.eager,
            debounce: self.debounce,
            deep: self.deep,
            error: self.error,
            label: self.label,
        }
    }
}

impl<C, T, V> ComputedOptions<C, T, V> {
    /// Debounced trigger path over named owner fields.
    pub fn watch<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watch = Some(WatchSpec::fields(names));
        self
    }

    /// Debounced trigger path over a selector.
    pub fn watch_select(mut self, f: impl Fn(&C) -> Value + 'static) -> Self {
        self.watch = Some(WatchSpec::select(f));
        self
    }

    /// Immediate trigger path over named owner fields.
    pub fn watch_closely<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watch_closely = Some(WatchSpec::fields(names));
        self
    }

    /// Immediate trigger path over a selector.
    pub fn watch_closely_select(mut self, f: impl Fn(&C) -> Value + 'static) -> Self {
        self.watch_closely = Some(WatchSpec::select(f));
        self
    }

    /// Run the producer during construction.
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Override the factory's debounce wait. Requires a `watch` spec.
    pub fn debounce(mut self, wait: Duration) -> Self {
        self.debounce = Some(wait);
        self
    }

    /// Structural change detection for both trigger paths (default true).
    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    /// Override the factory's error handler.
    pub fn error(mut self, handler: impl Fn(&anyhow::Error) + 'static) -> Self {
        self.error = Some(wrap_error_handler(handler));
        self
    }

    /// Name used in log events.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// =============================================================================
// DATA OPTIONS
// =============================================================================

/// Options for an async data field: a producer of the owner alone, refreshed
/// on demand.
pub struct DataOptions<C, T, V = Option<T>> {
    pub(crate) get: DataProducer<C, T>,
    pub(crate) lift: fn(T) -> V,
    pub(crate) default: V,
    pub(crate) defaulted: bool,
    pub(crate) lazy: bool,
    pub(crate) error: Option<ErrorHandler>,
    pub(crate) label: Option<String>,
}

impl<C, T: 'static> DataOptions<C, T> {
    pub fn new<F, Fut>(get: F) -> Self
    where
        F: Fn(&C) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<T>> + 'static,
    {
        Self {
            get: Rc::new(move |owner: &C| get(owner).boxed_local()),
            lift: Some,
            default: None,
            defaulted: false,
            lazy: false,
            error: None,
            label: None,
        }
    }

    pub fn default_value(self, value: T) -> DataOptions<C, T, T> {
        DataOptions {
            get: self.get,
            lift: std::convert::identity,
            default: value,
            defaulted: true,
            lazy: self.lazy,
            error: self.error,
            label: self.label,
        }
    }
}

impl<C, T, V> DataOptions<C, T, V> {
    /// Skip the producer call at construction; wait for `refresh()`.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn error(mut self, handler: impl Fn(&anyhow::Error) + 'static) -> Self {
        self.error = Some(wrap_error_handler(handler));
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Owner;

    fn producer() -> ComputedOptions<Owner, i32> {
        ComputedOptions::new(|_inputs: Inputs| async { Ok(1) })
    }

    #[test]
    fn defaults_are_lazy_deep_and_undefaulted() {
        let options = producer();
        assert!(!options.eager);
        assert!(options.deep);
        assert!(!options.defaulted);
        assert_eq!(options.default, None);
        assert!(options.watch.is_none() && options.watch_closely.is_none());
        assert_eq!((options.lift)(5), Some(5));
    }

    #[test]
    fn default_value_switches_the_exposed_type() {
        let options = producer().watch(["a"]).eager().default_value(9);
        assert!(options.defaulted);
        assert!(options.eager);
        assert_eq!(options.default, 9);
        assert_eq!((options.lift)(5), 5);
        assert_eq!(options.watch.unwrap().names(), Some(&["a".to_string()][..]));
    }

    #[test]
    fn selector_specs_have_no_names() {
        let options = producer().watch_closely_select(|_| json!({ "x": 1 }));
        let spec = options.watch_closely.unwrap();
        assert!(spec.names().is_none());
        assert_eq!(format!("{spec:?}"), "Select(..)");
    }

    #[test]
    fn data_options_default_to_eager() {
        let options = DataOptions::<Owner, u8>::new(|_| async { Ok(1) }).lazy();
        assert!(options.lazy);
        assert!(!options.defaulted);
    }
}
