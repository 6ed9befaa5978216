// ============================================================================
// spark-async - Async Factory
// Creates async fields with shared defaults
// ============================================================================

use std::future::Future;
use std::rc::Rc;

use crate::config::AsyncConfig;
use crate::error::ConfigError;
use crate::fields::computed::AsyncComputed;
use crate::fields::data::AsyncData;
use crate::fields::debounce::DebouncedFn;
use crate::fields::host::{Component, Observe, SignalObserver};
use crate::fields::options::{ComputedOptions, DataOptions};
use crate::fields::state::ErrorHandler;

/// Creates async fields.
///
/// Holds the defaults every field falls back to: the debounce wait, an
/// error handler, and the [`Observe`] implementation used to bind.
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use spark_async::{signal, AsyncConfig, AsyncFactory, Component, ComputedOptions, Inputs, Signal};
/// use std::rc::Rc;
///
/// struct Form {
///     num: Signal<i64>,
/// }
///
/// impl Component for Form {
///     fn field(&self, name: &str) -> Option<Value> {
///         (name == "num").then(|| json!(self.num.get()))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// # tokio::task::LocalSet::new().run_until(async {
/// let factory = AsyncFactory::new(AsyncConfig::with_debounce_ms(25));
/// let form = Rc::new(Form { num: signal(1) });
///
/// let next = factory
///     .computed(
///         &form,
///         ComputedOptions::new(|inputs: Inputs| async move {
///             Ok(inputs["num"].as_i64().unwrap_or_default() + 1)
///         })
///         .watch(["num"])
///         .default_value(0)
///         .eager(),
///     )
///     .unwrap();
/// next.bind().unwrap();
///
/// assert_eq!(next.value(), 0);
/// assert_eq!(next.promise().unwrap().await, 2);
/// # }).await;
/// # }
/// ```
pub struct AsyncFactory {
    config: AsyncConfig,
    error_handler: Option<ErrorHandler>,
    observer: Rc<dyn Observe>,
}

impl AsyncFactory {
    pub fn new(config: AsyncConfig) -> Self {
        Self {
            config,
            error_handler: None,
            observer: Rc::new(SignalObserver),
        }
    }

    /// Error handler for fields that do not set their own.
    pub fn with_error_handler(mut self, handler: impl Fn(&anyhow::Error) + 'static) -> Self {
        self.error_handler = Some(Rc::new(handler));
        self
    }

    pub fn with_observer(mut self, observer: impl Observe + 'static) -> Self {
        self.observer = Rc::new(observer);
        self
    }

    pub fn config(&self) -> &AsyncConfig {
        &self.config
    }

    /// Build a computed field. Eager fields start their first invocation here.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DebounceWithoutWatch`] for a debounce with no `watch`
    /// - [`ConfigError::UnknownField`] for a watched name `owner` lacks
    /// - [`ConfigError::OverlappingKeys`] when the two name lists share a key
    ///
    /// # Panics
    ///
    /// Eager fields panic outside of a `tokio::task::LocalSet`.
    pub fn computed<C, T, V>(
        &self,
        owner: &Rc<C>,
        options: ComputedOptions<C, T, V>,
    ) -> Result<AsyncComputed<C, V>, ConfigError>
    where
        C: Component,
        T: 'static,
        V: Clone + 'static,
    {
        AsyncComputed::from_options(
            owner,
            options,
            self.config.debounce(),
            self.error_handler.clone(),
            Rc::clone(&self.observer),
        )
    }

    /// Build a data field. Unless `lazy`, the producer starts here.
    pub fn data<C, T, V>(&self, owner: &Rc<C>, options: DataOptions<C, T, V>) -> AsyncData<C, V>
    where
        C: 'static,
        T: 'static,
        V: Clone + 'static,
    {
        AsyncData::from_options(owner, options, self.error_handler.clone())
    }

    /// Shorthand for an eager, undefaulted data field.
    pub fn data_fn<C, T, F, Fut>(&self, owner: &Rc<C>, get: F) -> AsyncData<C, Option<T>>
    where
        C: 'static,
        T: Clone + 'static,
        F: Fn(&C) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<T>> + 'static,
    {
        self.data(owner, DataOptions::new(get))
    }

    /// Debounce `f` by the configured wait, forwarding the last argument.
    pub fn debounce_function<A: 'static>(&self, f: impl Fn(A) + 'static) -> DebouncedFn<A> {
        DebouncedFn::new(self.config.debounce(), f)
    }
}

impl Default for AsyncFactory {
    fn default() -> Self {
        Self::new(AsyncConfig::default())
    }
}

impl std::fmt::Debug for AsyncFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFactory")
            .field("config", &self.config)
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}
