// ============================================================================
// spark-async - Watch Binder
// Normalizes watch specs, builds producer inputs, registers subscriptions
// ============================================================================

use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::Value;

use crate::error::ConfigError;
use crate::fields::host::{Component, Observe, Subscription};
use crate::fields::options::{Inputs, WatchSpec};
use crate::primitives::watch::WatchOptions;
use crate::reactivity::batching::untrack;

const WATCH: &str = "watch";
const WATCH_CLOSELY: &str = "watch_closely";

/// Evaluate one spec against the owner. Tracked when called from a selector.
fn select<C: Component>(spec: &WatchSpec<C>, owner: &C) -> Value {
    match spec {
        WatchSpec::Fields(names) => Value::Object(
            names
                .iter()
                .map(|name| (name.clone(), owner.field(name).unwrap_or(Value::Null)))
                .collect(),
        ),
        WatchSpec::Select(f) => f(owner),
    }
}

fn overlap<'a>(a: impl Iterator<Item = &'a String>, b: impl Iterator<Item = &'a String>) -> Vec<String> {
    let a: BTreeSet<&String> = a.collect();
    b.filter(|key| a.contains(key)).cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

// =============================================================================
// WATCH BINDER
// =============================================================================

/// The two trigger paths of a computed field.
///
/// "watch" changes are debounced; "watch closely" changes invoke at once.
/// Both feed one input bundle, so their key sets must not overlap.
pub struct WatchBinder<C> {
    watch: Option<WatchSpec<C>>,
    watch_closely: Option<WatchSpec<C>>,
    deep: bool,
}

impl<C: Component> WatchBinder<C> {
    pub fn new(watch: Option<WatchSpec<C>>, watch_closely: Option<WatchSpec<C>>, deep: bool) -> Self {
        Self {
            watch,
            watch_closely,
            deep,
        }
    }

    pub fn is_debounced(&self) -> bool {
        self.watch.is_some()
    }

    pub fn deep(&self) -> bool {
        self.deep
    }

    fn specs(&self) -> impl Iterator<Item = (&'static str, &WatchSpec<C>)> {
        [(WATCH, self.watch.as_ref()), (WATCH_CLOSELY, self.watch_closely.as_ref())]
            .into_iter()
            .filter_map(|(which, spec)| spec.map(|spec| (which, spec)))
    }

    /// Check name lists against the owner at construction.
    pub fn validate_names(&self, owner: &C) -> Result<(), ConfigError> {
        untrack(|| {
            for (_, spec) in self.specs() {
                for name in spec.names().unwrap_or_default() {
                    if owner.field(name).is_none() {
                        return Err(ConfigError::unknown_field(name.as_str()));
                    }
                }
            }
            Ok(())
        })?;

        let watch = self.watch.as_ref().and_then(WatchSpec::names);
        let closely = self.watch_closely.as_ref().and_then(WatchSpec::names);
        if let (Some(watch), Some(closely)) = (watch, closely) {
            let shared = overlap(watch.iter(), closely.iter());
            if !shared.is_empty() {
                return Err(ConfigError::overlapping_keys(shared));
            }
        }
        Ok(())
    }

    /// Evaluate both selectors once at bind time: each must return an object
    /// and their key sets must be disjoint.
    pub fn check_selectors(&self, owner: &C) -> Result<(), ConfigError> {
        let mut objects = Vec::with_capacity(2);
        for (which, spec) in self.specs() {
            match untrack(|| select(spec, owner)) {
                Value::Object(map) => objects.push(map),
                _ => return Err(ConfigError::SelectorNotObject { which }),
            }
        }

        if let [watch, closely] = objects.as_slice() {
            let shared = overlap(watch.keys(), closely.keys());
            if !shared.is_empty() {
                return Err(ConfigError::overlapping_keys(shared));
            }
        }
        Ok(())
    }

    /// The producer input bundle: a shallow merge of both selectors, read
    /// without tracking.
    ///
    /// Conflicting keys resolve to the "watch closely" value. A selector that
    /// stops returning an object contributes nothing.
    pub fn inputs(&self, owner: &C) -> Inputs {
        let mut inputs = Inputs::new();
        for (which, spec) in self.specs() {
            match untrack(|| select(spec, owner)) {
                Value::Object(map) => {
                    for (key, value) in map {
                        if inputs.insert(key.clone(), value).is_some() {
                            tracing::warn!(key = %key, "input key produced by both selectors");
                        }
                    }
                }
                other => {
                    tracing::warn!(selector = which, got = %other, "selector returned a non-object");
                }
            }
        }
        inputs
    }

    /// Register both trigger paths with `observer`.
    ///
    /// `on_watch` runs for "watch" changes, `on_watch_closely` for "watch
    /// closely" changes. Neither fires at registration.
    pub fn register(
        &self,
        owner: &Rc<C>,
        observer: &dyn Observe,
        on_watch: Box<dyn FnMut()>,
        on_watch_closely: Box<dyn FnMut()>,
    ) -> Vec<Subscription> {
        let options = WatchOptions {
            deep: self.deep,
            immediate: false,
        };

        let mut subscriptions = Vec::with_capacity(2);
        if let Some(spec) = &self.watch_closely {
            subscriptions.push(observer.observe(selector(spec, owner), on_watch_closely, options));
        }
        if let Some(spec) = &self.watch {
            subscriptions.push(observer.observe(selector(spec, owner), on_watch, options));
        }
        subscriptions
    }
}

fn selector<C: Component>(spec: &WatchSpec<C>, owner: &Rc<C>) -> Box<dyn Fn() -> Value> {
    let spec = spec.clone();
    let owner = Rc::clone(owner);
    Box::new(move || select(&spec, &owner))
}

impl<C> std::fmt::Debug for WatchBinder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchBinder")
            .field("watch", &self.watch)
            .field("watch_closely", &self.watch_closely)
            .field("deep", &self.deep)
            .finish()
    }
}
