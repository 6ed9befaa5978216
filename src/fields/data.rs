// ============================================================================
// spark-async - Async Data
// A field loaded from its owner by an async producer, refreshed on demand
// ============================================================================

use std::rc::Rc;

use futures::TryFutureExt;
use futures::future::{FutureExt, LocalBoxFuture};

use crate::fields::options::DataOptions;
use crate::fields::state::{ErrorHandler, FieldError, FieldState, Promise};
use crate::fields::variant::Variant;
use crate::reactivity::batching::untrack;

type LiftedProducer<C, V> = Rc<dyn Fn(&C) -> LocalBoxFuture<'static, anyhow::Result<V>>>;

/// An asynchronously loaded field with no watched inputs.
///
/// Created by [`AsyncFactory::data`](crate::AsyncFactory::data) or
/// [`AsyncFactory::data_fn`](crate::AsyncFactory::data_fn). Eager fields
/// start loading at construction; lazy ones wait for [`refresh`](Self::refresh).
pub struct AsyncData<C, V> {
    owner: Rc<C>,
    state: FieldState<V>,
    producer: LiftedProducer<C, V>,
    variant: Variant,
}

impl<C: 'static, V: Clone + 'static> AsyncData<C, V> {
    pub(crate) fn from_options<T: 'static>(
        owner: &Rc<C>,
        options: DataOptions<C, T, V>,
        default_handler: Option<ErrorHandler>,
    ) -> Self {
        let get = options.get;
        let lift = options.lift;
        let producer: LiftedProducer<C, V> =
            Rc::new(move |owner: &C| get(owner).map_ok(lift).boxed_local());

        let data = Self {
            owner: Rc::clone(owner),
            state: FieldState::new(
                options.default,
                options.error.or(default_handler),
                options.label.unwrap_or_else(|| "data".to_owned()),
            ),
            producer,
            variant: Variant::new(!options.lazy, options.defaulted, false),
        };

        if data.variant.eager {
            drop(data.refresh());
        }
        data
    }

    pub fn value(&self) -> V {
        self.state.value()
    }

    pub fn with_value<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        self.state.with_value(f)
    }

    pub fn promise(&self) -> Option<Promise<V>> {
        self.state.promise()
    }

    pub fn loading(&self) -> bool {
        self.state.loading()
    }

    pub fn error(&self) -> Option<FieldError> {
        self.state.error()
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Call the producer again.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio::task::LocalSet`.
    pub fn refresh(&self) -> Promise<V> {
        tracing::debug!(field = %self.state.label(), variant = %self.variant, "refreshing");
        let pending = untrack(|| (self.producer)(&self.owner));
        self.state.run(pending)
    }
}

impl<C, V> std::fmt::Debug for AsyncData<C, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncData")
            .field("state", &self.state)
            .field("variant", &self.variant)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::signal::{signal, Signal};
    use tokio::task::LocalSet;

    struct Profile {
        id: Signal<u32>,
    }

    fn load(profile: &Profile) -> impl std::future::Future<Output = anyhow::Result<String>> + use<> {
        let id = profile.id.get();
        async move {
            tokio::task::yield_now().await;
            Ok(format!("user-{id}"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_reads_the_owner_at_call_time() {
        LocalSet::new()
            .run_until(async {
                let owner = Rc::new(Profile { id: signal(1) });
                let data = AsyncData::from_options(&owner, DataOptions::new(load).lazy(), None);
                assert!(data.promise().is_none());
                assert_eq!(data.value(), None);

                owner.id.set(7);
                assert_eq!(data.refresh().await, Some("user-7".to_owned()));
                assert_eq!(data.value(), Some("user-7".to_owned()));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn eager_defaulted_starts_loading_with_default() {
        LocalSet::new()
            .run_until(async {
                let owner = Rc::new(Profile { id: signal(2) });
                let data = AsyncData::from_options(
                    &owner,
                    DataOptions::new(load).default_value("anonymous".to_owned()),
                    None,
                );
                assert_eq!(data.variant(), Variant::new(true, true, false));
                assert!(data.loading());
                assert_eq!(data.value(), "anonymous");

                assert_eq!(data.promise().unwrap().await, "user-2");
                assert!(!data.loading());
            })
            .await;
    }
}
