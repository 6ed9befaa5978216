mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{factory, form, local, num, Form, PAST_DEBOUNCE};
use serde_json::json;
use spark_async::{effect_scope, AnySource, ComputedOptions, ConfigError, Hooks, Inputs};
use tokio::time::sleep;

fn counted(calls: &Rc<Cell<u32>>) -> ComputedOptions<Form, i64> {
    let calls = calls.clone();
    ComputedOptions::new(move |inputs: Inputs| {
        calls.set(calls.get() + 1);
        async move { Ok(num(&inputs) + 1) }
    })
}

#[tokio::test(start_paused = true)]
async fn dropping_a_field_releases_its_watchers() {
    local(async {
        let form = form();
        let calls = Rc::new(Cell::new(0));
        {
            let field = factory()
                .computed(&form, counted(&calls).watch(["num"]).watch_closely(["yes"]))
                .unwrap();
            field.bind().unwrap();
            assert_eq!(form.num.inner().reaction_count(), 1);
            assert_eq!(form.yes.inner().reaction_count(), 1);
        }

        assert_eq!(form.num.inner().reaction_count(), 0);
        assert_eq!(form.yes.inner().reaction_count(), 0);

        form.yes.set(false);
        assert_eq!(calls.get(), 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn dropping_a_field_cancels_its_pending_debounce() {
    local(async {
        let form = form();
        let calls = Rc::new(Cell::new(0));
        let field = factory()
            .computed(&form, counted(&calls).watch(["num"]))
            .unwrap();
        field.bind().unwrap();

        form.num.set(2);
        assert_eq!(field.queued(), Some(true));
        drop(field);

        sleep(PAST_DEBOUNCE).await;
        assert_eq!(calls.get(), 0);
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn in_flight_promise_outlives_its_field() {
    local(async {
        let form = form();
        let field = factory()
            .computed(&form, common::plus_one().watch_closely(["num"]).eager())
            .unwrap();
        let promise = field.promise().unwrap();
        drop(field);

        assert_eq!(promise.await, Some(2));
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn stopping_the_scope_severs_every_path() {
    local(async {
        let form = form();
        let calls = Rc::new(Cell::new(0));
        let scope = effect_scope(false);
        let field = factory()
            .computed(&form, counted(&calls).watch(["num"]).watch_closely(["yes"]))
            .unwrap();
        assert_eq!(scope.run(|| field.bind()), Some(Ok(())));

        form.num.set(2);
        assert_eq!(field.queued(), Some(true));

        scope.stop();
        assert_eq!(field.queued(), Some(false));
        assert_eq!(form.num.inner().reaction_count(), 0);

        form.yes.set(false);
        sleep(PAST_DEBOUNCE).await;
        assert_eq!(calls.get(), 0);
        assert!(field.promise().is_none());
    })
    .await;
}

#[test]
fn failing_created_hook_discards_the_rest() {
    let form = form();
    let hooks = Hooks::new();
    let broken = factory()
        .computed(&form, common::plus_one().watch_select(|f: &Form| json!(f.num.get())))
        .unwrap();
    let fine = factory()
        .computed(&form, common::plus_one().watch_closely(["num"]))
        .unwrap();
    broken.attach(&hooks);
    fine.attach(&hooks);
    assert_eq!(hooks.pending(), 2);

    assert_eq!(
        hooks.created(),
        Err(ConfigError::SelectorNotObject { which: "watch" })
    );
    assert_eq!(hooks.pending(), 0);
    assert!(!fine.is_bound());
}

#[test]
fn hook_for_a_dropped_field_is_skipped() {
    let form = form();
    let hooks = Hooks::new();
    {
        let field = factory()
            .computed(&form, common::plus_one().watch_closely(["num"]))
            .unwrap();
        field.attach(&hooks);
    }
    assert_eq!(hooks.created(), Ok(()));
    assert_eq!(form.num.inner().reaction_count(), 0);
}
