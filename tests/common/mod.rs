#![allow(dead_code)]

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use serde_json::{json, Value};
use spark_async::{
    signal, AsyncConfig, AsyncFactory, Component, ComputedOptions, Inputs, Signal,
};
use tokio::task::LocalSet;
use tokio::time::sleep;

/// Debounce wait used by the test factory.
pub const DEBOUNCE: Duration = Duration::from_millis(25);

/// How long every test producer takes.
pub const DELAY: Duration = Duration::from_millis(25);

/// Slightly longer than `DEBOUNCE`, so timers never tie with test sleeps.
pub const PAST_DEBOUNCE: Duration = Duration::from_millis(30);

pub struct Form {
    pub num: Signal<i64>,
    pub yes: Signal<bool>,
}

impl Component for Form {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "num" => Some(json!(self.num.get())),
            "yes" => Some(json!(self.yes.get())),
            _ => None,
        }
    }
}

pub fn form() -> Rc<Form> {
    Rc::new(Form {
        num: signal(1),
        yes: signal(true),
    })
}

pub fn factory() -> AsyncFactory {
    AsyncFactory::new(AsyncConfig::with_debounce_ms(DEBOUNCE.as_millis() as u64))
}

pub fn num(inputs: &Inputs) -> i64 {
    inputs.get("num").and_then(Value::as_i64).unwrap_or_default()
}

pub fn yes(inputs: &Inputs) -> bool {
    inputs.get("yes").and_then(Value::as_bool).unwrap_or(true)
}

/// `num + 1` after `DELAY`.
pub fn plus_one() -> ComputedOptions<Form, i64> {
    ComputedOptions::new(|inputs: Inputs| async move {
        sleep(DELAY).await;
        Ok(num(&inputs) + 1)
    })
}

/// `num + 1` while `yes`, 4 otherwise.
pub fn plus_one_or_four() -> ComputedOptions<Form, i64> {
    ComputedOptions::new(|inputs: Inputs| async move {
        sleep(DELAY).await;
        Ok(if yes(&inputs) { num(&inputs) + 1 } else { 4 })
    })
}

/// `num + 1`, failing with "e" once `yes` is false.
pub fn plus_one_unless_no() -> ComputedOptions<Form, i64> {
    ComputedOptions::new(|inputs: Inputs| async move {
        if !yes(&inputs) {
            anyhow::bail!("e");
        }
        sleep(DELAY).await;
        Ok(num(&inputs) + 1)
    })
}

/// Counts calls to an error handler.
#[derive(Clone, Default)]
pub struct Spy(Rc<Cell<u32>>);

impl Spy {
    pub fn handler(&self) -> impl Fn(&anyhow::Error) + 'static {
        let calls = self.0.clone();
        move |_| calls.set(calls.get() + 1)
    }

    pub fn calls(&self) -> u32 {
        self.0.get()
    }
}

pub async fn local<F: Future>(f: F) -> F::Output {
    LocalSet::new().run_until(f).await
}
