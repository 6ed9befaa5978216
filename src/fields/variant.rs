// ============================================================================
// spark-async - Variant Matrix
// The eight field configurations and their initial-state contracts
// ============================================================================

use std::fmt;

/// Which of the eight field configurations a field was built as.
///
/// - `eager`: the producer runs during construction
/// - `defaulted`: a default value was supplied, so the exposed value is `T`
///   rather than `Option<T>`
/// - `debounced`: a "watch" specification was given, so the field has a
///   queued state and a debounce timer
///
/// | eager | defaulted | debounced | promise after construction | initial action |
/// |---|---|---|---|---|
/// | yes | yes | yes | `Some` | invoke |
/// | yes | no | yes | `Some` | invoke |
/// | no | yes | yes | `None` | idle until first trigger |
/// | no | no | yes | `None` | idle |
/// | yes | yes | no | `Some` | invoke |
/// | yes | no | no | `Some` | invoke |
/// | no | yes | no | `None` | idle |
/// | no | no | no | `None` | idle |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variant {
    pub eager: bool,
    pub defaulted: bool,
    pub debounced: bool,
}

impl Variant {
    pub const ALL: [Variant; 8] = [
        Variant::new(true, true, true),
        Variant::new(true, false, true),
        Variant::new(false, true, true),
        Variant::new(false, false, true),
        Variant::new(true, true, false),
        Variant::new(true, false, false),
        Variant::new(false, true, false),
        Variant::new(false, false, false),
    ];

    pub const fn new(eager: bool, defaulted: bool, debounced: bool) -> Self {
        Self {
            eager,
            defaulted,
            debounced,
        }
    }

    /// Whether a promise exists right after construction.
    pub const fn has_initial_promise(self) -> bool {
        self.eager
    }

    /// Whether `loading()` is true right after construction.
    pub const fn starts_loading(self) -> bool {
        self.eager
    }

    /// Whether the field exposes `queued()`.
    pub const fn has_queued_state(self) -> bool {
        self.debounced
    }

    /// Whether the initial value is `None` (no default was supplied).
    pub const fn starts_empty(self) -> bool {
        !self.defaulted
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool, yes: &'static str, no: &'static str| if on { yes } else { no };
        write!(
            f,
            "{}/{}/{}",
            flag(self.eager, "eager", "lazy"),
            flag(self.defaulted, "defaulted", "undefaulted"),
            flag(self.debounced, "debounced", "immediate"),
        )
    }
}
