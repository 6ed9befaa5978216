//! Error types for async field configuration.
//!
//! Producer failures never surface here: they are contained in the field
//! (`error()`, default substitution, optional handler). [`ConfigError`]
//! covers mistakes in how a field was declared or bound.

/// Errors raised while constructing or binding an async field.
///
/// # Error Recovery Strategy
///
/// - **Overlapping keys** ([`ConfigError::OverlappingKeys`]): Fatal - fix the declaration
/// - **Unknown field** ([`ConfigError::UnknownField`]): Fatal - the owner has no such field
/// - **Debounce without watch** ([`ConfigError::DebounceWithoutWatch`]): Fatal
/// - **Selector not an object** ([`ConfigError::SelectorNotObject`]): Fatal
/// - **Already bound** ([`ConfigError::AlreadyBound`]): Recoverable - the first
///   binding stays in place
///
/// # Examples
///
/// ```
/// use spark_async::ConfigError;
///
/// let err = ConfigError::overlapping_keys(["num"]);
/// assert!(err.is_fatal());
/// assert_eq!(err.to_string(), "keys watched both debounced and closely: num");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The same key appears in both the "watch" and "watch closely" sets.
    ///
    /// A key has exactly one trigger path; it cannot be both debounced and
    /// immediate.
    #[error("keys watched both debounced and closely: {}", keys.join(", "))]
    OverlappingKeys { keys: Vec<String> },

    /// A watched name is not exposed by the owner component.
    #[error("owner has no field named `{name}`")]
    UnknownField { name: String },

    /// A per-field debounce was given to a field with no "watch" specification.
    ///
    /// Only the "watch" path is debounced, so the wait would never apply.
    #[error("debounce set without a `watch` specification")]
    DebounceWithoutWatch,

    /// A selector function returned something other than a JSON object.
    #[error("`{which}` selector must return an object")]
    SelectorNotObject { which: &'static str },

    /// `bind` was called on a field that is already bound.
    #[error("field is already bound")]
    AlreadyBound,
}

impl ConfigError {
    /// Creates a new [`ConfigError::OverlappingKeys`] error.
    pub fn overlapping_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OverlappingKeys {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a new [`ConfigError::UnknownField`] error.
    #[inline]
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField { name: name.into() }
    }

    /// Returns `true` if the field is still usable after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::AlreadyBound)
    }

    /// Returns `true` if the declaration has to change.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_keys_lists_every_key() {
        let err = ConfigError::overlapping_keys(["a", "b"]);
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "keys watched both debounced and closely: a, b");
    }

    #[test]
    fn unknown_field_names_the_field() {
        let err = ConfigError::unknown_field("nmu");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "owner has no field named `nmu`");
    }

    #[test]
    fn selector_not_object_names_the_side() {
        let err = ConfigError::SelectorNotObject { which: "watch_closely" };
        assert_eq!(err.to_string(), "`watch_closely` selector must return an object");
    }

    #[test]
    fn already_bound_is_recoverable() {
        assert!(ConfigError::AlreadyBound.is_recoverable());
        assert!(!ConfigError::DebounceWithoutWatch.is_recoverable());
    }
}
