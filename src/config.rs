// ============================================================================
// spark-async - Configuration
// Factory-wide defaults for async fields
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Defaults shared by every field an [`AsyncFactory`](crate::AsyncFactory)
/// creates.
///
/// Per-field options override these values.
///
/// # Examples
///
/// ```
/// use spark_async::AsyncConfig;
///
/// let config: AsyncConfig = serde_json::from_str(r#"{ "debounce_ms": 25 }"#).unwrap();
/// assert_eq!(config.debounce().as_millis(), 25);
///
/// assert_eq!(AsyncConfig::default().debounce_ms, 0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncConfig {
    /// Quiet period in milliseconds for fields with a "watch" specification.
    ///
    /// Changes observed within this window collapse into one producer call
    /// on the trailing edge. Zero still defers to the next scheduler tick.
    pub debounce_ms: u64,
}

impl AsyncConfig {
    pub fn with_debounce_ms(debounce_ms: u64) -> Self {
        Self { debounce_ms }
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: AsyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AsyncConfig::default());
    }

    #[test]
    fn round_trips_through_json() {
        let config = AsyncConfig::with_debounce_ms(250);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"debounce_ms":250}"#);
        assert_eq!(serde_json::from_str::<AsyncConfig>(&json).unwrap(), config);
    }

    #[test]
    fn debounce_is_a_duration() {
        assert_eq!(
            AsyncConfig::with_debounce_ms(40).debounce(),
            Duration::from_millis(40)
        );
    }
}
