// ============================================================================
// spark-async - Constants
// Flag constants for sources and reactions in the signal host
// ============================================================================

// =============================================================================
// TYPE FLAGS
// =============================================================================

/// Source signal (basic reactive value)
pub const SOURCE: u32 = 1 << 0;

/// Reaction is an effect
pub const EFFECT: u32 = 1 << 1;

/// Effect backs a `watch()` subscription
pub const WATCHER: u32 = 1 << 2;

// =============================================================================
// STATE FLAGS
// =============================================================================

/// Up-to-date
pub const CLEAN: u32 = 1 << 10;

/// Needs to re-run
pub const DIRTY: u32 = 1 << 11;

/// Reaction is currently running
pub const REACTION_IS_UPDATING: u32 = 1 << 12;

/// Effect has been destroyed
pub const DESTROYED: u32 = 1 << 13;

/// Effect has run at least once
pub const EFFECT_RAN: u32 = 1 << 14;

// =============================================================================
// STATUS MASK
// =============================================================================

/// Mask to clear the status bits (CLEAN, DIRTY)
pub const STATUS_MASK: u32 = !(DIRTY | CLEAN);
