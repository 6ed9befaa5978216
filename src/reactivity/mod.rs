// ============================================================================
// spark-async - Reactivity Module
// Dependency tracking, dirty propagation and batching
// ============================================================================

pub mod batching;
pub mod tracking;
