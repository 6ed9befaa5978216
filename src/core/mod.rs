// ============================================================================
// spark-async - Core Module
// Fundamental types, traits, and context for the signal host
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;
