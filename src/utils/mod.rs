//! Utility modules for the panel viewer.

pub mod formatting;

// Re-export commonly used functions
pub use formatting::{format_count, format_value, get_current_memory_mb, format_memory_mb};
