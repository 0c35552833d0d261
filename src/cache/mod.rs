//! Caching modules for the panel viewer.

pub mod tree_cache;

// Re-export commonly used types
pub use tree_cache::RowCache;
