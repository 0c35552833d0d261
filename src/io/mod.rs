//! Background I/O for the panel viewer.

pub mod async_loader;

pub use async_loader::{AsyncLoader, LoadResult};
