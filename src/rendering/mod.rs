//! Rendering subsystem for drawing panel rows
//!
//! - Tree row rendering (branch lines, expand control, column cells)
//! - Text utilities (text measurement and truncation)

pub mod tree_renderer;
pub mod text_utils;
