//! Virtual scrolling constants.
//!
//! Rows are laid out with a fixed height so the scroll area only has to
//! draw the rows inside the viewport.

/// Row height in pixels
pub const ROW_HEIGHT: f32 = 22.0;

/// Horizontal indent per tree level
pub const INDENT_WIDTH: f32 = 20.0;

/// Height of the column header row
pub const HEADER_HEIGHT: f32 = 24.0;

/// Narrowest the tree (expand) column can be dragged
pub const MIN_EXPAND_WIDTH: f32 = 50.0;
