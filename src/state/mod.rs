//! State management modules for the panel viewer.
//!
//! This module contains state-only logic (no UI concerns):
//! - Page state (tree session, column layout, search form, transfer panel)
//! - Selection state (selected node)
//! - Layout state (split ratios, tree column width)

mod page_state;
mod selection;
mod layout_state;

pub use page_state::{PageState, TransferState};
pub use selection::SelectionState;
pub use layout_state::LayoutState;
