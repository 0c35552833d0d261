//! UI panel rendering subsystem
//!
//! This module contains all UI panel rendering logic for the panel viewer:
//! - Header panel (page tabs, config import, appearance)
//! - Search panel (per-page filter form)
//! - Tree panel (virtualized rows with pagination)
//! - Table header component (resizable column headers, column chooser)
//! - Transfer panel (assignment editing for the selected node)
//! - Details panel (attributes of the selected node)
//! - Status bar (memory and page counters)
//! - Panel manager (panel orchestration and layout)

pub mod details_panel;
pub mod header;
pub mod panel_manager;
pub mod search_panel;
pub mod status_bar;
pub mod table_header;
pub mod transfer_panel;
pub mod tree_panel;
pub mod virtual_scrolling;
