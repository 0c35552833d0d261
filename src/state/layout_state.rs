//! UI layout state management.
//!
//! This module encapsulates all state related to UI layout,
//! including panel split ratios and the tree column width.

use serde::{Deserialize, Serialize};

use crate::ui::virtual_scrolling::MIN_EXPAND_WIDTH;

/// State related to UI layout and sizing.
///
/// Responsibilities:
/// - Managing panel split ratios
/// - Tracking the width of the tree (expand) column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutState {
    /// Split ratio between the main view and the details panel (0.0 to 1.0)
    split_ratio: f32,
    /// Width of the transfer panel on the right
    transfer_width: f32,
    /// Width of the expand/collapse column (tree branch visualization area)
    expand_width: f32,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutState {
    /// Creates a new layout state with default values.
    pub fn new() -> Self {
        Self {
            split_ratio: 0.7,
            transfer_width: 320.0,
            expand_width: 100.0,
        }
    }

    // ===== Layout Queries =====

    /// Returns the main split ratio (main view vs details panel).
    pub fn split_ratio(&self) -> f32 {
        self.split_ratio
    }

    pub fn transfer_width(&self) -> f32 {
        self.transfer_width
    }

    /// Returns the expand column width.
    pub fn expand_width(&self) -> f32 {
        self.expand_width
    }

    // ===== Layout Mutations =====

    /// Records the details panel height after the user resized it.
    pub fn set_split_from_heights(&mut self, details_height: f32, total_height: f32) {
        if total_height > 0.0 {
            self.split_ratio = (1.0 - details_height / total_height).clamp(0.2, 0.9);
        }
    }

    pub fn set_transfer_width(&mut self, width: f32) {
        self.transfer_width = width.max(200.0);
    }

    /// Sets the expand column width, keeping it above the minimum.
    pub fn set_expand_width(&mut self, width: f32) {
        self.expand_width = width.max(MIN_EXPAND_WIDTH);
    }
}
