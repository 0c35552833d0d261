//! Selection state management.
//!
//! This module encapsulates the selected row of one page.

use rpanel::RecordKey;

/// State related to user selection.
///
/// Responsibilities:
/// - Tracking the selected node key
/// - Providing intent-revealing selection queries
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    /// Currently selected node key
    selected_key: Option<RecordKey>,
}

impl SelectionState {
    /// Creates a new selection state with nothing selected.
    pub fn new() -> Self {
        Self { selected_key: None }
    }

    /// Clears the selection.
    pub fn clear(&mut self) {
        self.selected_key = None;
    }

    // ===== Selection Queries =====

    /// Returns the currently selected node key, if any.
    pub fn selected_key(&self) -> Option<&str> {
        self.selected_key.as_deref()
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected_key() == Some(key)
    }

    // ===== Selection Mutations =====

    /// Selects a node. Returns `true` if the selection changed.
    pub fn select(&mut self, key: &str) -> bool {
        if self.is_selected(key) {
            return false;
        }
        self.selected_key = Some(key.to_owned());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_reports_change() {
        let mut selection = SelectionState::new();
        assert!(selection.select("g1"));
        assert!(!selection.select("g1"));
        assert!(selection.is_selected("g1"));
        selection.clear();
        assert_eq!(selection.selected_key(), None);
    }
}
