//! Caching of flattened rows and formatted cell text.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rpanel::{visible_rows, Forest, Node, RecordKey, VisibleRow};

use crate::utils::format_value;

/// Cache for the rows of one tree panel.
///
/// The flattened row list is rebuilt whenever expansion state or the forest
/// changes. Formatted cell text is kept per node key and survives row
/// rebuilds; after a merge only the keys reported as changed are dropped.
pub struct RowCache {
    /// Flattened rows for the current forest and expansion state.
    rows: Option<Arc<[VisibleRow]>>,

    /// Maps node key -> column key -> display text.
    cells: HashMap<RecordKey, HashMap<String, String>>,

    /// Incremented whenever the row list is rebuilt.
    pub rebuild_seq: u64,
}

impl RowCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self {
            rows: None,
            cells: HashMap::new(),
            rebuild_seq: 0,
        }
    }

    /// Returns the visible rows, flattening the forest if needed.
    pub fn rows(
        &mut self,
        forest: &Forest,
        expanded: &HashSet<RecordKey>,
        pending: &HashSet<RecordKey>,
    ) -> Arc<[VisibleRow]> {
        if let Some(rows) = &self.rows {
            return Arc::clone(rows);
        }
        let rows: Arc<[VisibleRow]> = visible_rows(forest, expanded, pending).into();
        self.rows = Some(Arc::clone(&rows));
        self.rebuild_seq += 1;
        rows
    }

    /// Display text of `column_key` for `node`.
    pub fn cell(&mut self, node: &Node, column_key: &str) -> String {
        self.cells
            .entry(node.key().to_owned())
            .or_default()
            .entry(column_key.to_owned())
            .or_insert_with(|| node.payload().get(column_key).map(format_value).unwrap_or_default())
            .clone()
    }

    /// Drops the row list; cell text is kept.
    ///
    /// This should be called when a node is expanded or collapsed, or a
    /// fetch starts or finishes.
    pub fn invalidate_rows(&mut self) {
        self.rows = None;
    }

    /// Drops the row list and the cell text of `keys`.
    pub fn invalidate_keys(&mut self, keys: &[RecordKey]) {
        self.rows = None;
        for key in keys {
            self.cells.remove(key);
        }
    }

    /// Invalidates all cached data.
    ///
    /// This should be called whenever a new search result replaces the forest.
    pub fn invalidate(&mut self) {
        self.rows = None;
        self.cells.clear();
    }

    pub fn cached_cell_keys(&self) -> usize {
        self.cells.len()
    }
}

impl Default for RowCache {
    fn default() -> Self {
        Self::new()
    }
}
