//! Two-list transfer model.
//!
//! Items live either in the source list or the target list. The user marks
//! items in one list and moves the marked set across. Both lists keep the
//! order the items were originally supplied in, so moving an item back and
//! forth never reshuffles a list.

use std::collections::HashSet;

use crate::forest::Node;
use crate::traits::RecordKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub key: RecordKey,
    pub label: String,
}

impl TransferItem {
    pub fn new(key: impl Into<RecordKey>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    /// Item labelled by a payload attribute, falling back to the key.
    pub fn from_node(node: &Node, label_field: &str) -> Self {
        let label = node
            .attr_text(label_field)
            .unwrap_or_else(|| node.key().to_owned());
        Self::new(node.key(), label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

/// State of one transfer panel.
#[derive(Debug, Clone, Default)]
pub struct TransferList {
    /// Every item, in supply order.
    items: Vec<TransferItem>,
    in_target: HashSet<RecordKey>,
    marked: HashSet<RecordKey>,
}

impl TransferList {
    /// Builds the lists from all candidates and the keys already assigned.
    ///
    /// Assigned keys that are not among the candidates are ignored.
    pub fn new(items: Vec<TransferItem>, assigned: &[RecordKey]) -> Self {
        let mut seen = HashSet::new();
        let items: Vec<TransferItem> = items
            .into_iter()
            .filter(|item| seen.insert(item.key.clone()))
            .collect();
        let in_target = assigned
            .iter()
            .filter(|key| seen.contains(*key))
            .cloned()
            .collect();
        Self {
            items,
            in_target,
            marked: HashSet::new(),
        }
    }

    // ===== Queries =====

    pub fn side_of(&self, key: &str) -> Option<Side> {
        if !self.items.iter().any(|item| item.key == key) {
            return None;
        }
        Some(if self.in_target.contains(key) { Side::Target } else { Side::Source })
    }

    /// Items on `side` whose label contains `query` (case-insensitive).
    pub fn items<'a>(&'a self, side: Side, query: &str) -> impl Iterator<Item = &'a TransferItem> + 'a {
        let query = query.trim().to_lowercase();
        self.items.iter().filter(move |item| {
            let on_side = self.in_target.contains(&item.key) == (side == Side::Target);
            on_side && (query.is_empty() || item.label.to_lowercase().contains(&query))
        })
    }

    pub fn target_keys(&self) -> Vec<RecordKey> {
        self.items(Side::Target, "").map(|item| item.key.clone()).collect()
    }

    pub fn is_marked(&self, key: &str) -> bool {
        self.marked.contains(key)
    }

    /// Number of marked items on `side`.
    pub fn marked_count(&self, side: Side) -> usize {
        self.items(side, "").filter(|item| self.marked.contains(&item.key)).count()
    }

    // ===== Mutations =====

    pub fn toggle_mark(&mut self, key: &str) {
        if !self.marked.remove(key) && self.side_of(key).is_some() {
            self.marked.insert(key.to_owned());
        }
    }

    /// Moves every marked item on the other side onto `to`. Returns the
    /// moved keys in list order.
    pub fn move_marked(&mut self, to: Side) -> Vec<RecordKey> {
        let from = match to {
            Side::Target => Side::Source,
            Side::Source => Side::Target,
        };
        let moved: Vec<RecordKey> = self
            .items(from, "")
            .filter(|item| self.marked.contains(&item.key))
            .map(|item| item.key.clone())
            .collect();
        for key in &moved {
            self.marked.remove(key);
            match to {
                Side::Target => {
                    self.in_target.insert(key.clone());
                }
                Side::Source => {
                    self.in_target.remove(key);
                }
            }
        }
        if !moved.is_empty() {
            tracing::debug!(count = moved.len(), ?to, "transfer items moved");
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> TransferList {
        TransferList::new(
            vec![
                TransferItem::new("u1", "ann"),
                TransferItem::new("u2", "bob"),
                TransferItem::new("u3", "carol"),
                TransferItem::new("u2", "duplicate"),
            ],
            &["u2".to_owned(), "ghost".to_owned()],
        )
    }

    fn keys<'a>(items: impl Iterator<Item = &'a TransferItem>) -> Vec<&'a str> {
        items.map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn test_initial_split() {
        let list = list();
        assert_eq!(keys(list.items(Side::Source, "")), vec!["u1", "u3"]);
        assert_eq!(list.target_keys(), vec!["u2"]);
        assert_eq!(list.side_of("ghost"), None);
    }

    #[test]
    fn test_move_keeps_supply_order() {
        let mut list = list();
        list.toggle_mark("u3");
        list.toggle_mark("u1");
        assert_eq!(list.marked_count(Side::Source), 2);

        let moved = list.move_marked(Side::Target);
        assert_eq!(moved, vec!["u1", "u3"]);
        assert_eq!(list.target_keys(), vec!["u1", "u2", "u3"]);
        assert!(!list.is_marked("u1"));

        list.toggle_mark("u2");
        assert_eq!(list.move_marked(Side::Source), vec!["u2"]);
        assert_eq!(keys(list.items(Side::Source, "")), vec!["u2"]);
    }

    #[test]
    fn test_marks_on_other_side_do_not_move() {
        let mut list = list();
        list.toggle_mark("u2");
        assert!(list.move_marked(Side::Target).is_empty());
        list.toggle_mark("u2");
        assert!(!list.is_marked("u2"));
        list.toggle_mark("nobody");
        assert!(!list.is_marked("nobody"));
    }

    #[test]
    fn test_label_query() {
        let list = list();
        assert_eq!(keys(list.items(Side::Source, " CAR ")), vec!["u3"]);
    }
}
