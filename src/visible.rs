//! Flattening a forest into the rows a tree panel draws.
//!
//! Only children of expanded nodes are visited. Each row carries the branch
//! context needed to draw connector lines and the state of its expand
//! affordance, so the renderer never has to look at the forest again.

use std::collections::HashSet;
use std::sync::Arc;

use crate::forest::{Children, Forest, Node};
use crate::traits::RecordKey;

/// State of the expand/collapse control of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// Known leaf: loaded without children, or flagged `hasChildren: false`.
    Leaf,
    Collapsed,
    Expanded,
    /// A child fetch is outstanding.
    Loading,
}

/// One visible row of a tree panel.
#[derive(Debug, Clone)]
pub struct VisibleRow {
    pub node: Arc<Node>,
    pub row_index: usize,
    pub depth: usize,
    /// For each ancestor level, whether more siblings follow below it.
    pub branch_context: Vec<bool>,
    /// Whether this is the last child of its parent
    pub is_last_child: bool,
    pub affordance: Affordance,
}

impl VisibleRow {
    pub fn key(&self) -> &str {
        self.node.key()
    }
}

/// Depth-first flattening of `forest`, descending only into expanded nodes.
pub fn visible_rows(
    forest: &Forest,
    expanded: &HashSet<RecordKey>,
    pending: &HashSet<RecordKey>,
) -> Vec<VisibleRow> {
    struct Frame<'a> {
        node: &'a Arc<Node>,
        depth: usize,
        branch_context: Vec<bool>,
        is_last_child: bool,
    }

    let roots = forest.roots();
    let mut stack: Vec<Frame<'_>> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(i, node)| Frame {
            node,
            depth: 0,
            branch_context: Vec::new(),
            is_last_child: i + 1 == roots.len(),
        })
        .collect();

    let mut rows = Vec::new();
    while let Some(frame) = stack.pop() {
        let node = frame.node;
        let is_expanded = expanded.contains(node.key());
        let affordance = if pending.contains(node.key()) {
            Affordance::Loading
        } else if !node.is_expandable() {
            Affordance::Leaf
        } else if is_expanded {
            Affordance::Expanded
        } else {
            Affordance::Collapsed
        };

        if is_expanded {
            if let Children::Loaded(children) = node.children() {
                let mut context = frame.branch_context.clone();
                context.push(!frame.is_last_child);
                for (i, child) in children.iter().enumerate().rev() {
                    stack.push(Frame {
                        node: child,
                        depth: frame.depth + 1,
                        branch_context: context.clone(),
                        is_last_child: i + 1 == children.len(),
                    });
                }
            }
        }

        rows.push(VisibleRow {
            node: Arc::clone(node),
            row_index: rows.len(),
            depth: frame.depth,
            branch_context: frame.branch_context,
            is_last_child: frame.is_last_child,
            affordance,
        });
    }
    rows
}

/// Number of rows [`visible_rows`] would produce, without allocating them.
pub fn visible_count(forest: &Forest, expanded: &HashSet<RecordKey>) -> usize {
    let mut count = 0;
    let mut stack: Vec<&Arc<Node>> = forest.roots().iter().collect();
    while let Some(node) = stack.pop() {
        count += 1;
        if expanded.contains(node.key()) {
            stack.extend(node.loaded_children());
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::build;
    use crate::record::Record;

    fn keys(rows: &[VisibleRow]) -> Vec<&str> {
        rows.iter().map(|r| r.key()).collect()
    }

    fn set(keys: &[&str]) -> HashSet<RecordKey> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn sample() -> Forest {
        build(&[
            Record::new("a", None),
            Record::new("a1", Some("a")),
            Record::new("a2", Some("a")),
            Record::new("a2x", Some("a2")),
            Record::new("b", None).with_has_children(true),
            Record::new("c", None).with_children(vec![]),
        ])
    }

    #[test]
    fn test_collapsed_forest_shows_roots() {
        let rows = visible_rows(&sample(), &HashSet::new(), &HashSet::new());
        assert_eq!(keys(&rows), vec!["a", "b", "c"]);
        assert_eq!(rows[0].affordance, Affordance::Collapsed);
        assert_eq!(rows[1].affordance, Affordance::Collapsed);
        assert_eq!(rows[2].affordance, Affordance::Leaf);
        assert!(rows[2].is_last_child);
    }

    #[test]
    fn test_expanded_rows_in_depth_first_order() {
        let forest = sample();
        let rows = visible_rows(&forest, &set(&["a", "a2"]), &HashSet::new());
        assert_eq!(keys(&rows), vec!["a", "a1", "a2", "a2x", "b", "c"]);
        assert_eq!(rows[3].depth, 2);
        assert_eq!(rows[3].branch_context, vec![true, false]);
        assert!(rows[2].is_last_child);
        assert_eq!(rows[2].affordance, Affordance::Expanded);
        assert!(rows.iter().enumerate().all(|(i, r)| r.row_index == i));
        assert_eq!(visible_count(&forest, &set(&["a", "a2"])), rows.len());
    }

    #[test]
    fn test_expanded_but_unloaded_shows_no_children() {
        let rows = visible_rows(&sample(), &set(&["b"]), &set(&["b"]));
        assert_eq!(keys(&rows), vec!["a", "b", "c"]);
        assert_eq!(rows[1].affordance, Affordance::Loading);
    }
}
