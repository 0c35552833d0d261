//! Copy-on-write merge and reference diff over forests.
//!
//! `attach_children` replaces the children of one node by rebuilding only
//! the nodes on its root path; every other subtree keeps its `Arc`.
//! `changed_keys` walks two forests in lockstep and reports the nodes whose
//! subtree is no longer shared, which is what a renderer needs to refresh.

use std::collections::HashSet;
use std::sync::Arc;

use crate::forest::{self, Forest, Node};
use crate::record::Record;
use crate::traits::RecordKey;

/// Normalizes fetched records into child nodes of `parent_key`.
///
/// Every record is re-parented to `parent_key`, whatever its own `parentId`
/// says. Records embedding their own children keep them.
pub fn normalize_children(parent_key: &str, records: Vec<Record>) -> Vec<Arc<Node>> {
    let reparented: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            let is_self = record.id == parent_key;
            if is_self {
                tracing::warn!(key = %parent_key, "child fetch returned the parent itself, dropped");
            }
            !is_self
        })
        .map(|mut record| {
            record.parent_id = None;
            record
        })
        .collect();

    forest::build(&reparented)
        .roots()
        .iter()
        .map(|node| {
            let mut node = Node::clone(node);
            node.set_parent_key(Some(parent_key.to_owned()));
            Arc::new(node)
        })
        .collect()
}

/// Returns a forest where `key` has `children` as its loaded children.
///
/// Only the nodes from the root to `key` are rebuilt. Fetched nodes that
/// repeat a key on that path are dropped with their subtrees, so no node
/// ends up beneath itself. Returns `None` when `key` is not in the forest.
pub fn attach_children(forest: &Forest, key: &str, children: Vec<Arc<Node>>) -> Option<Forest> {
    let path = forest.path_to(key)?;
    let (&root_index, rest) = path.split_first()?;

    let mut ancestors = HashSet::new();
    let mut level = forest.roots();
    for &index in &path {
        let node = level.get(index)?;
        ancestors.insert(node.key());
        level = node.loaded_children();
    }
    let children = prune_ancestors(children, &ancestors);

    let mut roots = forest.roots().to_vec();
    let replaced = rebuild_path(&roots[root_index], rest, children);
    roots[root_index] = replaced;
    Some(Forest::new(roots))
}

fn prune_ancestors(nodes: Vec<Arc<Node>>, ancestors: &HashSet<&str>) -> Vec<Arc<Node>> {
    nodes
        .into_iter()
        .filter_map(|node| {
            if ancestors.contains(node.key()) {
                tracing::warn!(key = %node.key(), "child fetch returned an ancestor, dropped");
                return None;
            }
            if !node.is_loaded() {
                return Some(node);
            }
            let grandchildren = prune_ancestors(node.loaded_children().to_vec(), ancestors);
            if grandchildren.len() == node.loaded_children().len() {
                return Some(node);
            }
            Some(Arc::new(node.with_children(grandchildren)))
        })
        .collect()
}

fn rebuild_path(node: &Arc<Node>, path: &[usize], children: Vec<Arc<Node>>) -> Arc<Node> {
    match path.split_first() {
        None => Arc::new(node.with_children(children)),
        Some((&index, rest)) => {
            let mut siblings = node.loaded_children().to_vec();
            siblings[index] = rebuild_path(&siblings[index], rest, children);
            Arc::new(node.with_children(siblings))
        }
    }
}

/// Keys of nodes whose subtree changed between `before` and `after`.
///
/// Nodes are matched by key at each level. A node that is reference-equal in
/// both forests is skipped with its entire subtree. Nodes added in `after`
/// are reported; nodes only present in `before` are not.
pub fn changed_keys(before: &Forest, after: &Forest) -> Vec<RecordKey> {
    let mut changed = Vec::new();
    diff_level(before.roots(), after.roots(), &mut changed);
    changed
}

fn diff_level(before: &[Arc<Node>], after: &[Arc<Node>], changed: &mut Vec<RecordKey>) {
    for (position, new_node) in after.iter().enumerate() {
        let old_node = before
            .get(position)
            .filter(|old| old.key() == new_node.key())
            .or_else(|| before.iter().find(|old| old.key() == new_node.key()));

        match old_node {
            Some(old) if Arc::ptr_eq(old, new_node) => {}
            Some(old) => {
                changed.push(new_node.key().to_owned());
                diff_level(old.loaded_children(), new_node.loaded_children(), changed);
            }
            None => changed.push(new_node.key().to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::build;

    fn sample() -> Forest {
        build(&[
            Record::new("a", None),
            Record::new("a1", Some("a")),
            Record::new("b", None),
            Record::new("b1", Some("b")),
        ])
    }

    #[test]
    fn test_normalize_reparents() {
        let children = normalize_children(
            "p",
            vec![Record::new("x", Some("other")), Record::new("y", None)],
        );
        let keys: Vec<_> = children.iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert!(children.iter().all(|c| c.parent_key() == Some("p")));
    }

    #[test]
    fn test_normalize_drops_parent_echo() {
        let children = normalize_children("p", vec![Record::new("p", None)]);
        assert!(children.is_empty());
    }

    #[test]
    fn test_attach_shares_untouched_subtrees() {
        let before = sample();
        let after = attach_children(
            &before,
            "a1",
            normalize_children("a1", vec![Record::new("a1x", None)]),
        )
        .unwrap();

        assert!(Arc::ptr_eq(&before.roots()[1], &after.roots()[1]));
        assert!(!Arc::ptr_eq(&before.roots()[0], &after.roots()[0]));
        let a1 = after.find("a1").unwrap();
        assert_eq!(a1.loaded_children()[0].key(), "a1x");
        assert!(before.find("a1").map(|n| !n.is_loaded()).unwrap_or(false));
    }

    #[test]
    fn test_attach_drops_fetched_ancestors() {
        let before = build(&[Record::new("r", None), Record::new("a", Some("r"))]);
        let nested = Record::new("x", None).with_children(vec![Record::new("a", None), Record::new("y", None)]);
        let fetched = normalize_children("a", vec![Record::new("r", None), nested]);

        let after = attach_children(&before, "a", fetched).unwrap();
        assert_eq!(after.keys_depth_first(), vec!["r", "a", "x", "y"]);
    }

    #[test]
    fn test_attach_missing_key() {
        assert!(attach_children(&sample(), "zz", Vec::new()).is_none());
    }

    #[test]
    fn test_changed_keys_follow_path() {
        let before = sample();
        let after = attach_children(&before, "a1", Vec::new()).unwrap();
        assert_eq!(changed_keys(&before, &after), vec!["a", "a1"]);
        assert!(changed_keys(&before, &before.clone()).is_empty());
    }
}
