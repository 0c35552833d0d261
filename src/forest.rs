//! Immutable forest of record nodes and the flat-to-tree builder.
//!
//! A [`Forest`] is a cheap-to-clone value. Nodes are reference counted so an
//! update rebuilds only the path from a root to the changed node and shares
//! every other subtree with the previous forest.

use std::collections::HashMap;
use std::sync::Arc;

use crate::record::{Payload, Record};
use crate::traits::RecordKey;

/// One hierarchical record plus its (possibly not yet loaded) children.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    key: RecordKey,
    parent_key: Option<RecordKey>,
    payload: Arc<Payload>,
    has_children: Option<bool>,
    /// `None` = not loaded yet, `Some(empty)` = loaded without children
    children: Option<Vec<Arc<Node>>>,
}

/// Read view of a node's children that keeps "unknown" distinct from "empty".
#[derive(Debug, Clone, Copy)]
pub enum Children<'a> {
    Unknown,
    Loaded(&'a [Arc<Node>]),
}

impl Node {
    pub(crate) fn from_record(record: Record, parent_key: Option<RecordKey>) -> Self {
        Self {
            key: record.id,
            parent_key,
            payload: Arc::new(record.payload),
            has_children: record.has_children,
            children: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Payload attribute rendered as display text (strings without quotes).
    pub fn attr_text(&self, name: &str) -> Option<String> {
        self.payload.get(name).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    /// Server hint carried over from the record.
    pub fn has_children_hint(&self) -> Option<bool> {
        self.has_children
    }

    /// True once the children of this node are known (possibly empty).
    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> Children<'_> {
        match &self.children {
            Some(children) => Children::Loaded(children),
            None => Children::Unknown,
        }
    }

    /// Loaded children, or an empty slice while unknown.
    pub fn loaded_children(&self) -> &[Arc<Node>] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Whether the node should offer an expand affordance.
    ///
    /// Unknown children are expandable unless the server said the record
    /// is a leaf; loaded children are expandable only when non-empty.
    pub fn is_expandable(&self) -> bool {
        match &self.children {
            Some(children) => !children.is_empty(),
            None => self.has_children != Some(false),
        }
    }

    pub(crate) fn set_parent_key(&mut self, parent_key: Option<RecordKey>) {
        self.parent_key = parent_key;
    }

    /// Copy of this node with `children` as its loaded children.
    pub(crate) fn with_children(&self, children: Vec<Arc<Node>>) -> Node {
        Node {
            key: self.key.clone(),
            parent_key: self.parent_key.clone(),
            payload: Arc::clone(&self.payload),
            has_children: self.has_children,
            children: Some(children),
        }
    }
}

/// Ordered sequence of root nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    roots: Vec<Arc<Node>>,
}

impl Forest {
    pub fn new(roots: Vec<Arc<Node>>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[Arc<Node>] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first search for `key`.
    pub fn find(&self, key: &str) -> Option<&Arc<Node>> {
        let mut stack: Vec<&Arc<Node>> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.key == key {
                return Some(node);
            }
            stack.extend(node.loaded_children().iter().rev());
        }
        None
    }

    /// Sibling-index path from the root sequence down to `key`.
    pub fn path_to(&self, key: &str) -> Option<Vec<usize>> {
        fn walk(nodes: &[Arc<Node>], key: &str, path: &mut Vec<usize>) -> bool {
            for (index, node) in nodes.iter().enumerate() {
                path.push(index);
                if node.key == key || walk(node.loaded_children(), key, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        walk(&self.roots, key, &mut path).then_some(path)
    }

    /// Total number of nodes currently materialized.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&Arc<Node>> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.loaded_children());
        }
        count
    }

    /// Keys in depth-first pre-order, the order a fully expanded tree shows.
    pub fn keys_depth_first(&self) -> Vec<RecordKey> {
        let mut keys = Vec::new();
        let mut stack: Vec<&Arc<Node>> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            keys.push(node.key.clone());
            stack.extend(node.loaded_children().iter().rev());
        }
        keys
    }
}

/// Builds a forest from flat parent-referencing records.
///
/// - Root order and sibling order follow input order exactly.
/// - A record whose parent is unknown, or is the record itself, becomes a root.
/// - Records embedding `children` have those children linked beneath them
///   and count as loaded even when the embedded list is empty.
/// - Parent chains that loop back on themselves are broken: the first
///   record of the loop in input order becomes a root.
///
/// Duplicate ids keep their first occurrence; later duplicates are dropped.
pub fn build(records: &[Record]) -> Forest {
    let flat = flatten_records(records);

    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(flat.len());
    let mut kept = Vec::with_capacity(flat.len());
    for (i, entry) in flat.iter().enumerate() {
        if index_of.contains_key(entry.record.id.as_str()) {
            tracing::warn!(key = %entry.record.id, "duplicate record id dropped");
            continue;
        }
        index_of.insert(entry.record.id.as_str(), i);
        kept.push(i);
    }

    // Pass one: resolve parent links by index.
    let mut parent_of: Vec<Option<usize>> = vec![None; flat.len()];
    for &i in &kept {
        let entry = &flat[i];
        parent_of[i] = entry
            .parent_id
            .as_deref()
            .filter(|parent| *parent != entry.record.id)
            .and_then(|parent| index_of.get(parent).copied());
    }
    break_cycles(&kept, &mut parent_of, &flat);

    // Pass two: attach in input order.
    let mut child_lists: Vec<Option<Vec<usize>>> = flat
        .iter()
        .map(|entry| entry.eager.then(Vec::new))
        .collect();
    let mut roots = Vec::new();
    for &i in &kept {
        match parent_of[i] {
            Some(parent) => child_lists[parent].get_or_insert_with(Vec::new).push(i),
            None => roots.push(i),
        }
    }

    let mut built: Vec<Option<Arc<Node>>> = vec![None; flat.len()];
    for &i in post_order(&roots, &child_lists).iter() {
        let entry = &flat[i];
        let parent_key = parent_of[i].map(|p| flat[p].record.id.clone());
        let mut node = Node::from_record(entry.record.clone(), parent_key);
        node.children = child_lists[i].as_ref().map(|children| {
            children
                .iter()
                .filter_map(|&c| built[c].take())
                .collect()
        });
        built[i] = Some(Arc::new(node));
    }

    Forest::new(roots.iter().filter_map(|&r| built[r].take()).collect())
}

struct FlatEntry {
    /// Record with embedded children stripped.
    record: Record,
    /// Effective parent id (embedded children point at their container).
    parent_id: Option<RecordKey>,
    /// The service embedded a children list for this record.
    eager: bool,
}

fn flatten_records(records: &[Record]) -> Vec<FlatEntry> {
    let mut flat = Vec::with_capacity(records.len());
    let mut stack: Vec<(&Record, Option<&str>)> =
        records.iter().rev().map(|r| (r, None)).collect();

    while let Some((record, container)) = stack.pop() {
        let mut stripped = record.clone();
        let embedded = stripped.children.take();
        let parent_id = container
            .map(str::to_owned)
            .or_else(|| record.parent_id.clone());
        flat.push(FlatEntry {
            record: stripped,
            parent_id,
            eager: embedded.is_some(),
        });
        if let Some(children) = &record.children {
            stack.extend(children.iter().rev().map(|c| (c, Some(record.id.as_str()))));
        }
    }
    flat
}

/// Detaches one member of every parent loop so each chain ends at a root.
fn break_cycles(kept: &[usize], parent_of: &mut [Option<usize>], flat: &[FlatEntry]) {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parent_of.len()];
    for &start in kept {
        let mut path: Vec<usize> = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::OnPath => {
                    // `i` closes a loop; detach the loop member seen first in input.
                    let loop_start = path.iter().position(|&p| p == i).unwrap_or(0);
                    if let Some(&first) = path[loop_start..].iter().min() {
                        tracing::warn!(
                            key = %flat[first].record.id,
                            "parent cycle detected, treating record as root"
                        );
                        parent_of[first] = None;
                    }
                    break;
                }
                Mark::Unvisited => {
                    marks[i] = Mark::OnPath;
                    path.push(i);
                    current = parent_of[i];
                }
            }
        }
        for i in path {
            marks[i] = Mark::Done;
        }
    }
}

/// Children-before-parents order over the linked tree, without recursion.
fn post_order(roots: &[usize], child_lists: &[Option<Vec<usize>>]) -> Vec<usize> {
    let mut order = Vec::with_capacity(child_lists.len());
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
    while let Some((i, expanded)) = stack.pop() {
        if expanded {
            order.push(i);
            continue;
        }
        stack.push((i, true));
        if let Some(children) = &child_lists[i] {
            stack.extend(children.iter().rev().map(|&c| (c, false)));
        }
    }
    order
}
