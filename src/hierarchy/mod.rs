//! Tree index over parent-referencing records (companies, menus).
//!
//! Records arrive from the backend either flat (`parent_id` only) or
//! pre-nested (`children`). Both are normalized into one adjacency map that
//! answers flattening, descendant and ancestor queries. Structural problems
//! in the data never abort a query: they are collected as [`IntegrityIssue`]s
//! and the affected nodes are left out of traversals.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::errors::AppError;

/// A record that references its parent by id.
pub trait HierarchyNode: Sized {
    fn id(&self) -> i64;

    fn parent_id(&self) -> Option<i64>;

    /// Sibling ordering key. Records without one sort after those with one.
    fn order_no(&self) -> Option<i32> {
        None
    }

    fn set_parent_id(&mut self, parent_id: Option<i64>);

    /// Detach pre-nested children, if the record carries any.
    fn take_children(&mut self) -> Vec<Self> {
        Vec::new()
    }
}

/// What is wrong with a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// A second record with an id already seen; the first one wins.
    DuplicateId,
    /// `parent_id` names a record that is not in the index; treated as a root.
    DanglingParent { parent_id: i64 },
    /// `parent_id` equals the node's own id; treated as a root.
    SelfParent,
    /// The node sits on a parent cycle and cannot be reached from any root.
    Cycle,
    /// The node hangs below a cycle and cannot be reached from any root.
    BelowCycle,
}

/// A structural problem attached to one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntegrityIssue {
    pub node_id: i64,
    #[serde(flatten)]
    pub kind: IssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    UnknownNode(i64),
    /// Walking up from `node_id` came back to a node already on the path.
    CycleDetected { node_id: i64, partial_path: Vec<i64> },
}

impl std::fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HierarchyError::UnknownNode(id) => write!(f, "node {} is not in the hierarchy", id),
            HierarchyError::CycleDetected {
                node_id,
                partial_path,
            } => write!(
                f,
                "parent cycle detected above node {} (path {:?})",
                node_id, partial_path
            ),
        }
    }
}

impl std::error::Error for HierarchyError {}

impl From<HierarchyError> for AppError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::UnknownNode(_) => AppError::NotFound(err.to_string()),
            HierarchyError::CycleDetected { .. } => AppError::Integrity(err.to_string()),
        }
    }
}

/// One node of a flattened traversal with its depth (root = 0).
#[derive(Debug, Clone, Serialize)]
pub struct FlatEntry<'a, T> {
    #[serde(flatten)]
    pub node: &'a T,
    pub level: usize,
}

/// Result of a flattening traversal: what could be visited, plus every
/// structural issue relevant to the traversal.
#[derive(Debug, Clone, Serialize)]
pub struct Flattened<'a, T> {
    pub entries: Vec<FlatEntry<'a, T>>,
    pub issues: Vec<IntegrityIssue>,
}

impl<'a, T> Flattened<'a, T> {
    pub fn ids(&self) -> Vec<i64>
    where
        T: HierarchyNode,
    {
        self.entries.iter().map(|e| e.node.id()).collect()
    }
}

/// Query structure over a hierarchy of `T`.
#[derive(Debug, Clone)]
pub struct TreeIndex<T> {
    nodes: HashMap<i64, T>,
    children: HashMap<i64, Vec<i64>>,
    roots: Vec<i64>,
    issues: Vec<IntegrityIssue>,
}

impl<T: HierarchyNode> TreeIndex<T> {
    /// Build an index from flat or pre-nested records in O(n log n).
    pub fn build(records: Vec<T>) -> Self {
        let mut nodes: HashMap<i64, T> = HashMap::with_capacity(records.len());
        let mut seen_order = Vec::with_capacity(records.len());
        let mut issues = Vec::new();

        // Nested children inherit their parent from the nesting.
        let mut pending: VecDeque<(T, Option<i64>)> =
            records.into_iter().map(|r| (r, None)).collect();
        while let Some((mut record, nested_parent)) = pending.pop_front() {
            if nested_parent.is_some() {
                record.set_parent_id(nested_parent);
            }
            let id = record.id();
            for child in record.take_children() {
                pending.push_back((child, Some(id)));
            }
            if nodes.contains_key(&id) {
                tracing::warn!("Duplicate hierarchy id {}, keeping the first record", id);
                issues.push(IntegrityIssue {
                    node_id: id,
                    kind: IssueKind::DuplicateId,
                });
                continue;
            }
            seen_order.push(id);
            nodes.insert(id, record);
        }

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut roots = Vec::new();
        for id in seen_order {
            match nodes[&id].parent_id() {
                None => roots.push(id),
                Some(parent) if parent == id => {
                    tracing::warn!("Node {} is its own parent, treating it as a root", id);
                    issues.push(IntegrityIssue {
                        node_id: id,
                        kind: IssueKind::SelfParent,
                    });
                    roots.push(id);
                }
                Some(parent) if !nodes.contains_key(&parent) => {
                    tracing::warn!(
                        "Node {} references missing parent {}, treating it as a root",
                        id,
                        parent
                    );
                    issues.push(IntegrityIssue {
                        node_id: id,
                        kind: IssueKind::DanglingParent { parent_id: parent },
                    });
                    roots.push(id);
                }
                Some(parent) => children.entry(parent).or_default().push(id),
            }
        }

        let mut index = Self {
            nodes,
            children,
            roots,
            issues,
        };
        index.sort_siblings();
        index.flag_unreachable();
        index
    }

    fn sort_key(&self, id: i64) -> (bool, i32, i64) {
        let order = self.nodes.get(&id).and_then(HierarchyNode::order_no);
        (order.is_none(), order.unwrap_or_default(), id)
    }

    fn sort_siblings(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by_key(|id| self.sort_key(*id));
        self.roots = roots;

        let mut children = std::mem::take(&mut self.children);
        for siblings in children.values_mut() {
            siblings.sort_by_key(|id| self.sort_key(*id));
        }
        self.children = children;
    }

    /// Nodes not reachable from any root are on, or below, a parent cycle.
    fn flag_unreachable(&mut self) {
        let mut reachable = HashSet::with_capacity(self.nodes.len());
        let mut queue: VecDeque<i64> = self.roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if reachable.insert(id) {
                queue.extend(self.children_of(id).iter().copied());
            }
        }

        let mut unreachable: Vec<i64> = self
            .nodes
            .keys()
            .filter(|id| !reachable.contains(id))
            .copied()
            .collect();
        unreachable.sort_unstable();

        for id in unreachable {
            let kind = if self.on_cycle(id) {
                IssueKind::Cycle
            } else {
                IssueKind::BelowCycle
            };
            tracing::warn!("Node {} is unreachable from any root ({:?})", id, kind);
            self.issues.push(IntegrityIssue { node_id: id, kind });
        }
    }

    fn on_cycle(&self, start: i64) -> bool {
        let mut visited = HashSet::new();
        let mut current = start;
        while let Some(parent) = self.nodes.get(&current).and_then(HierarchyNode::parent_id) {
            if parent == start {
                return true;
            }
            if !visited.insert(parent) {
                return false;
            }
            current = parent;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.nodes.get(&id)
    }

    /// Roots in sibling order.
    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    /// Children of `id` in sibling order.
    pub fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every issue found while building the index.
    pub fn issues(&self) -> &[IntegrityIssue] {
        &self.issues
    }

    /// Depth-first pre-order over the whole forest.
    pub fn flatten(&self) -> Flattened<'_, T> {
        let mut flattened = self.walk(&self.roots);
        let mut issues = self.issues.clone();
        issues.append(&mut flattened.issues);
        flattened.issues = issues;
        flattened
    }

    /// Depth-first pre-order over the subtree rooted at `root_id`, with
    /// levels relative to that root. Unknown roots yield nothing.
    pub fn flatten_from(&self, root_id: i64) -> Flattened<'_, T> {
        if !self.contains(root_id) {
            return Flattened {
                entries: Vec::new(),
                issues: Vec::new(),
            };
        }
        self.walk(&[root_id])
    }

    fn walk(&self, starts: &[i64]) -> Flattened<'_, T> {
        let mut entries = Vec::with_capacity(self.nodes.len());
        let mut issues = Vec::new();
        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut stack: Vec<(i64, usize)> = starts.iter().rev().map(|id| (*id, 0)).collect();

        while let Some((id, level)) = stack.pop() {
            if !visited.insert(id) {
                tracing::warn!("Node {} reached twice during traversal, pruning branch", id);
                issues.push(IntegrityIssue {
                    node_id: id,
                    kind: IssueKind::Cycle,
                });
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            entries.push(FlatEntry { node, level });
            stack.extend(self.children_of(id).iter().rev().map(|c| (*c, level + 1)));
        }

        Flattened { entries, issues }
    }

    /// `root_id` and everything below it, breadth-first. Empty when the root
    /// is not in the index.
    pub fn descendant_ids(&self, root_id: i64) -> BTreeSet<i64> {
        let mut result = BTreeSet::new();
        if !self.contains(root_id) {
            return result;
        }
        let mut queue = VecDeque::from([root_id]);
        while let Some(id) = queue.pop_front() {
            if result.insert(id) {
                queue.extend(self.children_of(id).iter().copied());
            }
        }
        result
    }

    /// Ids from the topmost ancestor down to `node_id`. A dangling parent
    /// ends the walk as if it were a root.
    pub fn ancestor_path(&self, node_id: i64) -> Result<Vec<i64>, HierarchyError> {
        let mut current = self
            .nodes
            .get(&node_id)
            .ok_or(HierarchyError::UnknownNode(node_id))?;
        let mut path = vec![node_id];
        let mut visited = HashSet::from([node_id]);

        while let Some(parent_id) = current.parent_id() {
            let Some(parent) = self.nodes.get(&parent_id) else {
                break;
            };
            if !visited.insert(parent_id) {
                path.reverse();
                tracing::warn!("Parent cycle above node {}: {:?}", node_id, path);
                return Err(HierarchyError::CycleDetected {
                    node_id,
                    partial_path: path,
                });
            }
            path.push(parent_id);
            current = parent;
        }

        path.reverse();
        Ok(path)
    }

    /// Whether `node_id` is `ancestor_id` or lies below it.
    pub fn is_within(&self, ancestor_id: i64, node_id: i64) -> bool {
        self.descendant_ids(ancestor_id).contains(&node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Node {
        id: i64,
        parent_id: Option<i64>,
        order_no: Option<i32>,
        children: Vec<Node>,
    }

    impl HierarchyNode for Node {
        fn id(&self) -> i64 {
            self.id
        }
        fn parent_id(&self) -> Option<i64> {
            self.parent_id
        }
        fn order_no(&self) -> Option<i32> {
            self.order_no
        }
        fn set_parent_id(&mut self, parent_id: Option<i64>) {
            self.parent_id = parent_id;
        }
        fn take_children(&mut self) -> Vec<Self> {
            std::mem::take(&mut self.children)
        }
    }

    fn node(id: i64, parent_id: Option<i64>) -> Node {
        Node {
            id,
            parent_id,
            order_no: None,
            children: Vec::new(),
        }
    }

    fn ordered(id: i64, parent_id: Option<i64>, order_no: i32) -> Node {
        Node {
            order_no: Some(order_no),
            ..node(id, parent_id)
        }
    }

    fn levels(flattened: &Flattened<'_, Node>) -> Vec<(i64, usize)> {
        flattened
            .entries
            .iter()
            .map(|e| (e.node.id, e.level))
            .collect()
    }

    #[test]
    fn test_flatten_company_scenario() {
        let index = TreeIndex::build(vec![
            node(4, None),
            node(3, Some(2)),
            node(1, None),
            node(2, Some(1)),
        ]);
        let flattened = index.flatten();
        assert_eq!(levels(&flattened), vec![(1, 0), (2, 1), (3, 2), (4, 0)]);
        assert!(flattened.issues.is_empty());
    }

    #[test]
    fn test_flatten_sibling_order_uses_order_no_then_id() {
        let index = TreeIndex::build(vec![
            ordered(10, None, 2),
            ordered(11, Some(10), 5),
            ordered(12, Some(10), 1),
            ordered(13, Some(10), 1),
            node(14, Some(10)),
            ordered(20, None, 1),
        ]);
        let ids = index.flatten().ids();
        assert_eq!(ids, vec![20, 10, 12, 13, 11, 14]);
    }

    #[test]
    fn test_parent_before_descendants() {
        let index = TreeIndex::build(vec![
            node(5, Some(3)),
            node(3, Some(1)),
            node(1, None),
            node(4, Some(1)),
            node(6, Some(4)),
        ]);
        let ids = index.flatten().ids();
        let position = |id: i64| ids.iter().position(|x| *x == id).unwrap();
        for id in [3, 4, 5, 6] {
            let path = index.ancestor_path(id).unwrap();
            for ancestor in &path[..path.len() - 1] {
                assert!(position(*ancestor) < position(id));
            }
        }
    }

    #[test]
    fn test_nested_input_is_normalized() {
        let mut root = node(1, None);
        let mut child = node(2, None);
        child.children.push(node(3, None));
        root.children.push(child);

        let index = TreeIndex::build(vec![root, node(4, None)]);
        assert_eq!(index.len(), 4);
        assert_eq!(index.get(3).unwrap().parent_id, Some(2));
        assert_eq!(
            levels(&index.flatten()),
            vec![(1, 0), (2, 1), (3, 2), (4, 0)]
        );
    }

    #[test]
    fn test_descendant_closure() {
        let index = TreeIndex::build(vec![
            node(1, None),
            node(2, Some(1)),
            node(3, Some(2)),
            node(4, Some(1)),
            node(5, None),
        ]);
        assert_eq!(
            index.descendant_ids(1).into_iter().collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        for id in 1..=5 {
            let own = index.descendant_ids(id);
            assert!(own.contains(&id));
            for child in index.children_of(id) {
                assert!(index.descendant_ids(*child).is_subset(&own));
            }
        }
        assert!(index.descendant_ids(99).is_empty());
    }

    #[test]
    fn test_dangling_parent_becomes_root() {
        let index = TreeIndex::build(vec![node(1, None), node(2, Some(42)), node(3, Some(2))]);
        assert_eq!(index.roots(), &[1, 2]);
        assert_eq!(
            index.issues(),
            &[IntegrityIssue {
                node_id: 2,
                kind: IssueKind::DanglingParent { parent_id: 42 }
            }]
        );
        assert_eq!(index.ancestor_path(3).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_two_node_cycle_terminates_and_is_flagged() {
        let index = TreeIndex::build(vec![
            node(1, None),
            node(10, Some(11)),
            node(11, Some(10)),
            node(12, Some(11)),
        ]);

        let flattened = index.flatten();
        assert_eq!(flattened.ids(), vec![1]);
        let flagged: Vec<(i64, IssueKind)> = flattened
            .issues
            .iter()
            .map(|i| (i.node_id, i.kind))
            .collect();
        assert_eq!(
            flagged,
            vec![
                (10, IssueKind::Cycle),
                (11, IssueKind::Cycle),
                (12, IssueKind::BelowCycle)
            ]
        );

        match index.ancestor_path(12) {
            Err(HierarchyError::CycleDetected {
                node_id,
                partial_path,
            }) => {
                assert_eq!(node_id, 12);
                assert_eq!(partial_path, vec![10, 11, 12]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }

        assert_eq!(
            index.descendant_ids(10).into_iter().collect::<Vec<_>>(),
            vec![10, 11, 12]
        );
    }

    #[test]
    fn test_self_parent() {
        let index = TreeIndex::build(vec![node(7, Some(7)), node(8, Some(7))]);
        assert_eq!(index.flatten().ids(), vec![7, 8]);
        assert_eq!(index.issues()[0].kind, IssueKind::SelfParent);
        assert!(matches!(
            index.ancestor_path(7),
            Err(HierarchyError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut second = node(1, None);
        second.order_no = Some(99);
        let index = TreeIndex::build(vec![node(1, None), second]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(1).unwrap().order_no, None);
        assert_eq!(index.issues()[0].kind, IssueKind::DuplicateId);
    }

    #[test]
    fn test_flatten_from_subtree_levels() {
        let index = TreeIndex::build(vec![
            node(1, None),
            node(2, Some(1)),
            node(3, Some(2)),
            node(4, None),
        ]);
        assert_eq!(levels(&index.flatten_from(2)), vec![(2, 0), (3, 1)]);
        assert!(index.flatten_from(99).entries.is_empty());
    }

    #[test]
    fn test_ancestor_path_unknown_node() {
        let index: TreeIndex<Node> = TreeIndex::build(Vec::new());
        assert_eq!(
            index.ancestor_path(3),
            Err(HierarchyError::UnknownNode(3))
        );
        assert!(index.is_empty());
    }
}
