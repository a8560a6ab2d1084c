use super::{SENTINEL_END_ID, SENTINEL_START_ID};
use crate::model::{ProcessGraph, ShapeId, ShapeKind};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use std::fmt;

/// Coarse classification of a copied shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Task,
    System,
    Decision,
    Boundary,
}

impl From<ShapeKind> for NodeTag {
    fn from(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::UserTask => NodeTag::Task,
            ShapeKind::SystemTask => NodeTag::System,
            ShapeKind::UserDecision | ShapeKind::SystemDecision => NodeTag::Decision,
            ShapeKind::Start | ShapeKind::Precondition | ShapeKind::End => NodeTag::Boundary,
        }
    }
}

/// One outgoing link of a copied shape. `target` is `None` when the link leaves the
/// selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEdge {
    pub order_index: i32,
    pub label: Option<String>,
    pub target: Option<ShapeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub tag: NodeTag,
    /// First predecessor inside the selection, or the stitching predecessor.
    pub prev_id: Option<ShapeId>,
    /// Some predecessor lies outside the selection.
    pub entered_from_outside: bool,
    /// Successors after stitching, by branch order. Open ends lead to the next component
    /// or to [`SENTINEL_END_ID`].
    pub next_ids: Vec<ShapeId>,
    pub edges: Vec<TreeEdge>,
    pub sub_tree_id: usize,
}

impl TreeNode {
    pub fn default_next(&self) -> Option<ShapeId> {
        self.next_ids.first().copied()
    }
}

/// Selected shapes in canonical position order, grouped into connected components and
/// stitched into one chain.
#[derive(Debug, Clone, Default)]
pub struct PreprocessorTree {
    nodes: Vec<TreeNode>,
    index: AHashMap<ShapeId, usize>,
    heads: Vec<ShapeId>,
}

impl PreprocessorTree {
    /// Builds and stitches the tree. `ordered_ids` must already be in canonical order.
    pub fn build(graph: &ProcessGraph, ordered_ids: &[ShapeId]) -> Self {
        let selected: AHashSet<ShapeId> = ordered_ids.iter().copied().collect();
        let mut tree = PreprocessorTree::default();

        for &id in ordered_ids {
            let Some(shape) = graph.shape(id) else {
                continue;
            };
            let edges = graph
                .outgoing(id)
                .into_iter()
                .map(|l| TreeEdge {
                    order_index: l.order_index,
                    label: l.label.clone(),
                    target: selected.contains(&l.destination_id).then_some(l.destination_id),
                })
                .collect();
            let predecessors = graph.previous_ids(id);
            let prev_id = predecessors
                .iter()
                .copied()
                .find(|prev| selected.contains(prev));
            let entered_from_outside = predecessors.iter().any(|prev| !selected.contains(prev));
            tree.index.insert(id, tree.nodes.len());
            tree.nodes.push(TreeNode {
                id,
                kind: shape.kind,
                tag: NodeTag::from(shape.kind),
                prev_id,
                entered_from_outside,
                next_ids: Vec::new(),
                edges,
                sub_tree_id: 0,
            });
        }

        tree.assign_sub_trees();
        tree.stitch();
        tree
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, id: ShapeId) -> Option<&TreeNode> {
        self.index.get(&id).map(|&slot| &self.nodes[slot])
    }

    /// Head of every component, in component order.
    pub fn heads(&self) -> &[ShapeId] {
        &self.heads
    }

    /// The shape the stitched chain is entered through.
    pub fn chain_head(&self) -> Option<ShapeId> {
        self.heads.first().copied()
    }

    pub fn sub_tree_count(&self) -> usize {
        self.heads.len()
    }

    /// Union-find over the links inside the selection. Components are numbered by the
    /// canonical position of their first member.
    fn assign_sub_trees(&mut self) {
        let mut parent: Vec<usize> = (0..self.nodes.len()).collect();

        fn find(parent: &mut [usize], mut slot: usize) -> usize {
            while parent[slot] != slot {
                parent[slot] = parent[parent[slot]];
                slot = parent[slot];
            }
            slot
        }

        for slot in 0..self.nodes.len() {
            let targets: Vec<usize> = self.nodes[slot]
                .edges
                .iter()
                .filter_map(|edge| edge.target)
                .filter_map(|target| self.index.get(&target).copied())
                .collect();
            for target in targets {
                let (a, b) = (find(&mut parent, slot), find(&mut parent, target));
                if a != b {
                    parent[a.max(b)] = a.min(b);
                }
            }
        }

        let mut numbering: AHashMap<usize, usize> = AHashMap::new();
        for slot in 0..self.nodes.len() {
            let root = find(&mut parent, slot);
            let next = numbering.len();
            self.nodes[slot].sub_tree_id = *numbering.entry(root).or_insert(next);
        }
    }

    /// Resolves open ends: component `i` continues at the head of component `i + 1`,
    /// the last one at the end sentinel. The first head follows the start sentinel.
    fn stitch(&mut self) {
        let component_count = self
            .nodes
            .iter()
            .map(|node| node.sub_tree_id + 1)
            .max()
            .unwrap_or(0);

        self.heads = (0..component_count)
            .filter_map(|component| self.component_head(component))
            .collect();

        let mut stitched_prev: Vec<(ShapeId, ShapeId)> = Vec::new();
        for node in &mut self.nodes {
            let continuation = self
                .heads
                .get(node.sub_tree_id + 1)
                .copied()
                .unwrap_or(SENTINEL_END_ID);
            node.next_ids = node
                .edges
                .iter()
                .map(|edge| edge.target.unwrap_or(continuation))
                .collect();
            if continuation != SENTINEL_END_ID && node.edges.iter().any(|e| e.target.is_none()) {
                stitched_prev.push((continuation, node.id));
            }
        }

        for (head, prev) in stitched_prev {
            if let Some(&slot) = self.index.get(&head) {
                self.nodes[slot].prev_id.get_or_insert(prev);
            }
        }
        if let Some(&slot) = self.heads.first().and_then(|head| self.index.get(head)) {
            self.nodes[slot].prev_id = Some(SENTINEL_START_ID);
        }
    }

    /// Entry of a component: among the members without a selected predecessor (or, when
    /// a loop leaves none, the members entered from outside) the one reaching the most
    /// members. Ties go to the earlier canonical position.
    fn component_head(&self, component: usize) -> Option<ShapeId> {
        let members = || self.nodes.iter().filter(move |n| n.sub_tree_id == component);
        let unpreceded: Vec<&TreeNode> = members().filter(|n| n.prev_id.is_none()).collect();
        let candidates = if unpreceded.is_empty() {
            members().filter(|n| n.entered_from_outside).collect_vec()
        } else {
            unpreceded
        };
        let candidates = if candidates.is_empty() {
            members().collect_vec()
        } else {
            candidates
        };

        let mut best: Option<(usize, ShapeId)> = None;
        for node in candidates {
            let reach = self.reach_count(node.id);
            if best.is_none_or(|(most, _)| reach > most) {
                best = Some((reach, node.id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Number of tree nodes reachable from `from` over links inside the selection.
    fn reach_count(&self, from: ShapeId) -> usize {
        let mut seen = AHashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.node(id) {
                stack.extend(node.edges.iter().filter_map(|edge| edge.target));
            }
        }
        seen.len()
    }
}

/// The walk along lowest-order links from a node, recorded as `*id*next*...*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSignature {
    segments: String,
    nodes: Vec<ShapeId>,
}

impl PathSignature {
    /// Follows stitched default links from `from` until the end sentinel or a repeat.
    pub fn along_default(tree: &PreprocessorTree, from: ShapeId) -> Self {
        let mut signature = PathSignature {
            segments: String::from("*"),
            nodes: Vec::new(),
        };
        let mut current = Some(from);
        while let Some(id) = current {
            if signature.contains(id) {
                break;
            }
            signature.push(id);
            current = tree.node(id).and_then(TreeNode::default_next);
        }
        signature
    }

    fn push(&mut self, id: ShapeId) {
        self.segments.push_str(&id.to_string());
        self.segments.push('*');
        self.nodes.push(id);
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.segments.contains(&format!("*{}*", id))
    }

    pub fn nodes(&self) -> &[ShapeId] {
        &self.nodes
    }
}

impl fmt::Display for PathSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Link, Shape};

    fn graph() -> ProcessGraph {
        let mut graph = ProcessGraph::new(1, 1);
        for (id, kind) in [
            (1, ShapeKind::Precondition),
            (2, ShapeKind::UserTask),
            (3, ShapeKind::SystemTask),
            (4, ShapeKind::UserTask),
            (5, ShapeKind::SystemTask),
            (6, ShapeKind::UserTask),
            (7, ShapeKind::SystemTask),
            (8, ShapeKind::End),
        ] {
            graph.add_shape(Shape::new(id, kind, kind.to_string()));
        }
        for id in 1..8 {
            graph.add_link(Link::new(id, id + 1));
        }
        graph
    }

    #[test]
    fn disjoint_selections_are_stitched_in_order() {
        let graph = graph();
        let tree = PreprocessorTree::build(&graph, &[2, 3, 6, 7]);
        assert_eq!(tree.sub_tree_count(), 2);
        assert_eq!(tree.heads(), &[2, 6]);
        assert_eq!(tree.node(3).map(|n| n.next_ids.clone()), Some(vec![6]));
        assert_eq!(tree.node(7).map(|n| n.next_ids.clone()), Some(vec![SENTINEL_END_ID]));
        assert_eq!(tree.node(2).and_then(|n| n.prev_id), Some(SENTINEL_START_ID));
        assert_eq!(tree.node(6).and_then(|n| n.prev_id), Some(3));
        assert_eq!(tree.node(7).map(|n| n.sub_tree_id), Some(1));
    }

    #[test]
    fn looped_component_is_entered_where_the_flow_comes_in() {
        let mut graph = graph();
        graph.add_link(Link::branch(5, 2, 1, None));
        let tree = PreprocessorTree::build(&graph, &[2, 3, 4, 5]);
        assert_eq!(tree.sub_tree_count(), 1);
        assert_eq!(tree.chain_head(), Some(2));
        assert_eq!(tree.node(2).and_then(|n| n.prev_id), Some(SENTINEL_START_ID));
        assert!(tree.node(2).is_some_and(|n| n.entered_from_outside));
        assert!(!tree.node(4).is_some_and(|n| n.entered_from_outside));
    }

    #[test]
    fn path_signature_lists_the_default_walk() {
        let graph = graph();
        let tree = PreprocessorTree::build(&graph, &[2, 3, 4, 5]);
        let signature = PathSignature::along_default(&tree, 2);
        assert_eq!(signature.to_string(), format!("*2*3*4*5*{}*", SENTINEL_END_ID));
        assert!(signature.contains(4));
        assert!(!signature.contains(6));
    }
}
