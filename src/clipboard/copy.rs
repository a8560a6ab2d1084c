use super::tree::{PathSignature, PreprocessorTree, TreeNode};
use super::{BranchRef, DecisionPointRef, ProcessClipboardData, SENTINEL_END_ID};
use crate::error::ClipboardError;
use crate::model::{DecisionBranchDestinationLink, Link, ProcessGraph, ShapeId, ShapeKind};
use crate::scope::get_scope;
use ahash::AHashSet;
use itertools::Itertools;

/// Builds the clipboard payload for a selection.
///
/// User tasks bring their system shapes along, user decisions are copied as they are, and
/// everything else in the selection is ignored. The payload lists the chain head first and
/// the remaining shapes in canonical position order. The result does not reference the source
/// graph's merge records: merge points are recomputed from the copied topology.
pub fn build_clipboard_data(
    graph: &ProcessGraph,
    selection: &[ShapeId],
) -> Result<ProcessClipboardData, ClipboardError> {
    let ordered = expand_selection(graph, selection);
    if ordered.is_empty() {
        return Err(ClipboardError::EmptySelection);
    }
    let tree = PreprocessorTree::build(graph, &ordered);
    log::debug!(
        "copying {} shapes in {} component(s)",
        tree.nodes().len(),
        tree.sub_tree_count()
    );

    let selected: AHashSet<ShapeId> = ordered.iter().copied().collect();
    let head = tree.chain_head().ok_or(ClipboardError::EmptySelection)?;
    let mut data = ProcessClipboardData {
        shapes: std::iter::once(head)
            .chain(ordered.iter().copied().filter(|&id| id != head))
            .filter_map(|id| graph.shape(id).cloned())
            .collect(),
        is_pastable_after_user_decision: graph.kind_of(head) == Some(ShapeKind::UserTask),
        ..Default::default()
    };

    for node in tree.nodes() {
        for (edge, &destination_id) in node.edges.iter().zip(&node.next_ids) {
            data.links.push(Link::branch(
                node.id,
                destination_id,
                edge.order_index,
                edge.label.clone(),
            ));
        }
        if !node.kind.is_decision() || node.edges.len() < 2 {
            continue;
        }

        for (edge, &branch_start) in node.edges.iter().zip(&node.next_ids).skip(1) {
            let destination_id = find_merge(&tree, node, branch_start);
            data.decision_branch_destination_links
                .push(DecisionBranchDestinationLink {
                    decision_id: node.id,
                    order_index: edge.order_index,
                    destination_id,
                });
        }

        let targets_selected = node
            .edges
            .iter()
            .any(|edge| edge.target.is_some_and(|t| selected.contains(&t)));
        if targets_selected {
            data.decision_points.push(DecisionPointRef {
                decision_id: node.id,
                branches: node
                    .edges
                    .iter()
                    .zip(&node.next_ids)
                    .map(|(edge, &destination_id)| BranchRef {
                        order_index: edge.order_index,
                        label: edge.label.clone(),
                        destination_id,
                    })
                    .collect(),
            });
        }
    }

    Ok(data)
}

/// Selected shapes plus their dependent system shapes, in canonical position order.
fn expand_selection(graph: &ProcessGraph, selection: &[ShapeId]) -> Vec<ShapeId> {
    let mut expanded: AHashSet<ShapeId> = AHashSet::new();
    for &id in selection {
        match graph.kind_of(id) {
            Some(ShapeKind::UserTask) => {
                expanded.extend(get_scope(graph, id).shape_ids().iter().copied());
            }
            Some(ShapeKind::UserDecision) => {
                expanded.insert(id);
            }
            Some(
                ShapeKind::SystemTask
                | ShapeKind::SystemDecision
                | ShapeKind::Start
                | ShapeKind::Precondition
                | ShapeKind::End,
            )
            | None => {}
        }
    }

    expanded
        .into_iter()
        .filter_map(|id| graph.shape(id))
        .sorted_by(|a, b| {
            a.position_key()
                .total_cmp(&b.position_key())
                .then(a.id.cmp(&b.id))
        })
        .map(|shape| shape.id)
        .collect()
}

/// Where the branch starting at `branch_start` rejoins the decision's default path.
///
/// The default path is recorded as a [`PathSignature`]; the branch is then walked along
/// its own default links until it meets that signature, the end sentinel, the decision
/// itself, or a shape from which the decision is reached again.
fn find_merge(tree: &PreprocessorTree, decision: &TreeNode, branch_start: ShapeId) -> ShapeId {
    let default_path = decision
        .default_next()
        .map(|first| PathSignature::along_default(tree, first));

    let mut seen = AHashSet::new();
    let mut current = branch_start;
    loop {
        if current == SENTINEL_END_ID || current == decision.id {
            return current;
        }
        if default_path.as_ref().is_some_and(|path| path.contains(current)) {
            return current;
        }
        if PathSignature::along_default(tree, current).contains(decision.id) {
            return current;
        }
        if !seen.insert(current) {
            return SENTINEL_END_ID;
        }
        match tree.node(current).and_then(TreeNode::default_next) {
            Some(next) => current = next,
            None => return SENTINEL_END_ID,
        }
    }
}
