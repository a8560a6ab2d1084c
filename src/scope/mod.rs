//! Scope analysis: which shapes a shape or a decision branch owns.
//!
//! A user task owns itself and the system shapes that follow it, a decision owns every
//! shape in its non-default branches, and a branch owns the shapes between the decision
//! and the branch's recorded merge point. The walk never fails: on a malformed graph the
//! affected [`ConditionContext`] simply stays open (`target_id == None`).

mod context;
mod traversal;

pub use context::{ConditionContext, ConditionKey, ScopeContext, ShapeInformation};
pub(crate) use traversal::default_chain_reaches;

use crate::model::{Link, ProcessGraph, ShapeId};
use traversal::{StopPolicy, Traversal};

/// Scope of a single shape.
///
/// Unknown ids produce an empty scope.
pub fn get_scope(graph: &ProcessGraph, start_id: ShapeId) -> ScopeContext {
    let Some(kind) = graph.kind_of(start_id) else {
        return ScopeContext {
            id: start_id,
            ..Default::default()
        };
    };
    let previous_id = graph.previous_ids(start_id).first().copied();
    Traversal::new(graph, start_id, StopPolicy::for_kind(kind)).run(previous_id, None)
}

/// Shapes unique to the branch that starts with `link`.
///
/// The traversal is seeded with the branch's merge record, so its first mapping always
/// describes the branch itself. Without a merge record the branch is walked until it
/// runs out of non-terminal shapes.
pub fn get_branch_scope(graph: &ProcessGraph, link: &Link) -> ScopeContext {
    let seed = graph
        .branch_destination(link.source_id, link.order_index)
        .map(|merge_id| (ConditionKey::new(link.source_id, link.order_index), merge_id));
    Traversal::new(graph, link.destination_id, StopPolicy::Branch)
        .run(Some(link.source_id), seed)
}
