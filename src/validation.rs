//! Whole-graph invariant checks.
//!
//! The editor keeps these invariants on every operation; this module re-checks a graph
//! from scratch, for loaded files and for tests. All violations are reported, not only
//! the first one.

use crate::config::EditorConfig;
use crate::model::{ProcessGraph, ShapeId, ShapeKind};
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Process has no {0} shape")]
    MissingShape(ShapeKind),

    #[error("Process has {count} {kind} shapes, expected one")]
    DuplicateShape { kind: ShapeKind, count: usize },

    #[error("Link '{source_id}' -> '{destination_id}' references a missing shape")]
    DanglingLink {
        source_id: ShapeId,
        destination_id: ShapeId,
    },

    #[error("Branch record {decision_id}#{order_index} references a missing shape")]
    DanglingBranchDestination {
        decision_id: ShapeId,
        order_index: i32,
    },

    #[error("{kind} '{id}' has {count} outgoing links, expected {expected}")]
    WrongOutgoingCount {
        id: ShapeId,
        kind: ShapeKind,
        count: usize,
        expected: usize,
    },

    #[error("Decision '{decision_id}' has {count} branches, allowed {min}..={max}")]
    BranchCountOutOfRange {
        decision_id: ShapeId,
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("Branch {order_index} of decision '{decision_id}' has {count} merge records")]
    BranchDestinationCount {
        decision_id: ShapeId,
        order_index: i32,
        count: usize,
    },

    #[error("Default branch of decision '{0}' has a merge record")]
    DefaultBranchDestination(ShapeId),

    #[error("Merge record {decision_id}#{order_index} has no matching branch")]
    OrphanBranchDestination {
        decision_id: ShapeId,
        order_index: i32,
    },

    #[error("User task '{0}' is not followed by a system shape")]
    UserTaskWithoutSystemShape(ShapeId),

    #[error("Shape '{0}' is not reachable from Start")]
    UnreachableFromStart(ShapeId),

    #[error("Shape '{0}' cannot reach End")]
    CannotReachEnd(ShapeId),

    #[error("Process has {count} shapes, the limit is {limit}")]
    ShapeLimitExceeded { count: usize, limit: usize },
}

/// Validates a process graph against the editor invariants.
pub fn validate_process(graph: &ProcessGraph, config: &EditorConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_terminals(graph, &mut errors);
    validate_references(graph, &mut errors);
    validate_outgoing(graph, config, &mut errors);
    validate_branch_destinations(graph, &mut errors);
    validate_task_pairs(graph, &mut errors);
    validate_reachability(graph, &mut errors);

    if graph.shape_count() > config.shape_limit {
        errors.push(ValidationError::ShapeLimitExceeded {
            count: graph.shape_count(),
            limit: config.shape_limit,
        });
    }

    errors
}

fn validate_terminals(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    for kind in [ShapeKind::Start, ShapeKind::End] {
        match graph.ids_of_kind(kind).len() {
            0 => errors.push(ValidationError::MissingShape(kind)),
            1 => {}
            count => errors.push(ValidationError::DuplicateShape { kind, count }),
        }
    }
}

fn validate_references(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    for link in graph.links() {
        if !graph.contains(link.source_id) || !graph.contains(link.destination_id) {
            errors.push(ValidationError::DanglingLink {
                source_id: link.source_id,
                destination_id: link.destination_id,
            });
        }
    }
    for entry in graph.branch_destinations() {
        if !graph.contains(entry.decision_id) || !graph.contains(entry.destination_id) {
            errors.push(ValidationError::DanglingBranchDestination {
                decision_id: entry.decision_id,
                order_index: entry.order_index,
            });
        }
    }
}

fn validate_outgoing(
    graph: &ProcessGraph,
    config: &EditorConfig,
    errors: &mut Vec<ValidationError>,
) {
    for shape in graph.shapes() {
        let count = graph.branch_count(shape.id);
        match shape.kind {
            ShapeKind::UserDecision | ShapeKind::SystemDecision => {
                if count < config.min_conditions || count > config.max_conditions {
                    errors.push(ValidationError::BranchCountOutOfRange {
                        decision_id: shape.id,
                        count,
                        min: config.min_conditions,
                        max: config.max_conditions,
                    });
                }
            }
            ShapeKind::End if count != 0 => errors.push(ValidationError::WrongOutgoingCount {
                id: shape.id,
                kind: shape.kind,
                count,
                expected: 0,
            }),
            ShapeKind::End => {}
            ShapeKind::Start
            | ShapeKind::Precondition
            | ShapeKind::UserTask
            | ShapeKind::SystemTask => {
                if count != 1 {
                    errors.push(ValidationError::WrongOutgoingCount {
                        id: shape.id,
                        kind: shape.kind,
                        count,
                        expected: 1,
                    });
                }
            }
        }
    }
}

fn validate_branch_destinations(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    let mut records: AHashMap<(ShapeId, i32), usize> = AHashMap::new();
    for entry in graph.branch_destinations() {
        *records
            .entry((entry.decision_id, entry.order_index))
            .or_default() += 1;
    }

    for shape in graph.shapes().filter(|s| s.kind.is_decision()) {
        for link in graph.outgoing(shape.id) {
            let count = records
                .get(&(shape.id, link.order_index))
                .copied()
                .unwrap_or(0);
            if link.is_default() {
                if count > 0 {
                    errors.push(ValidationError::DefaultBranchDestination(shape.id));
                }
            } else if count != 1 {
                errors.push(ValidationError::BranchDestinationCount {
                    decision_id: shape.id,
                    order_index: link.order_index,
                    count,
                });
            }
        }
    }

    for entry in graph.branch_destinations() {
        let orphaned = entry.order_index != 0
            && graph.contains(entry.decision_id)
            && graph.branch_link(entry.decision_id, entry.order_index).is_none();
        if orphaned {
            errors.push(ValidationError::OrphanBranchDestination {
                decision_id: entry.decision_id,
                order_index: entry.order_index,
            });
        }
    }
}

fn validate_task_pairs(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    for id in graph.ids_of_kind(ShapeKind::UserTask) {
        let followed_by_system = graph
            .default_successor(id)
            .and_then(|next| graph.kind_of(next))
            .is_some_and(ShapeKind::is_system);
        if !followed_by_system {
            errors.push(ValidationError::UserTaskWithoutSystemShape(id));
        }
    }
}

fn validate_reachability(graph: &ProcessGraph, errors: &mut Vec<ValidationError>) {
    let (Some(start_id), Some(end_id)) = (graph.start_id(), graph.end_id()) else {
        return;
    };

    let forward = reachable(start_id, |id| graph.next_ids(id));
    let backward = reachable(end_id, |id| graph.previous_ids(id));

    for id in graph.shapes().map(|s| s.id) {
        if !forward.contains(&id) {
            errors.push(ValidationError::UnreachableFromStart(id));
        }
        if !backward.contains(&id) {
            errors.push(ValidationError::CannotReachEnd(id));
        }
    }
}

fn reachable(from: ShapeId, neighbours: impl Fn(ShapeId) -> Vec<ShapeId>) -> AHashSet<ShapeId> {
    let mut seen = AHashSet::new();
    let mut queue = VecDeque::from([from]);
    while let Some(id) = queue.pop_front() {
        if seen.insert(id) {
            queue.extend(neighbours(id));
        }
    }
    seen
}
