use super::{
    ProcessEditor, accepts_task_content, first_non_system_after, merge_entries_fed_by,
    position_between, reaches,
};
use crate::collab::ChangeKind;
use crate::error::EditError;
use crate::model::{Link, ProcessGraph, ShapeId, ShapeKind};

const TASK_PAIR_COST: usize = 2;

impl ProcessEditor {
    /// Inserts a user task and its system task in front of `destination_id`.
    ///
    /// Every link from one of `source_ids` to the destination is rewritten in place to
    /// enter the new user task. When several sources feed the destination the branch
    /// records merging there move to the new task. The destination must be a user task,
    /// a user decision or End. Returns the new user task id.
    pub fn insert_task(
        &self,
        graph: &mut ProcessGraph,
        source_ids: &[ShapeId],
        destination_id: ShapeId,
    ) -> Result<ShapeId, EditError> {
        let destination_kind = self.kind_of(graph, destination_id)?;
        let Some(&first_source) = source_ids.first() else {
            return Err(self.reject(EditError::MissingSources(destination_id)));
        };
        for &source_id in source_ids {
            let source_kind = self.kind_of(graph, source_id)?;
            if !graph.next_ids(source_id).contains(&destination_id) {
                return Err(self.reject(EditError::LinkNotFound {
                    source_id,
                    destination_id,
                }));
            }
            if !accepts_task_content(source_kind, destination_kind) {
                return Err(self.reject(EditError::InvalidInsertionPoint {
                    kind: ShapeKind::UserTask,
                    source_id,
                    destination_id,
                }));
            }
        }

        let total = self.ensure_budget(graph, TASK_PAIR_COST)?;
        let moved_entries = if source_ids.len() > 1 {
            merge_entries_fed_by(graph, source_ids, destination_id)
        } else {
            Vec::new()
        };
        self.warn_if_near_limit(total);

        let (x, y) = position_between(graph, first_source, destination_id);
        let user_task_id = self.splice_task_pair(graph, x, y, destination_id);
        for &source_id in source_ids {
            graph.redirect_links(source_id, destination_id, user_task_id);
        }
        for key in moved_entries {
            graph.set_branch_destination(key.decision_id, key.order_index, user_task_id);
        }

        log::debug!(
            "inserted task {} before {} from {:?}",
            user_task_id,
            destination_id,
            source_ids
        );
        self.notifier.notify(ChangeKind::Add, user_task_id);
        Ok(user_task_id)
    }

    /// Splices a user decision into `edge`.
    ///
    /// The old continuation becomes branch 0 and a new user task pair becomes branch 1,
    /// merging where the edge used to lead. When the edge leads to End, to a user
    /// decision or to a shape with several predecessors, branch 0 gets its own task pair.
    pub fn insert_user_decision(
        &self,
        graph: &mut ProcessGraph,
        edge: &Link,
    ) -> Result<ShapeId, EditError> {
        let (source_kind, destination_kind) = self.check_edge(graph, edge)?;
        let valid_source = matches!(
            source_kind,
            ShapeKind::Precondition | ShapeKind::SystemTask
        );
        let valid_destination = matches!(
            destination_kind,
            ShapeKind::UserTask | ShapeKind::UserDecision | ShapeKind::End
        );
        if !valid_source || !valid_destination {
            return Err(self.reject(EditError::InvalidInsertionPoint {
                kind: ShapeKind::UserDecision,
                source_id: edge.source_id,
                destination_id: edge.destination_id,
            }));
        }

        let needs_default_pair = matches!(destination_kind, ShapeKind::End | ShapeKind::UserDecision)
            || graph.incoming(edge.destination_id).len() > 1;
        let cost = if needs_default_pair { 5 } else { 3 };
        let total = self.ensure_budget(graph, cost)?;
        self.warn_if_near_limit(total);

        let destination_id = edge.destination_id;
        let (x, y) = position_between(graph, edge.source_id, destination_id);
        let factory = self.factory(graph);
        let parent_id = graph.id;
        let decision_id = graph.allocate_id();
        graph.add_shape(factory.create_user_decision(parent_id, decision_id, x, y));
        graph.redirect_branch(edge.source_id, edge.order_index, decision_id);

        let default_entry = if needs_default_pair {
            self.splice_task_pair(graph, x + 0.25, y, destination_id)
        } else {
            destination_id
        };
        graph.add_link(Link::branch(decision_id, default_entry, 0, None));

        let branch_entry = self.splice_task_pair(graph, x + 0.25, y + 1.0, destination_id);
        graph.add_link(Link::branch(decision_id, branch_entry, 1, condition_label(1)));
        graph.set_branch_destination(decision_id, 1, destination_id);

        log::debug!(
            "inserted user decision {} on {} -> {}",
            decision_id,
            edge.source_id,
            destination_id
        );
        self.notifier.notify(ChangeKind::Add, decision_id);
        Ok(decision_id)
    }

    /// Splices a system decision into `edge`, which must run inside a task's system chain.
    ///
    /// Branch 1 holds a new system task and merges at the first non-system shape after
    /// the old continuation.
    pub fn insert_system_decision(
        &self,
        graph: &mut ProcessGraph,
        edge: &Link,
    ) -> Result<ShapeId, EditError> {
        let (source_kind, destination_kind) = self.check_edge(graph, edge)?;
        let valid_source = matches!(
            source_kind,
            ShapeKind::UserTask | ShapeKind::SystemDecision
        );
        let valid_destination = matches!(
            destination_kind,
            ShapeKind::SystemTask | ShapeKind::SystemDecision
        );
        if !valid_source || !valid_destination {
            return Err(self.reject(EditError::InvalidInsertionPoint {
                kind: ShapeKind::SystemDecision,
                source_id: edge.source_id,
                destination_id: edge.destination_id,
            }));
        }
        let Some(merge_id) = first_non_system_after(graph, edge.destination_id) else {
            return Err(self.reject(EditError::MissingMergeMapping(edge.destination_id)));
        };

        let total = self.ensure_budget(graph, 2)?;
        self.warn_if_near_limit(total);

        let destination_id = edge.destination_id;
        let (x, y) = position_between(graph, edge.source_id, destination_id);
        let factory = self.factory(graph);
        let parent_id = graph.id;
        let decision_id = graph.allocate_id();
        graph.add_shape(factory.create_system_decision(parent_id, decision_id, x, y));
        graph.redirect_branch(edge.source_id, edge.order_index, decision_id);
        graph.add_link(Link::branch(decision_id, destination_id, 0, None));

        let system_task_id = graph.allocate_id();
        graph.add_shape(factory.create_system_task(parent_id, system_task_id, x + 0.25, y + 1.0));
        graph.add_link(Link::branch(decision_id, system_task_id, 1, condition_label(1)));
        graph.add_link(Link::new(system_task_id, merge_id));
        graph.set_branch_destination(decision_id, 1, merge_id);

        log::debug!(
            "inserted system decision {} on {} -> {}, branch 1 merges at {}",
            decision_id,
            edge.source_id,
            destination_id,
            merge_id
        );
        self.notifier.notify(ChangeKind::Add, decision_id);
        Ok(decision_id)
    }

    /// Appends a branch to a decision, merging at `merge_shape_id`.
    ///
    /// A system decision gets a system task, a user decision a user task pair. The merge
    /// shape is a user shape or End; a system decision may also rejoin a system shape
    /// that lies downstream of it. Returns the first shape of the new branch.
    pub fn insert_decision_condition(
        &self,
        graph: &mut ProcessGraph,
        decision_id: ShapeId,
        label: Option<String>,
        merge_shape_id: ShapeId,
    ) -> Result<ShapeId, EditError> {
        let kind = self.kind_of(graph, decision_id)?;
        let merge_kind = self.kind_of(graph, merge_shape_id)?;
        if !kind.is_decision() {
            return Err(self.reject(EditError::InvalidShapeKind {
                id: decision_id,
                expected: "decision",
                found: kind,
            }));
        }
        let valid_merge = match merge_kind {
            ShapeKind::UserTask | ShapeKind::UserDecision | ShapeKind::End => true,
            // System branches may only rejoin their own chain further down.
            ShapeKind::SystemTask | ShapeKind::SystemDecision => {
                kind == ShapeKind::SystemDecision && reaches(graph, decision_id, merge_shape_id)
            }
            ShapeKind::Start | ShapeKind::Precondition => false,
        };
        if !valid_merge {
            return Err(self.reject(EditError::InvalidInsertionPoint {
                kind,
                source_id: decision_id,
                destination_id: merge_shape_id,
            }));
        }
        if graph.branch_count(decision_id) >= self.config.max_conditions {
            return Err(self.reject(EditError::MaxConditionsReached {
                decision_id,
                max: self.config.max_conditions,
            }));
        }

        let cost = if kind == ShapeKind::SystemDecision { 1 } else { TASK_PAIR_COST };
        let total = self.ensure_budget(graph, cost)?;
        self.warn_if_near_limit(total);

        let order_index = graph.next_order_index(decision_id);
        let (x, y) = graph
            .shape(decision_id)
            .map(|s| (s.x() + 0.5, s.y() + f64::from(order_index)))
            .unwrap_or_default();
        let first_id = if kind == ShapeKind::SystemDecision {
            let factory = self.factory(graph);
            let parent_id = graph.id;
            let system_task_id = graph.allocate_id();
            graph.add_shape(factory.create_system_task(parent_id, system_task_id, x, y));
            graph.add_link(Link::new(system_task_id, merge_shape_id));
            system_task_id
        } else {
            self.splice_task_pair(graph, x, y, merge_shape_id)
        };
        let label = label.or_else(|| condition_label(order_index));
        graph.add_link(Link::branch(decision_id, first_id, order_index, label));
        graph.set_branch_destination(decision_id, order_index, merge_shape_id);

        log::debug!(
            "added branch {} to decision {}, merging at {}",
            order_index,
            decision_id,
            merge_shape_id
        );
        self.notifier.notify(ChangeKind::Add, first_id);
        Ok(first_id)
    }

    /// Kinds of both ends of an existing link.
    fn check_edge(
        &self,
        graph: &ProcessGraph,
        edge: &Link,
    ) -> Result<(ShapeKind, ShapeKind), EditError> {
        let source_kind = self.kind_of(graph, edge.source_id)?;
        let destination_kind = self.kind_of(graph, edge.destination_id)?;
        let exists = graph
            .branch_link(edge.source_id, edge.order_index)
            .is_some_and(|l| l.destination_id == edge.destination_id);
        if !exists {
            return Err(self.reject(EditError::LinkNotFound {
                source_id: edge.source_id,
                destination_id: edge.destination_id,
            }));
        }
        Ok((source_kind, destination_kind))
    }

    /// Adds a detached `UserTask -> SystemTask -> destination` chain and returns the
    /// user task id. The caller links into it.
    pub(super) fn splice_task_pair(
        &self,
        graph: &mut ProcessGraph,
        x: f64,
        y: f64,
        destination_id: ShapeId,
    ) -> ShapeId {
        let factory = self.factory(graph);
        let parent_id = graph.id;
        let user_task_id = graph.allocate_id();
        let system_task_id = graph.allocate_id();
        graph.add_shape(factory.create_user_task(parent_id, user_task_id, x, y));
        graph.add_shape(factory.create_system_task(parent_id, system_task_id, x + 0.1, y));
        graph.add_link(Link::new(user_task_id, system_task_id));
        graph.add_link(Link::new(system_task_id, destination_id));
        user_task_id
    }
}

fn condition_label(order_index: i32) -> Option<String> {
    Some(format!("Condition {}", order_index + 1))
}
