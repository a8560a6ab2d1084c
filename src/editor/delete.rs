use super::{ProcessEditor, first_non_system_after};
use crate::collab::ChangeKind;
use crate::error::EditError;
use crate::model::{Link, ProcessGraph, ShapeId, ShapeKind};
use crate::scope::{ConditionKey, ScopeContext, default_chain_reaches, get_branch_scope, get_scope};
use ahash::AHashSet;
use itertools::Itertools;

/// An existing link that gets a new destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Redirect {
    source_id: ShapeId,
    order_index: i32,
    from: ShapeId,
    to: ShapeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryUpdate {
    key: ConditionKey,
    from: ShapeId,
    to: ShapeId,
}

/// Everything a deletion will change, computed before the graph is touched.
#[derive(Debug, Default)]
struct RemovalPlan {
    root_id: ShapeId,
    deleted: AHashSet<ShapeId>,
    deleted_order: Vec<ShapeId>,
    redirects: Vec<Redirect>,
    entry_updates: Vec<EntryUpdate>,
    dropped_entries: Vec<ConditionKey>,
    severed_branch: Option<ConditionKey>,
}

impl RemovalPlan {
    /// Builds the plan for removing every shape of `scope`.
    ///
    /// Links entering the scope root go to `exit_id`. Links entering deeper scope shapes go
    /// to the merge target of the innermost surviving condition around them, unless that
    /// would close a loop made of default links only, in which case they go to the merge
    /// point of the branch that owns their source.
    fn new(
        graph: &ProcessGraph,
        scope: &ScopeContext,
        exit_id: ShapeId,
        severed_branch: Option<ConditionKey>,
    ) -> Self {
        let deleted = scope.shape_id_set();
        let fallback_end = graph.end_id().unwrap_or(exit_id);

        let mut redirects = Vec::new();
        for link in graph.links() {
            if !deleted.contains(&link.destination_id) || deleted.contains(&link.source_id) {
                continue;
            }
            let key = ConditionKey::new(link.source_id, link.order_index);
            if severed_branch == Some(key) {
                continue;
            }
            let mut to = if link.destination_id == scope.id {
                exit_id
            } else {
                scope.resolve_target(link.destination_id, &deleted, exit_id)
            };
            if link.is_default() && default_chain_reaches(graph, to, link.source_id) {
                to = owning_branch_destination(graph, link.source_id, &deleted)
                    .unwrap_or(fallback_end);
                log::debug!(
                    "link {} -> {} would loop, sending it to {}",
                    link.source_id,
                    link.destination_id,
                    to
                );
            }
            redirects.push(Redirect {
                source_id: link.source_id,
                order_index: link.order_index,
                from: link.destination_id,
                to,
            });
        }

        let mut entry_updates = Vec::new();
        let mut dropped_entries = Vec::new();
        for entry in graph.branch_destinations() {
            let key = ConditionKey::new(entry.decision_id, entry.order_index);
            if deleted.contains(&entry.decision_id) || severed_branch == Some(key) {
                dropped_entries.push(key);
                continue;
            }
            if !deleted.contains(&entry.destination_id) {
                continue;
            }
            let branch_end = graph
                .branch_link(entry.decision_id, entry.order_index)
                .and_then(|link| get_branch_scope(graph, link).mappings.first()?.end_id);
            let to = redirects
                .iter()
                .find(|r| Some(r.source_id) == branch_end && r.from == entry.destination_id)
                .map(|r| r.to)
                .unwrap_or_else(|| {
                    if entry.destination_id == scope.id {
                        exit_id
                    } else {
                        scope.resolve_target(entry.destination_id, &deleted, exit_id)
                    }
                });
            entry_updates.push(EntryUpdate {
                key,
                from: entry.destination_id,
                to,
            });
        }

        Self {
            root_id: scope.id,
            deleted,
            deleted_order: scope.shape_ids().to_vec(),
            redirects,
            entry_updates,
            dropped_entries,
            severed_branch,
        }
    }

    /// Sends everything that was headed for the scope root to `target` instead.
    fn retarget_root(&mut self, target: ShapeId) {
        let root_id = self.root_id;
        for redirect in self.redirects.iter_mut().filter(|r| r.from == root_id) {
            redirect.to = target;
        }
        for update in self.entry_updates.iter_mut().filter(|u| u.from == root_id) {
            update.to = target;
        }
    }

    fn apply(self, graph: &mut ProcessGraph) {
        if let Some(key) = self.severed_branch {
            graph.remove_branch_link(key.decision_id, key.order_index);
        }
        for redirect in &self.redirects {
            graph.redirect_branch(redirect.source_id, redirect.order_index, redirect.to);
        }
        graph.remove_links_touching(&self.deleted);
        for key in &self.dropped_entries {
            graph.remove_branch_destination(key.decision_id, key.order_index);
        }
        for update in &self.entry_updates {
            graph.set_branch_destination(update.key.decision_id, update.key.order_index, update.to);
        }
        for id in &self.deleted_order {
            graph.remove_shape(*id);
        }
    }
}

/// Merge point of the innermost branch containing `shape_id`, if it survives the deletion.
fn owning_branch_destination(
    graph: &ProcessGraph,
    shape_id: ShapeId,
    deleted: &AHashSet<ShapeId>,
) -> Option<ShapeId> {
    graph
        .branch_destinations()
        .iter()
        .filter(|entry| !deleted.contains(&entry.destination_id))
        .filter_map(|entry| {
            let link = graph.branch_link(entry.decision_id, entry.order_index)?;
            let scope = get_branch_scope(graph, link);
            scope
                .contains(shape_id)
                .then_some((scope.len(), entry.destination_id))
        })
        .min_by_key(|(size, _)| *size)
        .map(|(_, destination_id)| destination_id)
}

/// A decision removal ready to be applied.
struct DecisionRemoval {
    plan: RemovalPlan,
    exit_id: ShapeId,
    needs_replacement: bool,
}

impl ProcessEditor {
    /// Deletes a user task together with the system shapes that belong to it.
    ///
    /// When the task is the only content of a non-default branch the whole branch goes,
    /// and a decision left with too few branches is collapsed into its default branch.
    pub fn delete_user_task(
        &self,
        graph: &mut ProcessGraph,
        task_id: ShapeId,
    ) -> Result<(), EditError> {
        let kind = self.kind_of(graph, task_id)?;
        if kind != ShapeKind::UserTask {
            return Err(self.reject(EditError::InvalidShapeKind {
                id: task_id,
                expected: "user task",
                found: kind,
            }));
        }
        let Some(new_destination_id) = first_non_system_after(graph, task_id) else {
            return Err(self.reject(EditError::MissingMergeMapping(task_id)));
        };
        let previous_ids = graph.previous_ids(task_id);

        if let Some(link) = sole_branch_link(graph, task_id, new_destination_id) {
            if graph.branch_count(link.source_id) > self.config.min_conditions {
                return self.delete_decision_branch(graph, &link);
            }
            return self.collapse_decision(graph, link.source_id);
        }

        let precondition_id = graph.precondition_id();
        let destination_kind = self.kind_of(graph, new_destination_id)?;
        let last_task = graph.ids_of_kind(ShapeKind::UserTask).len() <= 1
            || (destination_kind == ShapeKind::End
                && previous_ids.iter().any(|id| Some(*id) == precondition_id));
        if last_task {
            return Err(self.reject(EditError::ProcessWouldBeEmpty { task_id }));
        }
        let joins_user_decisions = destination_kind == ShapeKind::UserDecision
            && previous_ids
                .iter()
                .any(|id| graph.kind_of(*id) == Some(ShapeKind::UserDecision));
        if joins_user_decisions {
            return Err(self.reject(EditError::AdjacentUserDecisions { task_id }));
        }

        let scope = get_scope(graph, task_id);
        let plan = RemovalPlan::new(graph, &scope, new_destination_id, None);
        log::debug!(
            "deleting task {} with {:?}, predecessors {:?} now lead to {}",
            task_id,
            plan.deleted_order,
            previous_ids,
            new_destination_id
        );
        plan.apply(graph);
        self.notifier.notify(ChangeKind::Remove, task_id);
        Ok(())
    }

    /// Deletes a decision and everything in its non-default branches. Its predecessors
    /// continue into the default branch.
    pub fn delete_decision(
        &self,
        graph: &mut ProcessGraph,
        decision_id: ShapeId,
    ) -> Result<(), EditError> {
        let removal = self
            .plan_decision_removal(graph, decision_id)
            .map_err(|error| self.reject(error))?;
        self.finish_decision_removal(graph, decision_id, removal)
    }

    /// Deletes one non-default branch of a decision and the shapes unique to it.
    ///
    /// Order indexes of the remaining branches are kept as they are.
    pub fn delete_decision_branch(
        &self,
        graph: &mut ProcessGraph,
        link: &Link,
    ) -> Result<(), EditError> {
        let decision_id = link.source_id;
        let kind = self.kind_of(graph, decision_id)?;
        if !kind.is_decision() {
            return Err(self.reject(EditError::InvalidShapeKind {
                id: decision_id,
                expected: "decision",
                found: kind,
            }));
        }
        let exists = graph
            .branch_link(decision_id, link.order_index)
            .is_some_and(|l| l.destination_id == link.destination_id);
        if !exists {
            return Err(self.reject(EditError::LinkNotFound {
                source_id: decision_id,
                destination_id: link.destination_id,
            }));
        }
        let merge_id = match graph.branch_destination(decision_id, link.order_index) {
            Some(merge_id) if link.order_index != 0 => merge_id,
            _ => {
                return Err(self.reject(EditError::MissingBranchDestination {
                    decision_id,
                    order_index: link.order_index,
                }));
            }
        };
        if graph.branch_count(decision_id) <= self.config.min_conditions {
            return Err(self.reject(EditError::MinConditionsReached {
                decision_id,
                min: self.config.min_conditions,
            }));
        }

        let scope = get_branch_scope(graph, link);
        let key = ConditionKey::new(decision_id, link.order_index);
        let plan = RemovalPlan::new(graph, &scope, merge_id, Some(key));
        log::debug!(
            "deleting branch {} of decision {} with {:?}",
            link.order_index,
            decision_id,
            plan.deleted_order
        );
        plan.apply(graph);
        self.notifier.notify(ChangeKind::Remove, decision_id);
        Ok(())
    }

    /// Removes a decision whose last non-default branch is being emptied.
    fn collapse_decision(
        &self,
        graph: &mut ProcessGraph,
        decision_id: ShapeId,
    ) -> Result<(), EditError> {
        let removal = match self.plan_decision_removal(graph, decision_id) {
            Ok(removal) => removal,
            Err(EditError::AdjacentUserDecisions { .. }) => {
                return Err(self.reject(EditError::MinConditionsReached {
                    decision_id,
                    min: self.config.min_conditions,
                }));
            }
            Err(error) => return Err(self.reject(error)),
        };
        self.finish_decision_removal(graph, decision_id, removal)
    }

    fn plan_decision_removal(
        &self,
        graph: &ProcessGraph,
        decision_id: ShapeId,
    ) -> Result<DecisionRemoval, EditError> {
        let kind = graph
            .kind_of(decision_id)
            .ok_or(EditError::ShapeNotFound(decision_id))?;
        if !kind.is_decision() {
            return Err(EditError::InvalidShapeKind {
                id: decision_id,
                expected: "decision",
                found: kind,
            });
        }
        let exit_id = graph
            .default_successor(decision_id)
            .ok_or(EditError::MissingMergeMapping(decision_id))?;
        let exit_kind = graph
            .kind_of(exit_id)
            .ok_or(EditError::ShapeNotFound(exit_id))?;

        let scope = get_scope(graph, decision_id);
        let previous_ids = graph
            .previous_ids(decision_id)
            .into_iter()
            .filter(|id| !scope.contains(*id))
            .collect_vec();
        let needs_replacement = exit_kind == ShapeKind::End
            && previous_ids
                .iter()
                .any(|id| graph.kind_of(*id) == Some(ShapeKind::Precondition));
        let joins_user_decisions = exit_kind == ShapeKind::UserDecision
            && previous_ids
                .iter()
                .any(|id| graph.kind_of(*id) == Some(ShapeKind::UserDecision));
        if joins_user_decisions {
            return Err(EditError::AdjacentUserDecisions {
                task_id: decision_id,
            });
        }

        let plan = RemovalPlan::new(graph, &scope, exit_id, None);
        if needs_replacement {
            let current = graph.shape_count();
            let remaining = current.saturating_sub(plan.deleted.len());
            if remaining + 2 > self.config.shape_limit {
                return Err(EditError::ShapeLimitExceeded {
                    current,
                    adding: 2,
                    limit: self.config.shape_limit,
                });
            }
        }
        Ok(DecisionRemoval {
            plan,
            exit_id,
            needs_replacement,
        })
    }

    fn finish_decision_removal(
        &self,
        graph: &mut ProcessGraph,
        decision_id: ShapeId,
        removal: DecisionRemoval,
    ) -> Result<(), EditError> {
        let DecisionRemoval {
            mut plan,
            exit_id,
            needs_replacement,
        } = removal;

        if needs_replacement {
            let (x, y) = graph
                .shape(decision_id)
                .map(|s| (s.x(), s.y()))
                .unwrap_or_default();
            let user_task_id = self.splice_task_pair(graph, x, y, exit_id);
            plan.retarget_root(user_task_id);
            log::debug!(
                "decision {} was the whole process, replaced by task {}",
                decision_id,
                user_task_id
            );
        }
        log::debug!(
            "deleting decision {} with {:?}, exit {}",
            decision_id,
            plan.deleted_order,
            exit_id
        );
        plan.apply(graph);
        self.notifier.notify(ChangeKind::Remove, decision_id);
        Ok(())
    }
}

/// The branch link entering `task_id` when the task is all its branch holds.
fn sole_branch_link(
    graph: &ProcessGraph,
    task_id: ShapeId,
    new_destination_id: ShapeId,
) -> Option<Link> {
    let incoming = graph.incoming(task_id);
    let [link] = incoming.as_slice() else {
        return None;
    };
    let is_decision = graph.kind_of(link.source_id).is_some_and(ShapeKind::is_decision);
    let merges_right_after = graph.branch_destination(link.source_id, link.order_index)
        == Some(new_destination_id);
    (is_decision && !link.is_default() && merges_right_after).then(|| (*link).clone())
}
