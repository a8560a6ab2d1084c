use super::context::{ConditionContext, ConditionKey, ScopeContext, ShapeInformation};
use crate::model::{ProcessGraph, ShapeId, ShapeKind};
use ahash::AHashSet;

/// How far a traversal is allowed to reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StopPolicy {
    /// Scope of a user task: the task and its system shapes.
    Task,
    /// Scope of a decision: everything in its non-default branches.
    Decision,
    /// Shapes of one branch, seeded with the branch's merge point.
    Branch,
    /// The shape itself only.
    Single,
}

impl StopPolicy {
    pub(super) fn for_kind(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::UserTask => StopPolicy::Task,
            ShapeKind::UserDecision | ShapeKind::SystemDecision => StopPolicy::Decision,
            ShapeKind::Start | ShapeKind::Precondition | ShapeKind::SystemTask | ShapeKind::End => {
                StopPolicy::Single
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Skip,
    /// Visit the shape but do not follow its links.
    Leaf,
    Descend,
}

/// One pending visit. Each frame owns its condition nesting, so sibling branches never
/// see each other's open conditions.
#[derive(Debug, Clone)]
struct Frame {
    shape_id: ShapeId,
    previous_id: Option<ShapeId>,
    /// Indexes into the mapping list, innermost last.
    conditions: Vec<usize>,
    /// Shapes visited between the root and this frame.
    path: Vec<ShapeId>,
}

/// Explicit-stack depth-first walk shared by every scope query.
pub(super) struct Traversal<'g> {
    graph: &'g ProcessGraph,
    root: ShapeId,
    policy: StopPolicy,
    context: ScopeContext,
    /// Merge id of each mapping, parallel to `context.mappings`.
    merge_of: Vec<ShapeId>,
    /// Decision whose branch seeded the walk.
    seed_decision: Option<ShapeId>,
}

impl<'g> Traversal<'g> {
    pub(super) fn new(graph: &'g ProcessGraph, root: ShapeId, policy: StopPolicy) -> Self {
        Self {
            graph,
            root,
            policy,
            context: ScopeContext {
                id: root,
                ..Default::default()
            },
            merge_of: Vec::new(),
            seed_decision: None,
        }
    }

    /// Runs the walk. `seed` opens a condition before the root is visited.
    pub(super) fn run(
        mut self,
        previous_id: Option<ShapeId>,
        seed: Option<(ConditionKey, ShapeId)>,
    ) -> ScopeContext {
        self.context.previous_id = previous_id;

        let mut conditions = Vec::new();
        if let Some((key, merge_id)) = seed {
            self.seed_decision = Some(key.decision_id);
            self.context.merge_ids.push(merge_id);
            conditions.push(self.open_condition(key, None, merge_id));
        }

        let mut stack = vec![Frame {
            shape_id: self.root,
            previous_id,
            conditions,
            path: Vec::new(),
        }];

        while let Some(frame) = stack.pop() {
            if self.close_merges(&frame) {
                continue;
            }
            let Some(kind) = self.graph.kind_of(frame.shape_id) else {
                log::debug!("scope walk skipped dangling shape {}", frame.shape_id);
                continue;
            };
            if self.context.contains(frame.shape_id) {
                continue;
            }

            match self.admit(&frame, kind) {
                Admission::Skip => continue,
                Admission::Leaf => self.mark_visited(&frame),
                Admission::Descend => {
                    self.mark_visited(&frame);
                    let mut successors = self.successors(&frame, kind);
                    // Reverse so the lowest order index is walked first.
                    successors.reverse();
                    stack.extend(successors);
                }
            }
        }

        self.context
    }

    /// Closes every open condition whose merge point is this frame's shape. Returns true
    /// when the frame stopped at a merge.
    fn close_merges(&mut self, frame: &Frame) -> bool {
        let Some(position) = frame
            .conditions
            .iter()
            .rposition(|&index| self.merge_of[index] == frame.shape_id)
        else {
            return false;
        };

        for &index in &frame.conditions[position..] {
            if self.context.mappings[index].is_closed() {
                continue;
            }
            let decision_id = self.context.mappings[index].decision_id;
            let is_loop = frame.shape_id == decision_id
                || frame.path.contains(&frame.shape_id)
                || default_chain_reaches(self.graph, frame.shape_id, decision_id);

            let mapping = &mut self.context.mappings[index];
            mapping.end_id = frame.previous_id;
            mapping.target_id = Some(frame.shape_id);
            mapping.is_infinite_loop = is_loop;
        }
        true
    }

    fn admit(&self, frame: &Frame, kind: ShapeKind) -> Admission {
        let is_root = frame.shape_id == self.root && frame.path.is_empty();
        if is_root {
            match self.policy {
                StopPolicy::Task | StopPolicy::Decision => return Admission::Descend,
                StopPolicy::Single => return Admission::Leaf,
                StopPolicy::Branch => {}
            }
        }

        if kind.is_terminal() {
            return Admission::Skip;
        }

        match self.policy {
            StopPolicy::Task if frame.conditions.is_empty() => match kind {
                ShapeKind::SystemTask => Admission::Leaf,
                ShapeKind::SystemDecision => Admission::Descend,
                ShapeKind::UserTask
                | ShapeKind::UserDecision
                | ShapeKind::Start
                | ShapeKind::Precondition
                | ShapeKind::End => Admission::Skip,
            },
            StopPolicy::Branch if self.seed_decision == Some(frame.shape_id) => Admission::Skip,
            StopPolicy::Single => Admission::Skip,
            StopPolicy::Task | StopPolicy::Decision | StopPolicy::Branch => Admission::Descend,
        }
    }

    fn mark_visited(&mut self, frame: &Frame) {
        let parent_conditions: Vec<ConditionKey> = frame
            .conditions
            .iter()
            .map(|&index| self.context.mappings[index].key())
            .collect();
        for &index in &frame.conditions {
            self.context.mappings[index]
                .shape_ids_in_condition
                .push(frame.shape_id);
        }
        self.context
            .visited_ids
            .insert(frame.shape_id, ShapeInformation { parent_conditions });
        self.context.visit_order.push(frame.shape_id);
    }

    fn successors(&mut self, frame: &Frame, kind: ShapeKind) -> Vec<Frame> {
        let skip_default = self.policy == StopPolicy::Decision && frame.shape_id == self.root;
        let links: Vec<(ShapeId, i32)> = self
            .graph
            .outgoing(frame.shape_id)
            .into_iter()
            .map(|l| (l.destination_id, l.order_index))
            .collect();

        let mut path = frame.path.clone();
        path.push(frame.shape_id);

        let mut frames = Vec::with_capacity(links.len());
        for (destination_id, order_index) in links {
            if order_index == 0 && skip_default && kind.is_decision() {
                continue;
            }

            let mut conditions = frame.conditions.clone();
            if kind.is_decision() && order_index != 0 {
                match self.graph.branch_destination(frame.shape_id, order_index) {
                    Some(merge_id) => {
                        let parent = frame
                            .conditions
                            .last()
                            .map(|&index| self.context.mappings[index].key());
                        let key = ConditionKey::new(frame.shape_id, order_index);
                        conditions.push(self.open_condition(key, parent, merge_id));
                    }
                    None => log::debug!(
                        "branch {} of decision {} has no merge record",
                        order_index,
                        frame.shape_id
                    ),
                }
            }

            frames.push(Frame {
                shape_id: destination_id,
                previous_id: Some(frame.shape_id),
                conditions,
                path: path.clone(),
            });
        }
        frames
    }

    fn open_condition(
        &mut self,
        key: ConditionKey,
        parent: Option<ConditionKey>,
        merge_id: ShapeId,
    ) -> usize {
        self.context
            .mappings
            .push(ConditionContext::open(key, parent));
        self.merge_of.push(merge_id);
        self.context.mappings.len() - 1
    }
}

/// True when following lowest-order links from `from` arrives at `to`.
pub(crate) fn default_chain_reaches(graph: &ProcessGraph, from: ShapeId, to: ShapeId) -> bool {
    let mut seen = AHashSet::new();
    let mut current = Some(from);
    while let Some(id) = current {
        if id == to {
            return true;
        }
        if !seen.insert(id) {
            return false;
        }
        current = graph.default_successor(id);
    }
    false
}
