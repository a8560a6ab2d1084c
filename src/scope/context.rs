use crate::model::ShapeId;
use ahash::{AHashMap, AHashSet};
use std::fmt;

/// Identifies one branch of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionKey {
    pub decision_id: ShapeId,
    pub order_index: i32,
}

impl ConditionKey {
    pub fn new(decision_id: ShapeId, order_index: i32) -> Self {
        Self {
            decision_id,
            order_index,
        }
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.decision_id, self.order_index)
    }
}

/// Which open branches surround a visited shape, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeInformation {
    pub parent_conditions: Vec<ConditionKey>,
}

impl ShapeInformation {
    pub fn innermost(&self) -> Option<ConditionKey> {
        self.parent_conditions.last().copied()
    }
}

/// One decision branch met during a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionContext {
    pub decision_id: ShapeId,
    pub order_index: i32,
    /// Last shape inside the branch before it merged. The decision itself for an empty branch.
    pub end_id: Option<ShapeId>,
    /// Merge destination actually reached. `None` when the branch never reached it.
    pub target_id: Option<ShapeId>,
    pub shape_ids_in_condition: Vec<ShapeId>,
    /// The condition that was innermost when this branch was entered.
    pub inner_parent_condition: Option<ConditionKey>,
    /// The branch flows back into its own decision or one of its ancestors.
    pub is_infinite_loop: bool,
}

impl ConditionContext {
    pub(crate) fn open(key: ConditionKey, inner_parent_condition: Option<ConditionKey>) -> Self {
        Self {
            decision_id: key.decision_id,
            order_index: key.order_index,
            end_id: None,
            target_id: None,
            shape_ids_in_condition: Vec::new(),
            inner_parent_condition,
            is_infinite_loop: false,
        }
    }

    pub fn key(&self) -> ConditionKey {
        ConditionKey::new(self.decision_id, self.order_index)
    }

    pub fn is_closed(&self) -> bool {
        self.target_id.is_some()
    }
}

/// Result of a scope traversal. Owned and detached from the graph it was computed on.
#[derive(Debug, Clone, Default)]
pub struct ScopeContext {
    pub id: ShapeId,
    pub previous_id: Option<ShapeId>,
    pub visited_ids: AHashMap<ShapeId, ShapeInformation>,
    /// Visited ids in traversal order.
    pub visit_order: Vec<ShapeId>,
    /// Merge ids the traversal was seeded with.
    pub merge_ids: Vec<ShapeId>,
    pub mappings: Vec<ConditionContext>,
}

impl ScopeContext {
    pub fn contains(&self, id: ShapeId) -> bool {
        self.visited_ids.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.visit_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visit_order.is_empty()
    }

    pub fn shape_ids(&self) -> &[ShapeId] {
        &self.visit_order
    }

    pub fn shape_id_set(&self) -> AHashSet<ShapeId> {
        self.visit_order.iter().copied().collect()
    }

    pub fn info(&self, id: ShapeId) -> Option<&ShapeInformation> {
        self.visited_ids.get(&id)
    }

    pub fn mapping(&self, key: ConditionKey) -> Option<&ConditionContext> {
        self.mappings.iter().find(|m| m.key() == key)
    }

    /// Where flow entering `id` from outside should go once the scope is gone.
    ///
    /// Walks the conditions surrounding `id` from the innermost outwards and returns the
    /// first recorded merge target that survives: present, not a loop-back and not in
    /// `excluded`. Falls back to `fallback` when no surrounding condition qualifies.
    pub fn resolve_target(
        &self,
        id: ShapeId,
        excluded: &AHashSet<ShapeId>,
        fallback: ShapeId,
    ) -> ShapeId {
        let mut current = self.info(id).and_then(ShapeInformation::innermost);
        while let Some(key) = current {
            let Some(mapping) = self.mapping(key) else {
                break;
            };
            match mapping.target_id {
                Some(target) if !mapping.is_infinite_loop && !excluded.contains(&target) => {
                    return target;
                }
                _ => current = mapping.inner_parent_condition,
            }
        }
        fallback
    }
}
