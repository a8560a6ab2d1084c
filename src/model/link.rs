use super::shape::ShapeId;
use serde::{Deserialize, Serialize};

/// A directed, ordered edge between two shapes.
///
/// Only decisions may own several outgoing links; `order_index` 0 is the default branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source_id: ShapeId,
    pub destination_id: ShapeId,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub label: Option<String>,
}

impl Link {
    pub fn new(source_id: ShapeId, destination_id: ShapeId) -> Self {
        Self {
            source_id,
            destination_id,
            order_index: 0,
            label: None,
        }
    }

    pub fn branch(
        source_id: ShapeId,
        destination_id: ShapeId,
        order_index: i32,
        label: Option<String>,
    ) -> Self {
        Self {
            source_id,
            destination_id,
            order_index,
            label,
        }
    }

    pub fn is_default(&self) -> bool {
        self.order_index == 0
    }
}

/// Records where a non-default decision branch rejoins the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionBranchDestinationLink {
    pub decision_id: ShapeId,
    pub order_index: i32,
    pub destination_id: ShapeId,
}
