//! Copy/paste payload for process subgraphs.
//!
//! A payload holds shapes with their original ids and the links between them. The chain
//! head, the shape pasted content is entered through, comes first; the other shapes follow
//! in canonical position order. Links leaving the copied selection point at [`SENTINEL_END_ID`],
//! which pasting replaces with the real insertion destination.

mod copy;
mod paste;
mod tree;

pub use copy::build_clipboard_data;
pub(crate) use paste::paste_into;
pub use paste::PasteOutcome;
pub use tree::{NodeTag, PathSignature, PreprocessorTree, TreeNode};

use crate::error::ClipboardError;
use crate::model::{DecisionBranchDestinationLink, Link, Shape, ShapeId, ShapeKind};
use ahash::{AHashMap, AHashSet};
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};

/// Stands for "whatever precedes the pasted content".
pub const SENTINEL_START_ID: ShapeId = i64::MIN;
/// Stands for "whatever follows the pasted content".
pub const SENTINEL_END_ID: ShapeId = i64::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub order_index: i32,
    pub label: Option<String>,
    pub destination_id: ShapeId,
}

/// The ordered branches of one copied decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPointRef {
    pub decision_id: ShapeId,
    pub branches: Vec<BranchRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessClipboardData {
    pub shapes: Vec<Shape>,
    pub links: Vec<Link>,
    pub decision_branch_destination_links: Vec<DecisionBranchDestinationLink>,
    pub decision_points: Vec<DecisionPointRef>,
    /// The content starts with a user task and may directly follow a user decision.
    pub is_pastable_after_user_decision: bool,
}

impl ProcessClipboardData {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Id of the chain head.
    pub fn first_shape_id(&self) -> Option<ShapeId> {
        self.shapes.first().map(|shape| shape.id)
    }

    /// Checks that every link and branch record stays inside the payload.
    pub fn validate(&self) -> Result<(), ClipboardError> {
        if self.shapes.is_empty() {
            return Err(ClipboardError::EmptySelection);
        }
        let ids: AHashSet<ShapeId> = self.shapes.iter().map(|shape| shape.id).collect();
        let known = |id: ShapeId| ids.contains(&id) || id == SENTINEL_END_ID;

        for link in &self.links {
            if !ids.contains(&link.source_id) {
                return Err(ClipboardError::UnknownClipboardShape(link.source_id));
            }
            if !known(link.destination_id) {
                return Err(ClipboardError::UnknownClipboardShape(link.destination_id));
            }
        }
        for entry in &self.decision_branch_destination_links {
            if !ids.contains(&entry.decision_id) {
                return Err(ClipboardError::UnknownClipboardShape(entry.decision_id));
            }
            if !known(entry.destination_id) {
                return Err(ClipboardError::UnknownClipboardShape(entry.destination_id));
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ClipboardError> {
        encode_to_vec(self, standard()).map_err(|e| ClipboardError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClipboardError> {
        decode_from_slice(bytes, standard())
            .map(|(data, _)| data)
            .map_err(|e| ClipboardError::Decode(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ClipboardError> {
        serde_json::to_string_pretty(self).map_err(|e| ClipboardError::Encode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, ClipboardError> {
        serde_json::from_str(json).map_err(|e| ClipboardError::Decode(e.to_string()))
    }

    /// Id-free description of the payload: shape kinds in canonical order and every link
    /// and branch record expressed as positions in that order. Two payloads with equal
    /// topology paste into the same structure.
    pub fn topology(&self) -> ClipboardTopology {
        let position: AHashMap<ShapeId, usize> = self
            .shapes
            .iter()
            .enumerate()
            .map(|(index, shape)| (shape.id, index))
            .collect();
        let slot = |id: ShapeId| position.get(&id).copied();

        let mut links: Vec<(Option<usize>, Option<usize>, i32)> = self
            .links
            .iter()
            .map(|l| (slot(l.source_id), slot(l.destination_id), l.order_index))
            .collect();
        links.sort_unstable();

        let mut branch_destinations: Vec<(Option<usize>, i32, Option<usize>)> = self
            .decision_branch_destination_links
            .iter()
            .map(|d| (slot(d.decision_id), d.order_index, slot(d.destination_id)))
            .collect();
        branch_destinations.sort_unstable();

        ClipboardTopology {
            kinds: self.shapes.iter().map(|shape| shape.kind).collect(),
            links,
            branch_destinations,
            pastable_after_user_decision: self.is_pastable_after_user_decision,
        }
    }
}

/// See [`ProcessClipboardData::topology`]. `None` marks the end sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardTopology {
    pub kinds: Vec<ShapeKind>,
    pub links: Vec<(Option<usize>, Option<usize>, i32)>,
    pub branch_destinations: Vec<(Option<usize>, i32, Option<usize>)>,
    pub pastable_after_user_decision: bool,
}
