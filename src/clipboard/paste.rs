use super::{ProcessClipboardData, SENTINEL_END_ID};
use crate::error::ClipboardError;
use crate::model::{Link, ProcessGraph, ShapeId};
use crate::scope::ConditionKey;
use ahash::AHashMap;

/// What a paste added to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteOutcome {
    pub first_id: ShapeId,
    /// Payload id to new graph id.
    pub id_map: AHashMap<ShapeId, ShapeId>,
}

impl PasteOutcome {
    pub fn new_ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.id_map.values().copied()
    }
}

/// Inserts the payload between `source_ids` and `destination_id`.
///
/// Shapes get fresh temporary ids, ascending in payload order, and positions re-anchored
/// at `anchor` relative to the chain head. `moved_entries` are branch records that move from the destination to
/// the first pasted shape. The payload is validated before anything is inserted.
pub(crate) fn paste_into(
    graph: &mut ProcessGraph,
    data: &ProcessClipboardData,
    source_ids: &[ShapeId],
    destination_id: ShapeId,
    anchor: (f64, f64),
    moved_entries: &[ConditionKey],
) -> Result<PasteOutcome, ClipboardError> {
    data.validate()?;
    let origin = data
        .shapes
        .first()
        .map(|shape| (shape.x(), shape.y()))
        .ok_or(ClipboardError::EmptySelection)?;

    // Temporary ids count down; hand them out ascending so pasted ids keep payload order.
    let mut new_ids: Vec<ShapeId> = data.shapes.iter().map(|_| graph.allocate_id()).collect();
    new_ids.sort_unstable();
    let id_map: AHashMap<ShapeId, ShapeId> = data
        .shapes
        .iter()
        .map(|shape| shape.id)
        .zip(new_ids)
        .collect();
    let remap = |id: ShapeId| -> ShapeId {
        if id == SENTINEL_END_ID {
            destination_id
        } else {
            id_map.get(&id).copied().unwrap_or(destination_id)
        }
    };

    let mut first_id = destination_id;
    for (index, shape) in data.shapes.iter().enumerate() {
        let mut pasted = shape.clone();
        pasted.id = remap(shape.id);
        pasted.parent_id = graph.id;
        pasted.project_id = graph.project_id;
        pasted.set_position(
            anchor.0 + (shape.x() - origin.0),
            anchor.1 + (shape.y() - origin.1),
        );
        if index == 0 {
            first_id = pasted.id;
        }
        graph.add_shape(pasted);
    }

    for link in &data.links {
        graph.add_link(Link::branch(
            remap(link.source_id),
            remap(link.destination_id),
            link.order_index,
            link.label.clone(),
        ));
    }
    for entry in &data.decision_branch_destination_links {
        graph.set_branch_destination(
            remap(entry.decision_id),
            entry.order_index,
            remap(entry.destination_id),
        );
    }

    for &source_id in source_ids {
        graph.redirect_links(source_id, destination_id, first_id);
    }
    for key in moved_entries {
        graph.set_branch_destination(key.decision_id, key.order_index, first_id);
    }

    Ok(PasteOutcome { first_id, id_map })
}
