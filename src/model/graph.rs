use super::link::{DecisionBranchDestinationLink, Link};
use super::shape::{Shape, ShapeId, ShapeKind};
use crate::error::ConfigError;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::fs;

/// Plain, serializable form of a process. This is what process files contain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Process {
    pub id: i64,
    pub project_id: i64,
    pub shapes: Vec<Shape>,
    pub links: Vec<Link>,
    #[serde(default)]
    pub decision_branch_destination_links: Vec<DecisionBranchDestinationLink>,
}

/// The in-memory process flowgraph an editing session mutates.
///
/// Shapes live in an arena indexed by id; links and branch-destination records are kept
/// in insertion order. The graph only offers lookup and mutation primitives, every
/// algorithm lives in `scope`, `editor` or `clipboard`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Process", into = "Process")]
pub struct ProcessGraph {
    pub id: i64,
    pub project_id: i64,
    shapes: Vec<Shape>,
    index: AHashMap<ShapeId, usize>,
    links: Vec<Link>,
    destinations: Vec<DecisionBranchDestinationLink>,
    last_temp_id: ShapeId,
}

impl From<Process> for ProcessGraph {
    fn from(process: Process) -> Self {
        let mut graph = ProcessGraph::new(process.id, process.project_id);
        for shape in process.shapes {
            graph.add_shape(shape);
        }
        graph.links = process.links;
        graph.destinations = process.decision_branch_destination_links;
        graph
    }
}

impl From<ProcessGraph> for Process {
    fn from(graph: ProcessGraph) -> Self {
        Process {
            id: graph.id,
            project_id: graph.project_id,
            shapes: graph.shapes,
            links: graph.links,
            decision_branch_destination_links: graph.destinations,
        }
    }
}

impl ProcessGraph {
    pub fn new(id: i64, project_id: i64) -> Self {
        Self {
            id,
            project_id,
            ..Default::default()
        }
    }

    /// Loads a process from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let process: Process = serde_json::from_str(json)?;
        Ok(process.into())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // --- Shapes ---

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.index.get(&id).map(|&slot| &self.shapes[slot])
    }

    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        match self.index.get(&id) {
            Some(&slot) => Some(&mut self.shapes[slot]),
            None => None,
        }
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn kind_of(&self, id: ShapeId) -> Option<ShapeKind> {
        self.shape(id).map(|shape| shape.kind)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    /// Ids of all shapes of the given kind, ascending.
    pub fn ids_of_kind(&self, kind: ShapeKind) -> Vec<ShapeId> {
        let mut ids: Vec<ShapeId> = self
            .shapes
            .iter()
            .filter(|shape| shape.kind == kind)
            .map(|shape| shape.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Inserts a shape, replacing any shape that already uses its id.
    pub fn add_shape(&mut self, shape: Shape) {
        self.last_temp_id = self.last_temp_id.min(shape.id.min(0));
        match self.index.get(&shape.id) {
            Some(&slot) => self.shapes[slot] = shape,
            None => {
                self.index.insert(shape.id, self.shapes.len());
                self.shapes.push(shape);
            }
        }
    }

    /// Removes a shape. Links and branch records touching it are left to the caller.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        let slot = self.index.remove(&id)?;
        let removed = self.shapes.swap_remove(slot);
        if let Some(moved) = self.shapes.get(slot) {
            self.index.insert(moved.id, slot);
        }
        Some(removed)
    }

    /// Hands out the next temporary (negative) id.
    pub fn allocate_id(&mut self) -> ShapeId {
        self.last_temp_id -= 1;
        self.last_temp_id
    }

    pub fn start_id(&self) -> Option<ShapeId> {
        self.first_of_kind(ShapeKind::Start)
    }

    pub fn precondition_id(&self) -> Option<ShapeId> {
        self.first_of_kind(ShapeKind::Precondition)
    }

    pub fn end_id(&self) -> Option<ShapeId> {
        self.first_of_kind(ShapeKind::End)
    }

    fn first_of_kind(&self, kind: ShapeKind) -> Option<ShapeId> {
        self.shapes
            .iter()
            .find(|shape| shape.kind == kind)
            .map(|shape| shape.id)
    }

    // --- Links ---

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Outgoing links of a shape, ordered by branch order.
    pub fn outgoing(&self, id: ShapeId) -> Vec<&Link> {
        let mut links: Vec<&Link> = self.links.iter().filter(|l| l.source_id == id).collect();
        links.sort_by_key(|l| l.order_index);
        links
    }

    pub fn incoming(&self, id: ShapeId) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|l| l.destination_id == id)
            .collect()
    }

    pub fn next_ids(&self, id: ShapeId) -> Vec<ShapeId> {
        self.outgoing(id)
            .into_iter()
            .map(|l| l.destination_id)
            .collect()
    }

    /// Distinct predecessors of a shape, in link order.
    pub fn previous_ids(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut seen = AHashSet::new();
        self.incoming(id)
            .into_iter()
            .map(|l| l.source_id)
            .filter(|source| seen.insert(*source))
            .collect()
    }

    /// Destination of the lowest-order outgoing link.
    pub fn default_successor(&self, id: ShapeId) -> Option<ShapeId> {
        self.outgoing(id).first().map(|l| l.destination_id)
    }

    pub fn branch_link(&self, decision_id: ShapeId, order_index: i32) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.source_id == decision_id && l.order_index == order_index)
    }

    pub fn branch_count(&self, decision_id: ShapeId) -> usize {
        self.links
            .iter()
            .filter(|l| l.source_id == decision_id)
            .count()
    }

    pub fn next_order_index(&self, decision_id: ShapeId) -> i32 {
        self.links
            .iter()
            .filter(|l| l.source_id == decision_id)
            .map(|l| l.order_index + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }

    /// Points every link `source -> old_destination` at `new_destination`, in place.
    pub fn redirect_links(
        &mut self,
        source_id: ShapeId,
        old_destination: ShapeId,
        new_destination: ShapeId,
    ) -> usize {
        let mut changed = 0;
        for link in self
            .links
            .iter_mut()
            .filter(|l| l.source_id == source_id && l.destination_id == old_destination)
        {
            link.destination_id = new_destination;
            changed += 1;
        }
        changed
    }

    /// Points the branch `(source, order_index)` at `new_destination`, in place.
    pub fn redirect_branch(
        &mut self,
        source_id: ShapeId,
        order_index: i32,
        new_destination: ShapeId,
    ) -> bool {
        match self
            .links
            .iter_mut()
            .find(|l| l.source_id == source_id && l.order_index == order_index)
        {
            Some(link) => {
                link.destination_id = new_destination;
                true
            }
            None => false,
        }
    }

    pub fn remove_branch_link(&mut self, source_id: ShapeId, order_index: i32) -> Option<Link> {
        let position = self
            .links
            .iter()
            .position(|l| l.source_id == source_id && l.order_index == order_index)?;
        Some(self.links.remove(position))
    }

    /// Drops every link that starts or ends at one of `ids`.
    pub fn remove_links_touching(&mut self, ids: &AHashSet<ShapeId>) -> usize {
        let before = self.links.len();
        self.links
            .retain(|l| !ids.contains(&l.source_id) && !ids.contains(&l.destination_id));
        before - self.links.len()
    }

    // --- Decision branch destinations ---

    pub fn branch_destinations(&self) -> &[DecisionBranchDestinationLink] {
        &self.destinations
    }

    pub fn branch_destination(&self, decision_id: ShapeId, order_index: i32) -> Option<ShapeId> {
        self.destinations
            .iter()
            .find(|d| d.decision_id == decision_id && d.order_index == order_index)
            .map(|d| d.destination_id)
    }

    /// Inserts or updates the merge point of a branch.
    pub fn set_branch_destination(
        &mut self,
        decision_id: ShapeId,
        order_index: i32,
        destination_id: ShapeId,
    ) {
        match self
            .destinations
            .iter_mut()
            .find(|d| d.decision_id == decision_id && d.order_index == order_index)
        {
            Some(existing) => existing.destination_id = destination_id,
            None => self.destinations.push(DecisionBranchDestinationLink {
                decision_id,
                order_index,
                destination_id,
            }),
        }
    }

    pub fn remove_branch_destination(&mut self, decision_id: ShapeId, order_index: i32) -> bool {
        let before = self.destinations.len();
        self.destinations
            .retain(|d| !(d.decision_id == decision_id && d.order_index == order_index));
        before != self.destinations.len()
    }

    pub fn remove_branch_destinations_of(&mut self, decision_id: ShapeId) -> usize {
        let before = self.destinations.len();
        self.destinations.retain(|d| d.decision_id != decision_id);
        before - self.destinations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_graph() -> ProcessGraph {
        let mut graph = ProcessGraph::new(1, 7);
        graph.add_shape(Shape::new(1, ShapeKind::Start, "start"));
        graph.add_shape(Shape::new(2, ShapeKind::UserDecision, "decide"));
        graph.add_shape(Shape::new(3, ShapeKind::End, "end"));
        graph.add_link(Link::new(1, 2));
        graph.add_link(Link::branch(2, 3, 1, Some("no".into())));
        graph.add_link(Link::branch(2, 3, 0, Some("yes".into())));
        graph.set_branch_destination(2, 1, 3);
        graph
    }

    #[test]
    fn outgoing_links_are_ordered_by_branch() {
        let graph = small_graph();
        let orders: Vec<i32> = graph.outgoing(2).iter().map(|l| l.order_index).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(graph.next_order_index(2), 2);
        assert_eq!(graph.previous_ids(3), vec![2]);
    }

    #[test]
    fn removing_a_shape_keeps_the_index_consistent() {
        let mut graph = small_graph();
        assert!(graph.remove_shape(1).is_some());
        assert_eq!(graph.shape(3).map(|s| s.kind), Some(ShapeKind::End));
        assert_eq!(graph.shape(2).map(|s| s.kind), Some(ShapeKind::UserDecision));
        assert!(graph.shape(1).is_none());
        assert_eq!(graph.shape_count(), 2);
    }

    #[test]
    fn allocated_ids_are_negative_and_unique() {
        let mut graph = small_graph();
        graph.add_shape(Shape::new(-4, ShapeKind::UserTask, "draft"));
        let first = graph.allocate_id();
        let second = graph.allocate_id();
        assert_eq!(first, -5);
        assert_eq!(second, -6);
    }

    #[test]
    fn branch_destination_upserts() {
        let mut graph = small_graph();
        graph.set_branch_destination(2, 1, 1);
        assert_eq!(graph.branch_destination(2, 1), Some(1));
        assert_eq!(graph.branch_destinations().len(), 1);
        assert!(graph.remove_branch_destination(2, 1));
        assert!(graph.branch_destination(2, 1).is_none());
    }

    #[test]
    fn json_round_trip_rebuilds_the_index() {
        let graph = small_graph();
        let json = graph.to_json().expect("serialize");
        let restored = ProcessGraph::from_json(&json).expect("deserialize");
        assert_eq!(restored.shape_count(), 3);
        assert_eq!(restored.kind_of(2), Some(ShapeKind::UserDecision));
        assert_eq!(restored.branch_destination(2, 1), Some(3));
    }
}
