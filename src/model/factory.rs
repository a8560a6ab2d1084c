use super::shape::{
    CLIENT_TYPE_KEY, HEIGHT_KEY, PersonaReference, PropertyValue, Shape, ShapeId, ShapeKind,
    WIDTH_KEY,
};
use super::graph::ProcessGraph;
use super::link::Link;
use crate::config::EditorConfig;

/// Creates fully populated shapes for the editor and the clipboard codec.
///
/// Every shape gets its persona, dimensions and client type filled in so that later
/// invariant checks classify it correctly.
#[derive(Debug, Clone)]
pub struct ShapeFactory {
    pub project_id: i64,
    pub user_persona: PersonaReference,
    pub system_persona: PersonaReference,
    task_size: (f64, f64),
    decision_size: (f64, f64),
}

impl ShapeFactory {
    pub fn new(project_id: i64, config: &EditorConfig) -> Self {
        Self {
            project_id,
            user_persona: PersonaReference {
                id: -1,
                name: "User".to_string(),
                is_system: false,
            },
            system_persona: PersonaReference {
                id: -2,
                name: "System".to_string(),
                is_system: true,
            },
            task_size: config.task_size,
            decision_size: config.decision_size,
        }
    }

    pub fn create_user_task(&self, parent_id: i64, id: ShapeId, x: f64, y: f64) -> Shape {
        self.create(ShapeKind::UserTask, parent_id, id, x, y)
    }

    pub fn create_system_task(&self, parent_id: i64, id: ShapeId, x: f64, y: f64) -> Shape {
        self.create(ShapeKind::SystemTask, parent_id, id, x, y)
    }

    pub fn create_user_decision(&self, parent_id: i64, id: ShapeId, x: f64, y: f64) -> Shape {
        self.create(ShapeKind::UserDecision, parent_id, id, x, y)
    }

    pub fn create_system_decision(&self, parent_id: i64, id: ShapeId, x: f64, y: f64) -> Shape {
        self.create(ShapeKind::SystemDecision, parent_id, id, x, y)
    }

    /// The smallest well-formed process: `Start -> Precondition -> UserTask -> SystemTask -> End`.
    /// Shapes get the ids 1 to 5 and are laid out on one row.
    pub fn new_process(&self, process_id: i64) -> ProcessGraph {
        let mut graph = ProcessGraph::new(process_id, self.project_id);
        let kinds = [
            ShapeKind::Start,
            ShapeKind::Precondition,
            ShapeKind::UserTask,
            ShapeKind::SystemTask,
            ShapeKind::End,
        ];
        for (column, kind) in kinds.into_iter().enumerate() {
            let id = column as ShapeId + 1;
            graph.add_shape(self.create(kind, process_id, id, column as f64, 0.0));
            if id > 1 {
                graph.add_link(Link::new(id - 1, id));
            }
        }
        graph
    }

    pub fn create(&self, kind: ShapeKind, parent_id: i64, id: ShapeId, x: f64, y: f64) -> Shape {
        let (name, persona, size) = match kind {
            ShapeKind::Start => ("Start", None, self.task_size),
            ShapeKind::Precondition => (
                "Precondition",
                Some(self.system_persona.clone()),
                self.task_size,
            ),
            ShapeKind::UserTask => ("User Task", Some(self.user_persona.clone()), self.task_size),
            ShapeKind::SystemTask => (
                "System Task",
                Some(self.system_persona.clone()),
                self.task_size,
            ),
            ShapeKind::UserDecision => (
                "User Decision",
                Some(self.user_persona.clone()),
                self.decision_size,
            ),
            ShapeKind::SystemDecision => (
                "System Decision",
                Some(self.system_persona.clone()),
                self.decision_size,
            ),
            ShapeKind::End => ("End", None, self.task_size),
        };

        let mut shape = Shape::new(id, kind, name);
        shape.parent_id = parent_id;
        shape.project_id = self.project_id;
        shape.persona_reference = persona;
        shape.set_position(x, y);
        shape.set_property(WIDTH_KEY, PropertyValue::Number(size.0));
        shape.set_property(HEIGHT_KEY, PropertyValue::Number(size.1));
        shape.set_property(
            CLIENT_TYPE_KEY,
            PropertyValue::Number(f64::from(kind.client_type())),
        );
        shape
    }
}
