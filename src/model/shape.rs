use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable shape identifier. Negative ids belong to shapes that have not been persisted yet.
pub type ShapeId = i64;

pub const X_KEY: &str = "x";
pub const Y_KEY: &str = "y";
pub const WIDTH_KEY: &str = "width";
pub const HEIGHT_KEY: &str = "height";
pub const CLIENT_TYPE_KEY: &str = "clientType";
pub const IMAGE_ID_KEY: &str = "imageId";
pub const IMAGE_URL_KEY: &str = "associatedImageUrl";

/// The closed taxonomy of shapes a process may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Start,
    Precondition,
    UserTask,
    SystemTask,
    UserDecision,
    SystemDecision,
    End,
}

impl ShapeKind {
    pub fn is_decision(self) -> bool {
        matches!(self, ShapeKind::UserDecision | ShapeKind::SystemDecision)
    }

    /// System shapes are the ones that belong to a preceding user task.
    pub fn is_system(self) -> bool {
        matches!(self, ShapeKind::SystemTask | ShapeKind::SystemDecision)
    }

    /// Start, Precondition and End frame the process and are never owned by a scope.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ShapeKind::Start | ShapeKind::Precondition | ShapeKind::End
        )
    }

    /// Numeric client type written into the `clientType` property slot.
    pub fn client_type(self) -> i32 {
        match self {
            ShapeKind::Start => 1,
            ShapeKind::UserTask => 2,
            ShapeKind::SystemTask => 3,
            ShapeKind::Precondition => 4,
            ShapeKind::UserDecision => 5,
            ShapeKind::SystemDecision => 6,
            ShapeKind::End => 7,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Start => "Start",
            ShapeKind::Precondition => "Precondition",
            ShapeKind::UserTask => "UserTask",
            ShapeKind::SystemTask => "SystemTask",
            ShapeKind::UserDecision => "UserDecision",
            ShapeKind::SystemDecision => "SystemDecision",
            ShapeKind::End => "End",
        };
        write!(f, "{}", name)
    }
}

/// A value stored in a shape's property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

// Manual implementation to handle f64
impl Eq for PropertyValue {}

// Manual implementation to handle f64 by hashing its bits
impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            PropertyValue::Number(n) => n.to_bits().hash(state),
            PropertyValue::Text(s) => s.hash(state),
            PropertyValue::Bool(b) => b.hash(state),
            PropertyValue::Null => {}
        }
    }
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            PropertyValue::Text(s) => write!(f, "{}", s),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

/// Who performs a task: a user persona or the system persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaReference {
    pub id: i64,
    pub name: String,
    pub is_system: bool,
}

/// A node of the process flowgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub name: String,
    pub parent_id: i64,
    pub project_id: i64,
    pub persona_reference: Option<PersonaReference>,
    pub associated_artifact_id: Option<i64>,
    #[serde(default)]
    pub property_values: AHashMap<String, PropertyValue>,
}

impl Shape {
    pub fn new(id: ShapeId, kind: ShapeKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            parent_id: 0,
            project_id: 0,
            persona_reference: None,
            associated_artifact_id: None,
            property_values: AHashMap::new(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.property_values.get(key)
    }

    pub fn set_property(&mut self, key: &str, value: PropertyValue) {
        self.property_values.insert(key.to_string(), value);
    }

    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.property_values.remove(key)
    }

    pub fn x(&self) -> f64 {
        self.number(X_KEY)
    }

    pub fn y(&self) -> f64 {
        self.number(Y_KEY)
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.set_property(X_KEY, PropertyValue::Number(x));
        self.set_property(Y_KEY, PropertyValue::Number(y));
    }

    /// Left-to-right, top-to-bottom ordering key used by the clipboard codec.
    pub fn position_key(&self) -> f64 {
        self.x() * 1000.0 + self.y()
    }

    fn number(&self, key: &str) -> f64 {
        self.property(key)
            .and_then(PropertyValue::as_number)
            .unwrap_or(0.0)
    }
}
