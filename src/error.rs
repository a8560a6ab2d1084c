use crate::model::{ShapeId, ShapeKind};
use thiserror::Error;

/// Errors returned by structural edit operations.
///
/// Variants fall into two groups. *Rejections* are expected, user-facing outcomes
/// (an invariant would be violated); they are reported through the message sink and
/// leave the graph untouched. Everything else is a precondition violation: a caller
/// handed the editor something it should never see in practice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error(
        "Shape limit reached: adding {adding} shape(s) to {current} would exceed the limit of {limit}"
    )]
    ShapeLimitExceeded {
        current: usize,
        adding: usize,
        limit: usize,
    },

    #[error("Decision '{decision_id}' already has the maximum of {max} conditions")]
    MaxConditionsReached { decision_id: ShapeId, max: usize },

    #[error("Decision '{decision_id}' must keep at least {min} conditions")]
    MinConditionsReached { decision_id: ShapeId, min: usize },

    #[error("Deleting task '{task_id}' would leave the process without any task")]
    ProcessWouldBeEmpty { task_id: ShapeId },

    #[error("Deleting task '{task_id}' would connect two user decisions directly")]
    AdjacentUserDecisions { task_id: ShapeId },

    #[error("Branch {order_index} of decision '{decision_id}' has no recorded merge point")]
    MissingBranchDestination {
        decision_id: ShapeId,
        order_index: i32,
    },

    #[error("Clipboard content cannot be pasted directly after user decision '{decision_id}'")]
    NotPastableAfterUserDecision { decision_id: ShapeId },

    #[error("Shape '{0}' not found in the process")]
    ShapeNotFound(ShapeId),

    #[error("No link from '{source_id}' to '{destination_id}' exists in the process")]
    LinkNotFound {
        source_id: ShapeId,
        destination_id: ShapeId,
    },

    #[error("Shape '{id}' is a {found}, expected {expected}")]
    InvalidShapeKind {
        id: ShapeId,
        expected: &'static str,
        found: ShapeKind,
    },

    #[error("Cannot insert a {kind} between '{source_id}' and '{destination_id}'")]
    InvalidInsertionPoint {
        kind: ShapeKind,
        source_id: ShapeId,
        destination_id: ShapeId,
    },

    #[error("No source shapes given for an insertion before '{0}'")]
    MissingSources(ShapeId),

    #[error("Scope of '{0}' has no resolvable merge point")]
    MissingMergeMapping(ShapeId),

    #[error("Required collaborator is not configured: {0}")]
    MissingCollaborator(&'static str),

    #[error("The clipboard is empty")]
    EmptyClipboard,

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

impl EditError {
    /// True for expected, user-facing rejections; false for precondition violations.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EditError::ShapeLimitExceeded { .. }
                | EditError::MaxConditionsReached { .. }
                | EditError::MinConditionsReached { .. }
                | EditError::ProcessWouldBeEmpty { .. }
                | EditError::AdjacentUserDecisions { .. }
                | EditError::MissingBranchDestination { .. }
                | EditError::NotPastableAfterUserDecision { .. }
        )
    }
}

/// Errors raised while building or decoding a clipboard payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("The selection contains no copyable shapes")]
    EmptySelection,

    #[error("Clipboard link references shape '{0}', which is not part of the payload")]
    UnknownClipboardShape(ShapeId),

    #[error("Failed to encode clipboard payload: {0}")]
    Encode(String),

    #[error("Failed to decode clipboard payload: {0}")]
    Decode(String),
}

/// Errors reported by a file-storage collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileStoreError {
    #[error("File store request failed: {0}")]
    Request(String),

    #[error("File store request timed out")]
    TimedOut,
}

/// Errors that can occur while loading editor configuration or process files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
