//! Prelude module for convenient imports
//!
//! Re-exports the types needed to load, analyze and edit a process without importing
//! each module individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use procgraph::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let graph = ProcessGraph::from_file("path/to/process.json")?;
//! let start = graph.start_id().ok_or("no start shape")?;
//! let scope = get_scope(&graph, start);
//! println!("Start owns {} shape(s)", scope.len());
//! # Ok(())
//! # }
//! ```

// Graph model
pub use crate::model::{
    DecisionBranchDestinationLink, Link, ProcessGraph, PropertyValue, Shape, ShapeFactory,
    ShapeId, ShapeKind,
};

// Scope analysis
pub use crate::scope::{ConditionContext, ConditionKey, ScopeContext, get_branch_scope, get_scope};

// Editing and clipboard
pub use crate::clipboard::{ProcessClipboardData, build_clipboard_data};
pub use crate::editor::{PasteOutcome, ProcessEditor};

// Collaborators
pub use crate::collab::{
    ChangeKind, ClipboardStore, FileStore, LogMessages, MemoryClipboard, MessageSink,
    ModelUpdateNotifier,
};

// Configuration and validation
pub use crate::config::EditorConfig;
pub use crate::validation::{ValidationError, validate_process};

// Error types
pub use crate::error::{ClipboardError, ConfigError, EditError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
