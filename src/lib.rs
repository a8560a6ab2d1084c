//! # procgraph - Process Flowgraph Editing Engine
//!
//! **procgraph** holds a branching process flowgraph in memory and edits it structurally.
//! A process starts with a Start and a Precondition shape, runs through user tasks (each
//! followed by the system shapes that react to it) and through user or system decisions,
//! and finishes at a single End shape. Every decision branch records where it merges back.
//!
//! ## Core Workflow
//!
//! 1.  **Load a Process**: Read a process file with [`ProcessGraph::from_file`] or build
//!     one in code with [`Shape`] and [`Link`] values.
//! 2.  **Analyze Scopes**: [`get_scope`] and [`get_branch_scope`] compute which shapes a
//!     task, a decision or a branch owns, and where each branch merges.
//! 3.  **Edit**: A [`ProcessEditor`], created with [`ProcessEditor::builder`], inserts and
//!     deletes tasks, decisions and branches while keeping the graph well formed. A
//!     rejected edit leaves the graph unchanged and reports through the [`MessageSink`].
//! 4.  **Copy and Paste**: Selections are serialized into a self-contained
//!     [`ProcessClipboardData`] payload and can be pasted onto any link.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use procgraph::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = EditorConfig::from_file("path/to/editor.json")?;
//!     let mut graph = ProcessGraph::from_file("path/to/process.json")?;
//!
//!     let editor = ProcessEditor::builder(config.clone()).build();
//!
//!     // Insert a task pair right after the precondition.
//!     let precondition = graph.precondition_id().ok_or("no precondition")?;
//!     let next = graph.default_successor(precondition).ok_or("dangling precondition")?;
//!     let task_id = editor.insert_task(&mut graph, &[precondition], next)?;
//!
//!     // The task owns itself and its system task.
//!     let scope = get_scope(&graph, task_id);
//!     println!("Task {} owns {:?}", task_id, scope.shape_ids());
//!
//!     for problem in validate_process(&graph, &config) {
//!         println!("-> {}", problem);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`ProcessGraph::from_file`]: model::ProcessGraph::from_file
//! [`Shape`]: model::Shape
//! [`Link`]: model::Link
//! [`get_scope`]: scope::get_scope
//! [`get_branch_scope`]: scope::get_branch_scope
//! [`ProcessEditor`]: editor::ProcessEditor
//! [`ProcessEditor::builder`]: editor::ProcessEditor::builder
//! [`MessageSink`]: collab::MessageSink
//! [`ProcessClipboardData`]: clipboard::ProcessClipboardData

pub mod clipboard;
pub mod collab;
pub mod config;
pub mod editor;
pub mod error;
pub mod model;
pub mod prelude;
pub mod scope;
pub mod validation;
