//! Structural editing of a process graph.
//!
//! Every operation follows the same shape: look everything up, run every check, and only
//! then mutate. A rejected operation reports through the [`MessageSink`], returns an
//! [`EditError`] and leaves the graph exactly as it was. A completed operation sends one
//! notification to the [`ModelUpdateNotifier`].

mod clipboard;
mod delete;
mod insert;

pub use crate::clipboard::PasteOutcome;

use crate::collab::{
    ClipboardStore, FileStore, LogMessages, MessageSink, ModelUpdateNotifier, NoopNotifier,
};
use crate::config::EditorConfig;
use crate::error::EditError;
use crate::model::{ProcessGraph, ShapeFactory, ShapeId, ShapeKind};
use crate::scope::{ConditionKey, get_branch_scope};
use ahash::AHashSet;
use std::collections::VecDeque;
use std::sync::Arc;

pub struct ProcessEditor {
    config: EditorConfig,
    messages: Arc<dyn MessageSink>,
    notifier: Arc<dyn ModelUpdateNotifier>,
    clipboard: Option<Arc<dyn ClipboardStore>>,
    file_store: Option<Arc<dyn FileStore>>,
}

pub struct ProcessEditorBuilder {
    config: EditorConfig,
    messages: Option<Arc<dyn MessageSink>>,
    notifier: Option<Arc<dyn ModelUpdateNotifier>>,
    clipboard: Option<Arc<dyn ClipboardStore>>,
    file_store: Option<Arc<dyn FileStore>>,
}

impl ProcessEditorBuilder {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            messages: None,
            notifier: None,
            clipboard: None,
            file_store: None,
        }
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageSink>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ModelUpdateNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardStore>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn with_file_store(mut self, file_store: Arc<dyn FileStore>) -> Self {
        self.file_store = Some(file_store);
        self
    }

    /// Messages default to the `log` facade and notifications are dropped.
    pub fn build(self) -> ProcessEditor {
        ProcessEditor {
            config: self.config,
            messages: self.messages.unwrap_or_else(|| Arc::new(LogMessages)),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
            clipboard: self.clipboard,
            file_store: self.file_store,
        }
    }
}

impl ProcessEditor {
    pub fn builder(config: EditorConfig) -> ProcessEditorBuilder {
        ProcessEditorBuilder::new(config)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    fn factory(&self, graph: &ProcessGraph) -> ShapeFactory {
        ShapeFactory::new(graph.project_id, &self.config)
    }

    /// Reports a failed operation and hands the error back for returning.
    fn reject(&self, error: EditError) -> EditError {
        if error.is_rejection() {
            log::debug!("edit rejected: {}", error);
            self.messages.add_error(&error.to_string());
        } else {
            log::error!("edit precondition violated: {}", error);
        }
        error
    }

    /// Checks that `adding` more shapes fit under the limit. Returns the new total.
    fn ensure_budget(&self, graph: &ProcessGraph, adding: usize) -> Result<usize, EditError> {
        let current = graph.shape_count();
        let total = current + adding;
        if total > self.config.shape_limit {
            return Err(self.reject(EditError::ShapeLimitExceeded {
                current,
                adding,
                limit: self.config.shape_limit,
            }));
        }
        Ok(total)
    }

    /// Emitted right before mutating, once every other check has passed.
    fn warn_if_near_limit(&self, total: usize) {
        if total >= self.config.warning_threshold() {
            let message = format!(
                "The process now has {} of {} allowed shapes",
                total, self.config.shape_limit
            );
            log::warn!("{}", message);
            self.messages.add_warning(&message);
        }
    }

    fn kind_of(&self, graph: &ProcessGraph, id: ShapeId) -> Result<ShapeKind, EditError> {
        graph
            .kind_of(id)
            .ok_or_else(|| self.reject(EditError::ShapeNotFound(id)))
    }
}

/// Whether new task content may be placed on a link from `source` to `destination`.
///
/// User tasks keep their system shape directly behind them, and a system chain is never
/// split by a new user task.
pub(crate) fn accepts_task_content(source: ShapeKind, destination: ShapeKind) -> bool {
    let valid_source = match source {
        ShapeKind::Precondition
        | ShapeKind::SystemTask
        | ShapeKind::UserDecision
        | ShapeKind::SystemDecision => true,
        ShapeKind::Start | ShapeKind::UserTask | ShapeKind::End => false,
    };
    let valid_destination = match destination {
        ShapeKind::UserTask | ShapeKind::UserDecision | ShapeKind::End => true,
        ShapeKind::Start
        | ShapeKind::Precondition
        | ShapeKind::SystemTask
        | ShapeKind::SystemDecision => false,
    };
    valid_source && valid_destination
}

/// First shape reached from `id` along lowest-order links that is not a system shape.
/// `id` itself is never returned.
pub(crate) fn first_non_system_after(graph: &ProcessGraph, id: ShapeId) -> Option<ShapeId> {
    let mut steps = 0;
    let mut current = graph.default_successor(id)?;
    loop {
        match graph.kind_of(current)? {
            kind if kind.is_system() => {
                steps += 1;
                if steps > graph.shape_count() {
                    return None;
                }
                current = graph.default_successor(current)?;
            }
            _ => return Some(current),
        }
    }
}

/// Whether `to` lies on some path leaving `from`.
pub(crate) fn reaches(graph: &ProcessGraph, from: ShapeId, to: ShapeId) -> bool {
    let mut seen = AHashSet::new();
    let mut queue: VecDeque<ShapeId> = graph.next_ids(from).into_iter().collect();
    while let Some(id) = queue.pop_front() {
        if id == to {
            return true;
        }
        if seen.insert(id) {
            queue.extend(graph.next_ids(id));
        }
    }
    false
}

/// Branch records merging at `destination_id` whose branch ends at one of `source_ids`.
///
/// When new shapes are placed in front of a merge point fed by several sources, these
/// records have to move to the first new shape.
pub(crate) fn merge_entries_fed_by(
    graph: &ProcessGraph,
    source_ids: &[ShapeId],
    destination_id: ShapeId,
) -> Vec<ConditionKey> {
    graph
        .branch_destinations()
        .iter()
        .filter(|entry| entry.destination_id == destination_id)
        .filter_map(|entry| {
            let link = graph.branch_link(entry.decision_id, entry.order_index)?;
            let scope = get_branch_scope(graph, link);
            let end_id = scope.mappings.first()?.end_id?;
            source_ids
                .contains(&end_id)
                .then(|| ConditionKey::new(entry.decision_id, entry.order_index))
        })
        .collect()
}

/// Position hint for a shape placed on the link `from -> to`.
pub(crate) fn position_between(graph: &ProcessGraph, from: ShapeId, to: ShapeId) -> (f64, f64) {
    let (fx, fy) = graph.shape(from).map(|s| (s.x(), s.y())).unwrap_or_default();
    let (tx, _) = graph.shape(to).map(|s| (s.x(), s.y())).unwrap_or((fx + 1.0, fy));
    ((fx + tx) / 2.0, fy)
}
