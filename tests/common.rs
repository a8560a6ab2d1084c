//! Common test utilities for building process graphs and editors.
use procgraph::collab::{MemoryClipboard, RecordingMessages, RecordingNotifier};
use procgraph::prelude::*;
use std::sync::Arc;

/// Builds a graph with explicit ids and positions.
#[allow(dead_code)]
pub struct FixtureBuilder {
    graph: ProcessGraph,
    factory: ShapeFactory,
}

#[allow(dead_code)]
impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            graph: ProcessGraph::new(1, 1),
            factory: ShapeFactory::new(1, &EditorConfig::default()),
        }
    }

    pub fn shape(mut self, id: ShapeId, kind: ShapeKind, x: f64, y: f64) -> Self {
        self.graph.add_shape(self.factory.create(kind, 1, id, x, y));
        self
    }

    pub fn link(mut self, source_id: ShapeId, destination_id: ShapeId) -> Self {
        self.graph.add_link(Link::new(source_id, destination_id));
        self
    }

    pub fn branch(mut self, source_id: ShapeId, destination_id: ShapeId, order_index: i32) -> Self {
        let label = (order_index > 0).then(|| format!("Condition {}", order_index + 1));
        self.graph
            .add_link(Link::branch(source_id, destination_id, order_index, label));
        self
    }

    pub fn merge(mut self, decision_id: ShapeId, order_index: i32, destination_id: ShapeId) -> Self {
        self.graph
            .set_branch_destination(decision_id, order_index, destination_id);
        self
    }

    pub fn build(self) -> ProcessGraph {
        self.graph
    }
}

/// `Start(1) -> Pre(2) -> UT(3) -> ST(4) -> UT(5) -> ST(6) -> End(7)`, one column each.
#[allow(dead_code)]
pub fn linear_process() -> ProcessGraph {
    FixtureBuilder::new()
        .shape(1, ShapeKind::Start, 0.0, 0.0)
        .shape(2, ShapeKind::Precondition, 1.0, 0.0)
        .shape(3, ShapeKind::UserTask, 2.0, 0.0)
        .shape(4, ShapeKind::SystemTask, 3.0, 0.0)
        .shape(5, ShapeKind::UserTask, 4.0, 0.0)
        .shape(6, ShapeKind::SystemTask, 5.0, 0.0)
        .shape(7, ShapeKind::End, 6.0, 0.0)
        .link(1, 2)
        .link(2, 3)
        .link(3, 4)
        .link(4, 5)
        .link(5, 6)
        .link(6, 7)
        .build()
}

/// A linear process with exactly `total` shapes (at least 5).
///
/// Start is 1, Precondition 2, End 3, and task pairs count up from 10. An odd remainder
/// becomes a second system task behind the first user task.
#[allow(dead_code)]
pub fn padded_process(total: usize) -> ProcessGraph {
    assert!(total >= 5, "a process needs at least 5 shapes");
    let pairs = (total - 3) / 2;
    let extra_system_task = (total - 3) % 2 == 1;

    let mut builder = FixtureBuilder::new()
        .shape(1, ShapeKind::Start, 0.0, 0.0)
        .shape(2, ShapeKind::Precondition, 1.0, 0.0)
        .link(1, 2);
    let mut previous = 2;
    let mut column = 2.0;
    for pair in 0..pairs {
        let user_task = 10 + 2 * pair as ShapeId;
        builder = builder
            .shape(user_task, ShapeKind::UserTask, column, 0.0)
            .shape(user_task + 1, ShapeKind::SystemTask, column + 1.0, 0.0)
            .link(previous, user_task)
            .link(user_task, user_task + 1);
        previous = user_task + 1;
        column += 2.0;
        if pair == 0 && extra_system_task {
            builder = builder
                .shape(9, ShapeKind::SystemTask, column, 0.0)
                .link(previous, 9);
            previous = 9;
            column += 1.0;
        }
    }
    builder
        .shape(3, ShapeKind::End, column, 0.0)
        .link(previous, 3)
        .build()
}

/// `Start(1) -> Pre(2) -> UD(3)` with `branches` branches. Branch `n` is
/// `UT(10 + 2n) -> ST(11 + 2n) -> End(99)` and merges at End.
#[allow(dead_code)]
pub fn user_decision_process(branches: usize) -> ProcessGraph {
    let mut builder = FixtureBuilder::new()
        .shape(1, ShapeKind::Start, 0.0, 0.0)
        .shape(2, ShapeKind::Precondition, 1.0, 0.0)
        .shape(3, ShapeKind::UserDecision, 2.0, 0.0)
        .shape(99, ShapeKind::End, 5.0, 0.0)
        .link(1, 2)
        .link(2, 3);
    for branch in 0..branches {
        let order = branch as i32;
        let user_task = 10 + 2 * branch as ShapeId;
        let row = branch as f64;
        builder = builder
            .shape(user_task, ShapeKind::UserTask, 3.0, row)
            .shape(user_task + 1, ShapeKind::SystemTask, 4.0, row)
            .branch(3, user_task, order)
            .link(user_task, user_task + 1)
            .link(user_task + 1, 99);
        if order > 0 {
            builder = builder.merge(3, order, 99);
        }
    }
    builder.build()
}

/// `Pre(2) -> UT(3) -> SD(4)`; SD(4) b0: ST(5) -> UT(6), b1: ST(7) -> SD(8) merging at SD(8);
/// `UT(6) -> SD(8)`; SD(8) b0: ST(9) -> End(20), b1: ST(10) -> End(20) merging at End.
#[allow(dead_code)]
pub fn merging_system_decision_process() -> ProcessGraph {
    FixtureBuilder::new()
        .shape(1, ShapeKind::Start, 0.0, 0.0)
        .shape(2, ShapeKind::Precondition, 1.0, 0.0)
        .shape(3, ShapeKind::UserTask, 2.0, 0.0)
        .shape(4, ShapeKind::SystemDecision, 3.0, 0.0)
        .shape(5, ShapeKind::SystemTask, 4.0, 0.0)
        .shape(6, ShapeKind::UserTask, 5.0, 0.0)
        .shape(7, ShapeKind::SystemTask, 4.0, 1.0)
        .shape(8, ShapeKind::SystemDecision, 6.0, 0.0)
        .shape(9, ShapeKind::SystemTask, 7.0, 0.0)
        .shape(10, ShapeKind::SystemTask, 7.0, 1.0)
        .shape(20, ShapeKind::End, 8.0, 0.0)
        .link(1, 2)
        .link(2, 3)
        .link(3, 4)
        .branch(4, 5, 0)
        .branch(4, 7, 1)
        .merge(4, 1, 8)
        .link(5, 6)
        .link(7, 8)
        .link(6, 8)
        .branch(8, 9, 0)
        .branch(8, 10, 1)
        .merge(8, 1, 20)
        .link(9, 20)
        .link(10, 20)
        .build()
}

/// An editor whose messages and notifications are recorded.
#[allow(dead_code)]
pub struct TestEditor {
    pub editor: ProcessEditor,
    pub messages: Arc<RecordingMessages>,
    pub notifier: Arc<RecordingNotifier>,
    pub clipboard: Arc<MemoryClipboard>,
}

#[allow(dead_code)]
pub fn test_editor(config: EditorConfig) -> TestEditor {
    let messages = Arc::new(RecordingMessages::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clipboard = Arc::new(MemoryClipboard::new());
    let editor = ProcessEditor::builder(config)
        .with_messages(messages.clone())
        .with_notifier(notifier.clone())
        .with_clipboard(clipboard.clone())
        .build();
    TestEditor {
        editor,
        messages,
        notifier,
        clipboard,
    }
}

/// Asserts that the graph satisfies every editor invariant.
#[allow(dead_code)]
pub fn assert_valid(graph: &ProcessGraph) {
    let problems = validate_process(graph, &EditorConfig::default());
    assert!(problems.is_empty(), "invalid process: {:?}", problems);
}

/// Asserts that no link or merge record references a shape outside the graph.
#[allow(dead_code)]
pub fn assert_no_dangling_references(graph: &ProcessGraph) {
    for link in graph.links() {
        assert!(
            graph.contains(link.source_id) && graph.contains(link.destination_id),
            "dangling link {:?}",
            link
        );
    }
    for entry in graph.branch_destinations() {
        assert!(
            graph.contains(entry.decision_id) && graph.contains(entry.destination_id),
            "dangling merge record {:?}",
            entry
        );
    }
}
