//! Property tests: random edit sequences keep a process well formed, and copied content
//! keeps its shape through paste.
mod common;
use common::*;
use procgraph::prelude::*;
use proptest::prelude::*;
use proptest::sample::Index;

#[derive(Debug, Clone, Copy)]
enum Insertion {
    Task,
    UserDecision,
    SystemDecision,
    Condition,
    LoopBack,
}

fn insertion() -> impl Strategy<Value = Insertion> {
    prop_oneof![
        Just(Insertion::Task),
        Just(Insertion::UserDecision),
        Just(Insertion::SystemDecision),
        Just(Insertion::Condition),
        Just(Insertion::LoopBack),
    ]
}

#[derive(Debug, Clone, Copy)]
enum Edit {
    Insert(Insertion),
    DeleteTask,
    DeleteDecision,
    DeleteBranch,
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => insertion().prop_map(Edit::Insert),
        1 => Just(Edit::DeleteTask),
        1 => Just(Edit::DeleteDecision),
        1 => Just(Edit::DeleteBranch),
    ]
}

fn links_where(
    graph: &ProcessGraph,
    accept: impl Fn(ShapeKind, ShapeKind) -> bool,
) -> Vec<Link> {
    graph
        .links()
        .iter()
        .filter(|link| {
            match (graph.kind_of(link.source_id), graph.kind_of(link.destination_id)) {
                (Some(source), Some(destination)) => accept(source, destination),
                _ => false,
            }
        })
        .cloned()
        .collect()
}

fn task_slots(graph: &ProcessGraph) -> Vec<Link> {
    links_where(graph, |source, destination| {
        matches!(source, ShapeKind::Precondition | ShapeKind::SystemTask)
            && matches!(
                destination,
                ShapeKind::UserTask | ShapeKind::UserDecision | ShapeKind::End
            )
    })
}

fn decision_ids(graph: &ProcessGraph) -> Vec<ShapeId> {
    let mut ids = graph.ids_of_kind(ShapeKind::UserDecision);
    ids.extend(graph.ids_of_kind(ShapeKind::SystemDecision));
    ids
}

/// User shapes with a path into `id`, nearest first.
fn user_shapes_upstream_of(graph: &ProcessGraph, id: ShapeId) -> Vec<ShapeId> {
    let mut seen: Vec<ShapeId> = Vec::new();
    let mut queue: Vec<ShapeId> = graph.previous_ids(id);
    while !queue.is_empty() {
        let current = queue.remove(0);
        if seen.contains(&current) {
            continue;
        }
        seen.push(current);
        queue.extend(graph.previous_ids(current));
    }
    seen.into_iter()
        .filter(|&shape_id| {
            matches!(
                graph.kind_of(shape_id),
                Some(ShapeKind::UserTask | ShapeKind::UserDecision)
            )
        })
        .collect()
}

/// First shape after `id` on lowest-order links that is not a system shape.
fn user_shape_after(graph: &ProcessGraph, id: ShapeId) -> Option<ShapeId> {
    let mut current = graph.default_successor(id)?;
    for _ in 0..graph.shape_count() {
        if !graph.kind_of(current)?.is_system() {
            return Some(current);
        }
        current = graph.default_successor(current)?;
    }
    None
}

/// Applies one insertion at the spot `pick` selects. `None` when there is no spot.
fn apply(
    editor: &ProcessEditor,
    graph: &mut ProcessGraph,
    kind: Insertion,
    pick: &Index,
) -> Option<std::result::Result<(), EditError>> {
    let candidates = match kind {
        Insertion::Task => task_slots(graph),
        Insertion::UserDecision => links_where(graph, |source, destination| {
            matches!(source, ShapeKind::Precondition | ShapeKind::SystemTask)
                && matches!(destination, ShapeKind::UserTask | ShapeKind::End)
        }),
        Insertion::SystemDecision => links_where(graph, |source, destination| {
            matches!(source, ShapeKind::UserTask | ShapeKind::SystemDecision)
                && matches!(destination, ShapeKind::SystemTask | ShapeKind::SystemDecision)
        }),
        Insertion::Condition | Insertion::LoopBack => {
            let decisions = decision_ids(graph);
            if decisions.is_empty() {
                return None;
            }
            let decision_id = *pick.get(&decisions);
            let merge_id = match kind {
                Insertion::LoopBack => {
                    let upstream = user_shapes_upstream_of(graph, decision_id);
                    if upstream.is_empty() {
                        return None;
                    }
                    *pick.get(&upstream)
                }
                _ => graph.branch_destination(decision_id, 1)?,
            };
            return Some(
                editor
                    .insert_decision_condition(graph, decision_id, None, merge_id)
                    .map(drop),
            );
        }
    };
    if candidates.is_empty() {
        return None;
    }
    let link = pick.get(&candidates);
    Some(match kind {
        Insertion::Task => editor
            .insert_task(graph, &[link.source_id], link.destination_id)
            .map(drop),
        Insertion::UserDecision => editor.insert_user_decision(graph, link).map(drop),
        Insertion::SystemDecision => editor.insert_system_decision(graph, link).map(drop),
        Insertion::Condition | Insertion::LoopBack => Ok(()),
    })
}

/// Applies one edit of any kind. `None` when there is nothing to edit.
fn apply_edit(
    editor: &ProcessEditor,
    graph: &mut ProcessGraph,
    edit: Edit,
    pick: &Index,
) -> Option<std::result::Result<(), EditError>> {
    match edit {
        Edit::Insert(kind) => apply(editor, graph, kind, pick),
        Edit::DeleteTask => {
            let tasks = graph.ids_of_kind(ShapeKind::UserTask);
            if tasks.is_empty() {
                return None;
            }
            Some(editor.delete_user_task(graph, *pick.get(&tasks)))
        }
        Edit::DeleteDecision => {
            let decisions = decision_ids(graph);
            if decisions.is_empty() {
                return None;
            }
            Some(editor.delete_decision(graph, *pick.get(&decisions)))
        }
        Edit::DeleteBranch => {
            let branches: Vec<Link> = graph
                .links()
                .iter()
                .filter(|link| !link.is_default())
                .filter(|link| graph.kind_of(link.source_id).is_some_and(|k| k.is_decision()))
                .cloned()
                .collect();
            if branches.is_empty() {
                return None;
            }
            Some(editor.delete_decision_branch(graph, pick.get(&branches)))
        }
    }
}

fn grown_process(steps: &[(Insertion, Index)]) -> (TestEditor, ProcessGraph) {
    let config = EditorConfig::default();
    let t = test_editor(config.clone());
    let mut graph = ShapeFactory::new(1, &config).new_process(1);
    for (kind, pick) in steps {
        let _ = apply(&t.editor, &mut graph, *kind, pick);
    }
    (t, graph)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: every insertion leaves a valid process inside the configured limits
    #[test]
    fn prop_insertions_keep_the_process_valid(
        steps in prop::collection::vec((insertion(), any::<Index>()), 1..40)
    ) {
        let config = EditorConfig::default();
        let t = test_editor(config.clone());
        let mut graph = ShapeFactory::new(1, &config).new_process(1);

        for (kind, pick) in &steps {
            let before = graph.shape_count();
            let _ = apply(&t.editor, &mut graph, *kind, pick);

            prop_assert!(graph.shape_count() >= before);
            prop_assert!(graph.shape_count() <= config.shape_limit);
            let problems = validate_process(&graph, &config);
            prop_assert!(problems.is_empty(), "after {:?}: {:?}", kind, problems);
            for decision in graph.shapes().filter(|s| s.kind.is_decision()) {
                let branches = graph.branch_count(decision.id);
                prop_assert!((2..=10).contains(&branches));
            }
        }
    }

    /// Property: deleting a freshly inserted task restores the links it was placed on
    #[test]
    fn prop_insert_then_delete_task_restores_the_process(
        steps in prop::collection::vec((insertion(), any::<Index>()), 0..25),
        slot in any::<Index>(),
    ) {
        let (t, mut graph) = grown_process(&steps);
        let slots = task_slots(&graph);
        prop_assume!(!slots.is_empty());
        let link = slot.get(&slots).clone();
        let shapes_before = graph.shape_count();
        let links_before = graph.links().len();

        let inserted = t.editor.insert_task(&mut graph, &[link.source_id], link.destination_id);
        prop_assume!(inserted.is_ok());
        let task_id = inserted.expect("checked above");
        t.editor
            .delete_user_task(&mut graph, task_id)
            .expect("a fresh task can always be deleted");

        prop_assert_eq!(graph.shape_count(), shapes_before);
        prop_assert_eq!(graph.links().len(), links_before);
        let restored = graph
            .branch_link(link.source_id, link.order_index)
            .map(|l| l.destination_id);
        prop_assert_eq!(restored, Some(link.destination_id));
        assert_valid(&graph);
    }

    /// Property: a decision keeps between 2 and 10 branches and one merge record per
    /// non-default branch, whatever mix of added and deleted branches it sees
    #[test]
    fn prop_branch_count_stays_within_bounds(
        initial in 2..=10usize,
        edits in prop::collection::vec((any::<bool>(), any::<Index>()), 1..30)
    ) {
        let config = EditorConfig::default();
        let t = test_editor(config.clone());
        let mut graph = user_decision_process(initial);

        for (add, pick) in &edits {
            let before = graph.branch_count(3);
            let result = if *add {
                t.editor.insert_decision_condition(&mut graph, 3, None, 99).map(drop)
            } else {
                let branches: Vec<Link> = graph
                    .outgoing(3)
                    .into_iter()
                    .filter(|link| !link.is_default())
                    .cloned()
                    .collect();
                let link = pick.get(&branches).clone();
                t.editor.delete_decision_branch(&mut graph, &link)
            };

            let after = graph.branch_count(3);
            match (&result, *add) {
                (Ok(()), true) => prop_assert_eq!(after, before + 1),
                (Ok(()), false) => prop_assert_eq!(after, before - 1),
                (Err(_), _) => prop_assert_eq!(after, before),
            }
            prop_assert!((2..=10).contains(&after));
            prop_assert_eq!(graph.branch_destinations().len(), after - 1);
            prop_assert!(validate_process(&graph, &config).is_empty());
        }
    }

    /// Property: any mix of insertions, loop-backs and deletions leaves a valid process,
    /// and a rejected edit leaves the graph untouched
    #[test]
    fn prop_mixed_edits_keep_the_process_valid(
        edits in prop::collection::vec((edit(), any::<Index>()), 1..50)
    ) {
        let config = EditorConfig::default();
        let t = test_editor(config.clone());
        let mut graph = ShapeFactory::new(1, &config).new_process(1);

        for (edit, pick) in &edits {
            let before = graph.to_json().expect("serialize");
            let Some(result) = apply_edit(&t.editor, &mut graph, *edit, pick) else {
                continue;
            };

            if result.is_err() {
                prop_assert_eq!(graph.to_json().expect("serialize"), before, "after {:?}", edit);
            }
            let problems = validate_process(&graph, &config);
            prop_assert!(problems.is_empty(), "after {:?}: {:?}", edit, problems);
            assert_no_dangling_references(&graph);
        }
    }

    /// Property: copying a pasted copy gives back the payload that was pasted
    #[test]
    fn prop_copy_paste_copy_keeps_the_topology(
        steps in prop::collection::vec((insertion(), any::<Index>()), 0..25),
        task in any::<Index>(),
        extend in any::<bool>(),
        slot in any::<Index>(),
    ) {
        let (t, mut graph) = grown_process(&steps);
        let tasks = graph.ids_of_kind(ShapeKind::UserTask);
        prop_assume!(!tasks.is_empty());
        let task_id = *task.get(&tasks);
        let mut selection = vec![task_id];
        if extend {
            if let Some(next) = user_shape_after(&graph, task_id) {
                if next != task_id
                    && matches!(
                        graph.kind_of(next),
                        Some(ShapeKind::UserTask | ShapeKind::UserDecision)
                    )
                {
                    selection.push(next);
                }
            }
        }

        let first = tokio_test::block_on(t.editor.copy(&graph, &selection)).expect("copy");
        let slots = task_slots(&graph);
        prop_assume!(!slots.is_empty());
        let link = slot.get(&slots).clone();
        let pasted = t.editor.paste(&mut graph, &[link.source_id], link.destination_id);
        prop_assume!(pasted.is_ok());
        let outcome = pasted.expect("checked above");
        assert_valid(&graph);

        let mapped: Vec<ShapeId> = selection.iter().map(|id| outcome.id_map[id]).collect();
        let second = tokio_test::block_on(t.editor.copy(&graph, &mapped)).expect("copy again");
        prop_assert_eq!(second.first_shape_id(), Some(outcome.first_id));
        prop_assert_eq!(first.topology(), second.topology());
    }
}
