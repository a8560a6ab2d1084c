//! Scope analysis over complete processes.
mod common;
use common::*;
use procgraph::prelude::*;

/// `Pre(2) -> UT(3) -> ST(4) -> UD(5)`; b0: `UT(6) -> ST(7) -> End(20)`;
/// b1: `UT(8) -> ST(9)` looping back to `UT(3)`.
fn loop_back_process() -> ProcessGraph {
    FixtureBuilder::new()
        .shape(1, ShapeKind::Start, 0.0, 0.0)
        .shape(2, ShapeKind::Precondition, 1.0, 0.0)
        .shape(3, ShapeKind::UserTask, 2.0, 0.0)
        .shape(4, ShapeKind::SystemTask, 3.0, 0.0)
        .shape(5, ShapeKind::UserDecision, 4.0, 0.0)
        .shape(6, ShapeKind::UserTask, 5.0, 0.0)
        .shape(7, ShapeKind::SystemTask, 6.0, 0.0)
        .shape(8, ShapeKind::UserTask, 5.0, 1.0)
        .shape(9, ShapeKind::SystemTask, 6.0, 1.0)
        .shape(20, ShapeKind::End, 7.0, 0.0)
        .link(1, 2)
        .link(2, 3)
        .link(3, 4)
        .link(4, 5)
        .branch(5, 6, 0)
        .branch(5, 8, 1)
        .merge(5, 1, 3)
        .link(6, 7)
        .link(7, 20)
        .link(8, 9)
        .link(9, 3)
        .build()
}

/// `UD(3)` b1 holds `UT(12) -> ST(13) -> UD(14)`, whose own b1 is `UT(17) -> ST(18)`.
fn nested_decision_process() -> ProcessGraph {
    FixtureBuilder::new()
        .shape(1, ShapeKind::Start, 0.0, 0.0)
        .shape(2, ShapeKind::Precondition, 1.0, 0.0)
        .shape(3, ShapeKind::UserDecision, 2.0, 0.0)
        .shape(10, ShapeKind::UserTask, 3.0, 0.0)
        .shape(11, ShapeKind::SystemTask, 4.0, 0.0)
        .shape(12, ShapeKind::UserTask, 3.0, 1.0)
        .shape(13, ShapeKind::SystemTask, 4.0, 1.0)
        .shape(14, ShapeKind::UserDecision, 5.0, 1.0)
        .shape(15, ShapeKind::UserTask, 6.0, 1.0)
        .shape(16, ShapeKind::SystemTask, 7.0, 1.0)
        .shape(17, ShapeKind::UserTask, 6.0, 2.0)
        .shape(18, ShapeKind::SystemTask, 7.0, 2.0)
        .shape(99, ShapeKind::End, 8.0, 0.0)
        .link(1, 2)
        .link(2, 3)
        .branch(3, 10, 0)
        .branch(3, 12, 1)
        .merge(3, 1, 99)
        .link(10, 11)
        .link(11, 99)
        .link(12, 13)
        .link(13, 14)
        .branch(14, 15, 0)
        .branch(14, 17, 1)
        .merge(14, 1, 99)
        .link(15, 16)
        .link(16, 99)
        .link(17, 18)
        .link(18, 99)
        .build()
}

#[cfg(test)]
mod scope_tests {
    use super::*;

    #[test]
    fn test_fixtures_are_valid_processes() {
        assert_valid(&loop_back_process());
        assert_valid(&nested_decision_process());
        assert_valid(&merging_system_decision_process());
    }

    #[test]
    fn test_user_task_scope_follows_its_system_decision() {
        let graph = merging_system_decision_process();
        let scope = get_scope(&graph, 3);

        assert_eq!(scope.shape_ids(), &[3, 4, 5, 7]);
        assert_eq!(scope.previous_id, Some(2));
        let mapping = scope
            .mapping(ConditionKey::new(4, 1))
            .expect("system decision branch");
        assert_eq!(mapping.end_id, Some(7));
        assert_eq!(mapping.target_id, Some(8));
        assert!(!mapping.is_infinite_loop);
    }

    #[test]
    fn test_user_task_scope_stops_at_the_next_user_task() {
        let graph = linear_process();
        assert_eq!(get_scope(&graph, 3).shape_ids(), &[3, 4]);
        assert_eq!(get_scope(&graph, 5).shape_ids(), &[5, 6]);
    }

    #[test]
    fn test_decision_scope_skips_the_default_branch() {
        let graph = merging_system_decision_process();
        let scope = get_scope(&graph, 4);
        assert_eq!(scope.shape_ids(), &[4, 7]);
        assert!(!scope.contains(5));
    }

    #[test]
    fn test_branch_scope_stops_at_the_merge_record() {
        let graph = merging_system_decision_process();
        let link = graph.branch_link(4, 1).cloned().expect("branch link");
        let scope = get_branch_scope(&graph, &link);

        assert_eq!(scope.shape_ids(), &[7]);
        assert_eq!(scope.previous_id, Some(4));
        assert_eq!(scope.merge_ids, vec![8]);
        assert_eq!(scope.mappings[0].end_id, Some(7));
        assert_eq!(scope.mappings[0].target_id, Some(8));
    }

    #[test]
    fn test_loop_back_branch_is_flagged() {
        let graph = loop_back_process();
        let scope = get_scope(&graph, 5);

        assert_eq!(scope.shape_ids(), &[5, 8, 9]);
        let mapping = scope.mapping(ConditionKey::new(5, 1)).expect("loop branch");
        assert_eq!(mapping.target_id, Some(3));
        assert_eq!(mapping.end_id, Some(9));
        assert!(mapping.is_infinite_loop);
    }

    #[test]
    fn test_nested_conditions_record_their_parent() {
        let graph = nested_decision_process();
        let scope = get_scope(&graph, 3);

        assert_eq!(scope.len(), 8);
        for id in [3, 12, 13, 14, 15, 16, 17, 18] {
            assert!(scope.contains(id), "shape {} missing from scope", id);
        }
        assert!(!scope.contains(10));

        let inner = scope
            .mapping(ConditionKey::new(14, 1))
            .expect("inner branch");
        assert_eq!(inner.inner_parent_condition, Some(ConditionKey::new(3, 1)));
        assert_eq!(inner.target_id, Some(99));
        assert_eq!(inner.shape_ids_in_condition, vec![17, 18]);

        let info = scope.info(17).expect("visited shape");
        assert_eq!(
            info.parent_conditions,
            vec![ConditionKey::new(3, 1), ConditionKey::new(14, 1)]
        );
        assert_eq!(info.innermost(), Some(ConditionKey::new(14, 1)));

        let outer = scope.mapping(ConditionKey::new(3, 1)).expect("outer branch");
        assert_eq!(outer.target_id, Some(99));
        assert!(outer.shape_ids_in_condition.contains(&17));
    }

    #[test]
    fn test_unknown_and_terminal_shapes() {
        let graph = linear_process();
        assert!(get_scope(&graph, 404).is_empty());
        assert_eq!(get_scope(&graph, 1).shape_ids(), &[1]);
        assert_eq!(get_scope(&graph, 7).shape_ids(), &[7]);
    }
}
