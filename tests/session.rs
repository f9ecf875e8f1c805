//! Tests for the review session: setters, accept/reject commands and lifecycle.
mod common;
use common::*;
use flowdiff::prelude::*;
use serde_json::json;

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_setters_compute_actions() {
        let before = flow(vec![identity("a")]);
        let after = flow(vec![identity("a"), identity("b")]);

        let session = review_session(before, after);
        assert!(session.is_diffing());
        assert!(session.has_pending_changes());
        assert_eq!(action_of(session.module_actions(), "b"), Some(ModuleAction::Added));
        assert_eq!(
            root_ids(session.merged_flow().expect("merged flow")),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_toggling_edit_mode_recomputes_pending() {
        let mut session = review_session(flow(vec![]), flow(vec![identity("a")]));
        session.set_edit_mode(false);
        assert!(!session.has_pending_changes());
        assert_eq!(session.accept_all(), Ok(Outcome::NoAction));

        session.set_edit_mode(true);
        assert!(session.has_pending_changes());
    }

    #[test]
    fn test_toggling_shadowed_display() {
        let mut session = review_session(flow(vec![identity("a")]), flow(vec![]));
        assert_eq!(action_of(session.module_actions(), "a"), Some(ModuleAction::Removed));

        session.set_mark_removed_as_shadowed(true);
        assert_eq!(action_of(session.module_actions(), "a"), Some(ModuleAction::Shadowed));
        assert_eq!(session.accept_module("a"), Ok(Outcome::Applied));
        assert!(session.before_flow().expect("snapshot kept").modules.is_empty());
    }

    #[test]
    fn test_commands_without_snapshot_fail() {
        let mut session = DiffSession::new();
        assert!(matches!(
            session.accept_module("a"),
            Err(SessionError::MissingSnapshot { .. })
        ));
        assert!(matches!(
            session.reject_all(),
            Err(SessionError::MissingSnapshot { .. })
        ));
        assert!(matches!(
            session.revert_to_snapshot(None),
            Err(SessionError::MissingSnapshot { .. })
        ));

        session.set_before_flow(flow(vec![identity("a")])).expect("valid flow");
        assert!(matches!(
            session.reject_module("a"),
            Err(SessionError::MissingCurrentFlow { .. })
        ));
    }

    #[test]
    fn test_unknown_id_is_no_action() {
        let mut session = review_session(flow(vec![]), flow(vec![identity("a")]));
        assert_eq!(session.accept_module("nope"), Ok(Outcome::NoAction));
        assert_eq!(session.reject_module("nope"), Ok(Outcome::NoAction));
    }

    #[test]
    fn test_invalid_flows_are_rejected() {
        let mut session = DiffSession::new();

        let duplicated = flow(vec![identity("a"), for_loop("l", vec![identity("a")])]);
        assert_eq!(
            session.set_before_flow(duplicated),
            Err(SessionError::InvalidFlow(FlowValidationError::DuplicateModuleId {
                id: "a".to_string()
            }))
        );

        let reserved = flow(vec![identity("old__a")]);
        assert!(matches!(
            session.set_current_flow(reserved),
            Err(SessionError::InvalidFlow(FlowValidationError::ReservedPrefix { .. }))
        ));

        let sentinel = flow(vec![identity(INPUT_SCHEMA_ID)]);
        assert!(matches!(
            session.set_current_flow(sentinel),
            Err(SessionError::InvalidFlow(FlowValidationError::ReservedId { .. }))
        ));
        assert!(!session.is_diffing());
    }

    #[test]
    fn test_auto_clear_keeps_current_flow() {
        let mut session = DiffSession::builder().edit_mode(true).build();
        session.set_before_flow(flow(vec![identity("a")])).expect("valid flow");
        session
            .set_current_flow(flow(vec![identity("a"), identity("b")]))
            .expect("valid flow");

        assert_eq!(session.reject_module("b"), Ok(Outcome::Applied));
        assert!(session.before_flow().is_none());
        assert!(session.merged_flow().is_none());
        assert!(session.module_actions().is_empty());
        assert!(!session.is_diffing());
        assert_eq!(root_ids(session.current_flow().expect("current kept")), vec!["a"]);
    }

    #[test]
    fn test_identical_flows_clear_immediately() {
        let mut session = DiffSession::new();
        session.set_before_flow(flow(vec![identity("a")])).expect("valid flow");
        session.set_current_flow(flow(vec![identity("a")])).expect("valid flow");
        assert!(session.before_flow().is_none());
    }

    #[test]
    fn test_revert_to_snapshot() {
        let before = flow(vec![identity("a")]);
        let mut session = review_session(before.clone(), flow(vec![identity("b")]));

        let reverted = session.revert_to_snapshot(None).expect("snapshot held");
        assert_eq!(reverted, before);
        assert!(session.current_flow().is_none());
        assert!(!session.is_diffing());
        assert!(session.module_actions().is_empty());
    }

    #[test]
    fn test_revert_to_given_snapshot() {
        let mut session = review_session(flow(vec![identity("a")]), flow(vec![identity("b")]));
        let other = flow(vec![identity("c")]);

        let reverted = session.revert_to_snapshot(Some(other.clone())).expect("snapshot given");
        assert_eq!(reverted, other);
        assert!(session.before_flow().is_none());
    }

    #[test]
    fn test_clear_snapshot_drops_everything() {
        let mut session = review_session(flow(vec![identity("a")]), flow(vec![identity("b")]));
        session.clear_snapshot();
        assert!(session.before_flow().is_none());
        assert!(session.current_flow().is_none());
        assert!(session.merged_flow().is_none());
        assert!(session.before_actions().is_empty());
    }

    #[test]
    fn test_session_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DiffSession>();
    }
}

#[cfg(test)]
mod accept_tests {
    use super::*;

    #[test]
    fn test_accept_nested_insertion_keeps_order() {
        let before = flow(vec![for_loop("l", vec![identity("x")])]);
        let after = flow(vec![for_loop("l", vec![identity("new"), identity("x")])]);
        let mut session = review_session(before, after);

        assert_eq!(session.accept_module("new"), Ok(Outcome::Applied));
        let before = session.before_flow().expect("snapshot kept");
        assert_eq!(child_ids(before, "l"), vec![vec!["new", "x"]]);
        assert!(session.module_actions().is_empty());
    }

    #[test]
    fn test_accept_child_materializes_parent_skeleton() {
        let before = flow(vec![identity("a")]);
        let after = flow(vec![identity("a"), for_loop("l", vec![identity("x"), identity("y")])]);
        let mut session = review_session(before, after);

        assert_eq!(session.accept_module("x"), Ok(Outcome::Applied));
        let snapshot = session.before_flow().expect("snapshot kept");
        assert_eq!(root_ids(snapshot), vec!["a", "l"]);
        assert_eq!(child_ids(snapshot, "l"), vec![vec!["x"]]);

        let actions = session.module_actions();
        assert_eq!(action_of(actions, "y"), Some(ModuleAction::Added));
        assert_eq!(action_of(actions, "l"), Some(ModuleAction::Modified));
        assert_eq!(action_of(actions, "x"), None);
    }

    #[test]
    fn test_accept_removal_and_modification() {
        let before = flow(vec![script("a", "return 1"), identity("b")]);
        let after = flow(vec![script("a", "return 2")]);
        let mut session = review_session(before, after.clone());

        assert_eq!(session.accept_module("b"), Ok(Outcome::Applied));
        assert_eq!(session.accept_module("a"), Ok(Outcome::Applied));
        assert_eq!(session.before_flow(), Some(&after));
    }

    #[test]
    fn test_accept_all_after_type_change() {
        let before = flow(vec![script("a", "return 1")]);
        let after = flow(vec![identity("a")]);
        let mut session = review_session(before, after.clone());

        assert_eq!(session.accept_all(), Ok(Outcome::Applied));
        assert_eq!(session.before_flow(), Some(&after));
        assert!(session.module_actions().is_empty());
    }

    #[test]
    fn test_accept_all_after_move() {
        let before = flow(vec![identity("m"), for_loop("l", vec![])]);
        let after = flow(vec![for_loop("l", vec![identity("m")])]);
        let mut session = review_session(before, after.clone());

        assert_eq!(session.accept_all(), Ok(Outcome::Applied));
        assert_eq!(session.before_flow(), Some(&after));
    }

    #[test]
    fn test_accept_move_into_earlier_container() {
        let before = flow(vec![for_loop("l", vec![]), identity("m")]);
        let after = flow(vec![for_loop("l", vec![identity("m")])]);
        let mut session = review_session(before, after.clone());
        assert_eq!(
            action_of(session.module_actions(), "old__m"),
            Some(ModuleAction::Removed)
        );

        assert_eq!(session.accept_module("m"), Ok(Outcome::Applied));
        let accepted = session.before_flow().expect("snapshot kept");
        assert_eq!(walk_ids(accepted), vec!["l", "m"]);
        assert!(accepted.validate().is_ok());
        assert_eq!(accepted, &after);
        assert!(session.module_actions().is_empty());
    }

    #[test]
    fn test_accept_container_that_gained_moved_module() {
        let before = flow(vec![for_loop("l", vec![]), identity("m")]);
        let after = flow(vec![for_loop("l", vec![identity("m")])]);
        let mut session = review_session(before, after.clone());

        assert_eq!(session.accept_module("l"), Ok(Outcome::Applied));
        assert_eq!(session.before_flow(), Some(&after));
        assert!(session.module_actions().is_empty());
    }

    #[test]
    fn test_accept_all_moves_into_earlier_container() {
        let before = flow(vec![for_loop("l", vec![]), identity("m")]);
        let after = flow(vec![for_loop("l", vec![identity("m")])]);
        let mut session = review_session(before, after.clone());

        assert_eq!(session.accept_all(), Ok(Outcome::Applied));
        assert_eq!(session.before_flow(), Some(&after));
        assert!(session.before_flow().is_some_and(|f| f.validate().is_ok()));
    }

    #[test]
    fn test_accept_swapped_nesting() {
        let before = flow(vec![for_loop("p", vec![while_loop("y", vec![])])]);
        let after = flow(vec![while_loop("y", vec![for_loop("p", vec![])])]);
        let mut session = review_session(before.clone(), after.clone());

        // p belongs inside y, which only exists inside the old p.
        assert_eq!(session.accept_module("p"), Ok(Outcome::NotFound));
        assert_eq!(session.before_flow(), Some(&before));

        assert_eq!(session.accept_all(), Ok(Outcome::Applied));
        assert_eq!(session.before_flow(), Some(&after));
    }

    #[test]
    fn test_accept_all_replaces_occupied_failure_slot() {
        let before = flow(vec![identity("a")]).with_failure_module(identity("f1"));
        let after = flow(vec![identity("a")]).with_failure_module(identity("f2"));
        let mut session = review_session(before, after.clone());
        assert_eq!(action_of(session.module_actions(), "f1"), None);

        assert_eq!(session.accept_all(), Ok(Outcome::Applied));
        assert_eq!(session.before_flow(), Some(&after));
    }

    #[test]
    fn test_accept_removed_container() {
        let before = flow(vec![identity("a"), for_loop("l", vec![identity("x")])]);
        let after = flow(vec![identity("a")]);
        let mut session = review_session(before, after.clone());

        assert_eq!(session.accept_module("l"), Ok(Outcome::Applied));
        assert_eq!(session.before_flow(), Some(&after));
        assert_eq!(session.accept_module("x"), Ok(Outcome::NoAction));
    }

    #[test]
    fn test_accept_input_schema() {
        let before = flow(vec![identity("a")]).with_schema(json!({ "required": [] }));
        let mut session = review_session(before, flow(vec![identity("a")]));
        session.set_current_input_schema(Some(json!({ "required": ["name"] })));

        assert_eq!(
            action_of(session.module_actions(), INPUT_SCHEMA_ID),
            Some(ModuleAction::Modified)
        );
        assert_eq!(session.accept_module(INPUT_SCHEMA_ID), Ok(Outcome::Applied));
        assert_eq!(
            session.before_flow().and_then(|f| f.schema.clone()),
            Some(json!({ "required": ["name"] }))
        );
        assert!(session.module_actions().is_empty());
    }
}

#[cfg(test)]
mod reject_tests {
    use super::*;

    fn five_to_two() -> DiffSession {
        let before = flow(["a", "b", "c", "d", "e"].into_iter().map(identity).collect());
        let after = flow(vec![identity("b"), identity("d")]);
        review_session(before, after)
    }

    #[test]
    fn test_reject_removals_in_any_order_restores_order() {
        let orders = [
            ["a", "c", "e"],
            ["e", "c", "a"],
            ["c", "a", "e"],
            ["c", "e", "a"],
        ];
        for order in orders {
            let mut session = five_to_two();
            for id in order {
                assert_eq!(session.reject_module(id), Ok(Outcome::Applied), "order {:?}", order);
            }
            assert_eq!(
                root_ids(session.current_flow().expect("current flow")),
                vec!["a", "b", "c", "d", "e"],
                "order {:?}",
                order
            );
        }
    }

    #[test]
    fn test_reject_added_module() {
        let before = flow(vec![for_loop("l", vec![identity("x")])]);
        let after = flow(vec![for_loop("l", vec![identity("x"), identity("n")])]);
        let mut session = review_session(before.clone(), after);

        assert_eq!(session.reject_module("n"), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_modified_module() {
        let before = flow(vec![script("a", "return 1")]);
        let mut session = review_session(before.clone(), flow(vec![script("a", "return 2")]));

        assert_eq!(session.reject_module("a"), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_child_of_removed_container_is_not_found() {
        let before = flow(vec![for_loop("l", vec![identity("x"), identity("y")])]);
        let mut session = review_session(before.clone(), flow(vec![]));

        assert_eq!(session.reject_module("x"), Ok(Outcome::NotFound));
        assert_eq!(session.reject_module("l"), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_all_restores_removed_container() {
        let before = flow(vec![for_loop("l", vec![identity("x"), identity("y")])]);
        let mut session = review_session(before.clone(), flow(vec![]));

        assert_eq!(session.reject_all(), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_type_change_renames_replacement() {
        let before = flow(vec![script("a", "return 1")]);
        let mut session = review_session(before.clone(), flow(vec![identity("a")]));

        assert_eq!(session.reject_module("old__a"), Ok(Outcome::Applied));
        let current = session.current_flow().expect("current flow");
        assert_eq!(root_ids(current), vec!["new__a", "a"]);
        assert_eq!(
            action_of(session.module_actions(), "new__a"),
            Some(ModuleAction::Added)
        );

        assert_eq!(session.reject_module("new__a"), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_all_after_type_change() {
        let before = flow(vec![script("a", "return 1")]);
        let mut session = review_session(before.clone(), flow(vec![identity("a")]));

        assert_eq!(session.reject_all(), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
        assert!(session.module_actions().is_empty());
    }

    #[test]
    fn test_reject_all_after_move() {
        let before = flow(vec![identity("m"), for_loop("l", vec![])]);
        let after = flow(vec![for_loop("l", vec![identity("m")])]);
        let mut session = review_session(before.clone(), after);

        assert_eq!(session.reject_all(), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_all_move_into_earlier_container() {
        let before = flow(vec![for_loop("l", vec![]), identity("m")]);
        let after = flow(vec![for_loop("l", vec![identity("m")])]);
        let mut session = review_session(before.clone(), after);

        assert_eq!(session.reject_all(), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_swapped_nesting_renames_outer_module_once() {
        let before = flow(vec![for_loop("p", vec![while_loop("y", vec![])])]);
        let after = flow(vec![while_loop("y", vec![for_loop("p", vec![])])]);
        let mut session = review_session(before.clone(), after);

        assert_eq!(session.reject_module("old__p"), Ok(Outcome::Applied));
        let current = session.current_flow().expect("current flow");
        assert_eq!(walk_ids(current), vec!["new__y", "new__p", "p", "y"]);
        assert_eq!(
            action_of(session.module_actions(), "new__y"),
            Some(ModuleAction::Added)
        );

        assert_eq!(session.reject_all(), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_all_restores_replaced_failure_module() {
        let before = flow(vec![identity("a")]).with_failure_module(identity("f1"));
        let after = flow(vec![identity("a")]).with_failure_module(identity("f2"));
        let mut session = review_session(before.clone(), after);

        assert_eq!(session.reject_all(), Ok(Outcome::Applied));
        assert_eq!(session.current_flow(), Some(&before));
    }

    #[test]
    fn test_reject_input_schema() {
        let schema = json!({ "required": [] });
        let before = flow(vec![identity("a")]).with_schema(schema.clone());
        let mut session = review_session(before, flow(vec![identity("a")]));
        session.set_current_input_schema(Some(json!({ "required": ["name"] })));

        assert_eq!(session.reject_module(INPUT_SCHEMA_ID), Ok(Outcome::Applied));
        assert_eq!(session.current_input_schema(), Some(&schema));
        assert_eq!(
            session.current_flow().and_then(|f| f.schema.as_ref()),
            Some(&schema)
        );
        assert!(session.module_actions().is_empty());
    }
}
