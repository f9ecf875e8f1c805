//! Unit tests for the flow model, traversal, display and error types.
mod common;
use common::*;
use flowdiff::prelude::*;
use flowdiff::walker;
use serde_json::json;

#[test]
fn test_parse_flow_json() {
    let json = r#"{
        "modules": [
            {
                "id": "a",
                "summary": "fetch",
                "value": { "type": "rawscript", "content": "return 1", "language": "deno" },
                "retry": { "constant": { "attempts": 2 } }
            },
            {
                "id": "l",
                "value": {
                    "type": "forloopflow",
                    "iterator": { "type": "javascript", "expr": "results.a" },
                    "modules": [{ "id": "x", "value": { "type": "identity" } }]
                }
            }
        ],
        "failure_module": { "id": "failure", "value": { "type": "identity" } }
    }"#;

    let flow = FlowValue::from_json(json).expect("valid flow json");
    assert_eq!(root_ids(&flow), vec!["a", "l"]);

    let a = flow.module("a").expect("a parsed");
    assert_eq!(a.summary.as_deref(), Some("fetch"));
    assert_eq!(a.controls.get("retry"), Some(&json!({ "constant": { "attempts": 2 } })));
    assert!(!a.controls.contains_key("summary"));

    match &flow.module("l").expect("l parsed").value {
        FlowModuleValue::ForloopFlow {
            skip_failures,
            parallel,
            ..
        } => {
            assert!(*skip_failures);
            assert!(!*parallel);
        }
        other => panic!("expected a for loop, got {:?}", other.kind()),
    }
    assert_eq!(flow.failure_module.as_ref().map(|m| m.id.as_str()), Some("failure"));

    let reparsed = FlowValue::from_json(&flow.to_json_pretty().expect("serializable"))
        .expect("round trip");
    assert_eq!(reparsed, flow);

    let compact = flow.to_json().expect("serializable");
    assert!(compact.contains(r#""type":"forloopflow""#));
    assert!(compact.contains(r#""retry":{"#));
}

#[test]
fn test_parse_error() {
    let result = FlowValue::from_json(r#"{ "modules": [{ "id": "a", "value": { "type": "teleport" } }] }"#);
    assert!(matches!(result, Err(FlowParseError::Json(_))));
}

#[test]
fn test_validate() {
    assert!(flow(vec![identity("a"), for_loop("l", vec![identity("new__x")])]).validate().is_ok());

    let duplicate = flow(vec![identity("a")]).with_failure_module(identity("a"));
    assert_eq!(
        duplicate.validate(),
        Err(FlowValidationError::DuplicateModuleId { id: "a".to_string() })
    );

    let nested_reserved = flow(vec![branch_one("b", vec![identity("old__d")], vec![])]);
    assert_eq!(
        nested_reserved.validate(),
        Err(FlowValidationError::ReservedPrefix {
            id: "old__d".to_string(),
            prefix: DUPLICATE_MODULE_PREFIX,
        })
    );
}

#[test]
fn test_error_display() {
    let err = FlowValidationError::DuplicateModuleId { id: "a".to_string() };
    assert_eq!(err.to_string(), "Module id 'a' appears more than once in the flow");

    let err = SessionError::MissingSnapshot {
        operation: "accept a module",
    };
    assert_eq!(err.to_string(), "Cannot accept a module without a before-flow snapshot");

    let err = SessionError::from(FlowValidationError::ReservedId {
        id: INPUT_SCHEMA_ID.to_string(),
    });
    assert_eq!(
        err.to_string(),
        "Invalid flow: Module id '__input_schema__' is reserved for the flow input schema"
    );
}

#[test]
fn test_module_kind() {
    assert_eq!(script("a", "").kind().to_string(), "rawscript");
    assert_eq!(branch_all("b", vec![]).kind(), ModuleKind::BranchAll);
    assert!(ai_agent("agent", vec![]).kind().is_container());
    assert!(!identity("a").kind().is_container());
}

#[test]
fn test_skeleton_empties_child_lists() {
    let module = branch_one(
        "b",
        vec![identity("d")],
        vec![("x == 1", vec![for_loop("l", vec![identity("p")])])],
    );
    let skeleton = module.skeleton();

    assert_eq!(skeleton.id, "b");
    let lists: Vec<usize> = skeleton
        .value
        .child_lists()
        .into_iter()
        .map(|(_, list)| list.len())
        .collect();
    assert_eq!(lists, vec![0, 0]);
    match &skeleton.value {
        FlowModuleValue::BranchOne { branches, .. } => assert_eq!(branches[0].expr, "x == 1"),
        other => panic!("expected a branchone, got {:?}", other.kind()),
    }
}

#[test]
fn test_prefixed_ids_cover_the_subtree() {
    let module = for_loop("l", vec![identity("x"), while_loop("w", vec![identity("y")])]);
    let prefixed = module.with_prefixed_ids(DUPLICATE_MODULE_PREFIX);

    assert_eq!(
        walker::subtree_ids(&prefixed),
        vec!["old__l", "old__x", "old__w", "old__y"]
    );
    assert_eq!(module.id, "l");
}

#[test]
fn test_walker_order() {
    let tree = flow(vec![
        identity("a"),
        for_loop(
            "l",
            vec![
                identity("x"),
                branch_one("b", vec![identity("d")], vec![("true", vec![identity("p")])]),
            ],
        ),
        identity("z"),
    ])
    .with_failure_module(identity("f"));

    assert_eq!(walk_ids(&tree), vec!["a", "l", "x", "b", "d", "p", "z", "f"]);
    assert_eq!(tree.module_ids().len(), 8);
}

#[test]
fn test_find_module_parent() {
    let tree = flow(vec![
        identity("a"),
        branch_all("b", vec![vec![], vec![identity("q"), identity("r")]]),
    ])
    .with_preprocessor_module(identity("pre"));

    assert_eq!(find_module_parent(&tree, "a"), Some(ParentLocation::Root { index: 0 }));
    assert_eq!(
        find_module_parent(&tree, "r"),
        Some(ParentLocation::ParallelArm {
            parent_id: "b".to_string(),
            branch_index: 1,
            index: 1,
        })
    );
    assert_eq!(find_module_parent(&tree, "pre"), Some(ParentLocation::Preprocessor));
    assert_eq!(find_module_parent(&tree, "missing"), None);

    let location = find_module_parent(&tree, "r").expect("r located");
    assert_eq!(location.to_string(), "b.branches[1][1]");
}

#[test]
fn test_display_flow_with_actions() {
    let before = flow(vec![identity("a"), for_loop("L", vec![script("x", "return 1")])]);
    let after = flow(vec![identity("a"), for_loop("L", vec![script("x", "return 2")])]);
    let timeline = build_flow_timeline(
        &before,
        &after,
        DiffOptions {
            mark_as_pending: true,
            mark_removed_as_shadowed: false,
        },
    );

    let rendered = DisplayFlow::new(&timeline.merged_flow)
        .with_actions(&timeline.after_actions)
        .to_string();
    assert_eq!(
        rendered,
        "flow\n\
         ├── a [identity]\n\
         └── L [forloopflow] (modified, pending)\n\
         \x20   └── modules\n\
         \x20       └── x [rawscript] (modified, pending)\n"
    );
}

#[test]
fn test_display_flow_special_slots_and_empty_lists() {
    let tree = flow(vec![while_loop("w", vec![]).with_summary("poll")])
        .with_failure_module(identity("f"));

    assert_eq!(
        DisplayFlow::new(&tree).to_string(),
        "flow\n\
         ├── w [whileloopflow] \"poll\"\n\
         │   └── modules\n\
         │       └── <empty>\n\
         └── failure_module\n\
         \x20   └── f [identity]\n"
    );
}
