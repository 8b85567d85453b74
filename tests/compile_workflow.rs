//! End-to-end workflow compilation: trigger interning, output requirements,
//! completion synthesis and whole-workflow checks.

mod helpers;

use std::sync::Arc;

use flowgraph::config::{CompilerConfig, MapRuntime};
use flowgraph::ir::RequiredState;

use helpers::{compile, compile_err, compile_with, families};

fn back_compat() -> CompilerConfig {
    CompilerConfig {
        back_compat: true,
        ..CompilerConfig::default()
    }
}

#[test]
fn chain_compiles_to_tasks_and_edges() {
    let def = compile("a => b => c").unwrap();
    assert_eq!(def.sequences, ["P1"]);
    assert_eq!(def.tasks.len(), 3);
    assert_eq!(def.tasks["a"].sequences, ["P1"]);

    let dep = &def.tasks["b"].dependencies["P1"][0];
    assert_eq!(dep.task_triggers[0].task_name, "a");
    assert_eq!(dep.task_triggers[0].output, "succeeded");
    assert!(!dep.suicide);

    assert!(def.graph.contains("a"));
    assert_eq!(def.graph.incoming_count("c"), 1);
    assert!(def.graph.downstream_of("a").iter().any(|(t, _)| *t == "b"));
}

#[test]
fn equivalent_references_intern_to_one_trigger() {
    let def = compile("foo => a\nfoo:succeed => b\nfoo:succeeded => c").unwrap();
    let t = |task: &str| Arc::clone(&def.tasks[task].dependencies["P1"][0].task_triggers[0]);
    assert!(Arc::ptr_eq(&t("a"), &t("b")));
    assert!(Arc::ptr_eq(&t("b"), &t("c")));
    insta::assert_snapshot!(t("a").to_string(), @"foo:succeeded");
}

#[test]
fn offsets_split_trigger_identity() {
    let def = compile("foo => bar\nfoo[-P1] => bar").unwrap();
    let deps = &def.tasks["bar"].dependencies["P1"];
    assert_eq!(deps.len(), 2);
    let a = &deps[0].task_triggers[0];
    let b = &deps[1].task_triggers[0];
    assert!(!Arc::ptr_eq(a, b));
    assert!(def.tasks["foo"].used_in_offset_trigger);
    assert_eq!(def.tasks["foo"].sequences, ["P1"]);
}

#[test]
fn offset_only_tasks_must_be_cycled() {
    let err = compile_err("foo[-P1] => bar");
    assert_eq!(err.code, "S205");
}

#[test]
fn initial_point_offsets_carry_the_initial_point() {
    let config = CompilerConfig {
        initial_point: Some("1".to_string()),
        ..CompilerConfig::default()
    };
    let def = compile_with(
        "foo => x\nfoo[^] => bar",
        config,
        families(&[]),
        MapRuntime::new(),
    )
    .unwrap();
    let trigger = &def.tasks["bar"].dependencies["P1"][0].task_triggers[0];
    assert!(trigger.offset_is_from_initial);
    assert_eq!(trigger.initial_point.as_deref(), Some("1"));
}

#[test]
fn unconstrained_tasks_require_success() {
    let def = compile("a => b").unwrap();
    assert_eq!(def.tasks["a"].required_state("succeeded"), RequiredState::Required);
    assert_eq!(def.tasks["a"].completion.as_deref(), Some("succeeded"));
}

#[test]
fn optional_output_relaxes_completion() {
    let def = compile("a? => b").unwrap();
    assert_eq!(def.tasks["a"].required_state("succeeded"), RequiredState::Optional);
    assert_eq!(def.tasks["a"].completion.as_deref(), Some("succeeded or failed"));
}

#[test]
fn finished_right_side_accepts_either_branch() {
    let def = compile("b => a:finish").unwrap();
    assert_eq!(def.tasks["a"].required_state("succeeded"), RequiredState::Optional);
    assert_eq!(def.tasks["a"].required_state("failed"), RequiredState::Optional);
    assert_eq!(def.tasks["a"].completion.as_deref(), Some("succeeded or failed"));
}

#[test]
fn opposite_outputs_must_agree() {
    let err = compile_err("a => c\na:fail => b");
    assert_eq!(err.code, "S202");

    let def = compile_with(
        "a => c\na:fail => b",
        back_compat(),
        families(&[]),
        MapRuntime::new(),
    )
    .unwrap();
    assert_eq!(def.tasks["a"].required_state("succeeded"), RequiredState::Optional);
    assert_eq!(def.tasks["a"].required_state("failed"), RequiredState::Optional);
}

#[test]
fn optionality_conflicts_are_fatal_unless_back_compat() {
    let err = compile_err("a? => b\na => c");
    assert_eq!(err.code, "S008");
    assert!(err.message.contains("can't be both optional and required"));

    let def = compile_with(
        "a? => b\na => c",
        back_compat(),
        families(&[]),
        MapRuntime::new(),
    )
    .unwrap();
    assert_eq!(def.tasks["a"].required_state("succeeded"), RequiredState::Optional);
}

#[test]
fn self_edges_are_fatal() {
    let err = compile_err("a => a");
    assert_eq!(err.code, "S201");
}

#[test]
fn suicide_self_reference_is_allowed() {
    let def = compile("a:fail? => !a").unwrap();
    let dep = &def.tasks["a"].dependencies["P1"][0];
    assert!(dep.suicide);
    // The suicide rule alone does not put a on the sequence.
    let def = compile("b => !a").unwrap();
    assert!(def.tasks["a"].sequences.is_empty());
}

#[test]
fn custom_outputs_resolve_through_the_runtime() {
    let runtime = MapRuntime::new().with_output("a", "ready", "data is ready");
    let def = compile_with(
        "a:ready => b",
        CompilerConfig::default(),
        families(&[]),
        runtime,
    )
    .unwrap();
    assert_eq!(def.tasks["a"].outputs["ready"].message, "data is ready");
    assert_eq!(def.tasks["a"].required_state("ready"), RequiredState::Required);
    assert_eq!(def.tasks["a"].completion.as_deref(), Some("succeeded and ready"));
    assert!(!def.tasks["a"].implicit);
    assert!(def.tasks["b"].implicit);
}

#[test]
fn undefined_custom_outputs_are_fatal() {
    assert_eq!(compile_err("a:ready => b").code, "S203");
    assert_eq!(compile_err("x => a:ready").code, "S203");
}

#[test]
fn completion_overrides_are_validated_and_kept_verbatim() {
    let runtime = MapRuntime::new()
        .with_output("a", "ready", "ready")
        .with_completion("a", "(succeeded and ready) or failed");
    let def = compile_with(
        "a:ready? => b",
        CompilerConfig::default(),
        families(&[]),
        runtime,
    )
    .unwrap();
    assert_eq!(
        def.tasks["a"].completion.as_deref(),
        Some("(succeeded and ready) or failed")
    );

    let runtime = MapRuntime::new().with_completion("a", "succeeded and nonesuch");
    let err = compile_with("a => b", CompilerConfig::default(), families(&[]), runtime)
        .expect_err("undefined completion variable");
    assert_eq!(err.code, "E004");
}

#[test]
fn xtriggers_attach_labels_without_tasks() {
    let def = compile("@alarm => a").unwrap();
    assert_eq!(def.tasks["a"].xtrig_labels["P1"], ["alarm"]);
    assert!(!def.tasks.contains_key("alarm"));
}

#[test]
fn xtrigger_label_task_clash_is_fatal() {
    let err = compile_err("@alarm => a\nb => alarm");
    assert_eq!(err.code, "S204");
}

#[test]
fn polling_annotations_land_on_the_taskdef() {
    let def = compile("up<other.flow::remote:fail> => local").unwrap();
    let polling = def.tasks["up"].polling.as_ref().unwrap();
    assert_eq!(polling.workflow, "other.flow");
    assert_eq!(polling.task, "remote");
    assert_eq!(polling.status, "failed");
}

#[test]
fn compilation_is_deterministic() {
    let text = "c => a\nb => a\na => d\n(a | d) => e";
    let once = serde_json::to_value(compile(text).unwrap()).unwrap();
    let twice = serde_json::to_value(compile(text).unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn completion_context_evaluation() {
    use std::collections::BTreeMap;
    let def = compile("a:fail? => r\na? => s").unwrap();
    let expr = flowgraph::expr::compile_completion(def.tasks["a"].completion.as_deref().unwrap())
        .unwrap();
    let ctx: BTreeMap<String, bool> = [("failed".to_string(), true)].into();
    assert!(expr.eval_context(&ctx));
    assert!(!expr.eval_context(&BTreeMap::new()));
}

#[test]
fn serialized_shape_is_stable() {
    let def = compile("a => b?").unwrap();
    let value = serde_json::to_value(&def).unwrap();
    assert_eq!(value["sequences"], serde_json::json!(["P1"]));
    assert_eq!(value["tasks"]["b"]["outputs"]["succeeded"]["required"], "optional");
    assert_eq!(
        value["tasks"]["b"]["dependencies"]["P1"][0]["expression"]["Leaf"]["trigger"]["task_name"],
        "a"
    );
    assert_eq!(value["tasks"]["a"]["completion"], "succeeded");
}
