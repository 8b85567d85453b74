//! Family trigger expansion and the member-output optionality it implies.

mod helpers;

use std::sync::Arc;

use flowgraph::config::{CompilerConfig, MapRuntime};
use flowgraph::error::GraphError;
use flowgraph::expand::NullExpander;
use flowgraph::ir::RequiredState;
use flowgraph::parse::{GraphParser, SectionParse};

use helpers::{compile_with, families};

fn parse(text: &str) -> Result<SectionParse, GraphError> {
    let config = CompilerConfig::default();
    let fams = families(&[("FAM", &["m1", "m2"])]);
    let expander = NullExpander;
    let mut parser = GraphParser::new(&config, &fams, &expander);
    parser.parse_graph(text)?;
    Ok(parser.finish())
}

fn parse_err(text: &str) -> GraphError {
    parse(text).expect_err("graph should fail to parse")
}

#[test]
fn all_semantics_expand_to_a_conjunction() {
    let section = parse("FAM:succeed-all => a").unwrap();
    let expr = "(m1:succeeded&m2:succeeded)";
    assert!(section.triggers["a"].contains_key(expr));
    assert_eq!(section.original["a"][expr], "FAM:succeed-all");
}

#[test]
fn any_semantics_expand_to_a_disjunction() {
    let section = parse("FAM:fail-any => a").unwrap();
    assert!(section.triggers["a"].contains_key("(m1:failed|m2:failed)"));
}

#[test]
fn finish_triggers_expand_members_twice() {
    let section = parse("FAM:finish-any => a").unwrap();
    let expr = "((m1:succeeded|m1:failed)|(m2:succeeded|m2:failed))";
    assert!(section.triggers["a"].contains_key(expr));
    assert_eq!(section.triggers["a"][expr].refs.len(), 4);
}

#[test]
fn submit_fail_any_tests_submit_failed_members() {
    let section = parse("FAM:submit-fail-any => a").unwrap();
    assert!(section.triggers["a"].contains_key("(m1:submit-failed|m2:submit-failed)"));
}

#[test]
fn right_side_family_fans_out_to_members() {
    let section = parse("x => FAM").unwrap();
    assert!(section.triggers["m1"].contains_key("x:succeeded"));
    assert!(section.triggers["m2"].contains_key("x:succeeded"));
    assert!(!section.triggers.contains_key("FAM"));
    // Unqualified: nothing implied about member outputs.
    assert!(!section.memb_output_opt.contains_key(&("m1".into(), "succeeded".into())));
}

#[test]
fn qualified_right_side_family_records_member_outputs() {
    let section = parse("x => FAM:succeed-all").unwrap();
    assert_eq!(section.memb_output_opt[&("m1".into(), "succeeded".into())], false);
    assert_eq!(section.memb_output_opt[&("m2".into(), "succeeded".into())], false);

    let section = parse("x => FAM:succeed-any").unwrap();
    assert_eq!(section.memb_output_opt[&("m1".into(), "succeeded".into())], true);
}

#[test]
fn family_on_the_left_needs_a_family_trigger() {
    assert_eq!(parse_err("FAM => a").code, "S003");
    // A qualified family chain head is caught by the auto-trigger pair first.
    assert_eq!(parse_err("FAM:succeeded => a").code, "S007");
}

#[test]
fn family_triggers_need_a_family() {
    assert_eq!(parse_err("a:succeed-all => b").code, "S004");
}

#[test]
fn family_triggers_cannot_be_optional() {
    assert_eq!(parse_err("x => FAM:succeed-all?").code, "S006");
}

#[test]
fn bad_right_side_family_qualifier_rejected() {
    assert_eq!(parse_err("x => FAM:succeeded").code, "S007");
}

#[test]
fn member_triggers_intern_to_the_family_expansion() {
    let def = compile_with(
        "FAM:succeed-all => a\nm1 => b",
        CompilerConfig::default(),
        families(&[("FAM", &["m1", "m2"])]),
        MapRuntime::new(),
    )
    .unwrap();
    let from_family = &def.tasks["a"].dependencies["P1"][0].task_triggers;
    let direct = &def.tasks["b"].dependencies["P1"][0].task_triggers[0];
    assert!(from_family.iter().any(|t| Arc::ptr_eq(t, direct)));
}

#[test]
fn disagreeing_family_records_relax_to_optional() {
    let def = compile_with(
        "FAM:succeed-all => a\nx => FAM:succeed-any",
        CompilerConfig::default(),
        families(&[("FAM", &["m1", "m2"])]),
        MapRuntime::new(),
    )
    .unwrap();
    assert_eq!(def.tasks["m1"].required_state("succeeded"), RequiredState::Optional);
}

#[test]
fn plain_task_references_override_family_records() {
    let def = compile_with(
        "x => FAM:succeed-any\nm1 => y",
        CompilerConfig::default(),
        families(&[("FAM", &["m1", "m2"])]),
        MapRuntime::new(),
    )
    .unwrap();
    assert_eq!(def.tasks["m1"].required_state("succeeded"), RequiredState::Required);
    assert_eq!(def.tasks["m2"].required_state("succeeded"), RequiredState::Optional);
}

#[test]
fn member_sequences_follow_the_fan_out() {
    let def = compile_with(
        "x => FAM",
        CompilerConfig::default(),
        families(&[("FAM", &["m1", "m2"])]),
        MapRuntime::new(),
    )
    .unwrap();
    assert_eq!(def.tasks["m1"].sequences, ["P1"]);
    assert_eq!(def.tasks["m2"].sequences, ["P1"]);
    assert!(!def.tasks.contains_key("FAM"));
}
