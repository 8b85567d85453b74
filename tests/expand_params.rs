//! Parameterized graph lines expanded through the compiler.

mod helpers;

use flowgraph::expand::TableExpander;

use helpers::compile_params;

fn expander() -> TableExpander {
    TableExpander::default().with_param("m", &["0", "1"])
}

#[test]
fn parameters_replicate_tasks_pairwise() {
    let def = compile_params("sim<m> => post<m>", &expander()).unwrap();
    assert!(def.tasks.contains_key("sim_m0"));
    assert!(def.tasks.contains_key("post_m1"));
    // Same-value pairing only: sim_m0 feeds post_m0, not post_m1.
    let downstream: Vec<&str> = def
        .graph
        .downstream_of("sim_m0")
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(downstream, ["post_m0"]);
}

#[test]
fn negative_offset_links_consecutive_values() {
    let def = compile_params("sim<m-1> => sim<m>", &expander()).unwrap();
    // The m=0 instance has no predecessor; its line is dropped entirely.
    let dep = &def.tasks["sim_m1"].dependencies["P1"][0];
    assert_eq!(dep.task_triggers[0].task_name, "sim_m0");
    assert!(def.tasks["sim_m0"].dependencies.is_empty());
}

#[test]
fn out_of_range_members_drop_from_conjunctions() {
    let def = compile_params("sim<m-1> & prep => sim<m>", &expander()).unwrap();
    let exprs: Vec<String> = def.tasks["sim_m0"].dependencies["P1"]
        .iter()
        .map(|d| d.expression.to_string())
        .collect();
    assert_eq!(exprs, ["prep:succeeded"]);
}

#[test]
fn undefined_parameters_are_fatal() {
    let err = compile_params("foo<q> => bar", &expander()).unwrap_err();
    assert_eq!(err.code, "S100");
}
