use std::collections::BTreeMap;

use flowgraph::compiler::WorkflowCompiler;
use flowgraph::config::{CompilerConfig, MapRuntime};
use flowgraph::error::GraphError;
use flowgraph::expand::{NullExpander, ParameterExpander};
use flowgraph::ir::WorkflowDef;

/// Compile a single `P1` section with no families, parameters or runtime.
pub fn compile(graph: &str) -> Result<WorkflowDef, GraphError> {
    compile_with(
        graph,
        CompilerConfig::default(),
        BTreeMap::new(),
        MapRuntime::new(),
    )
}

pub fn compile_with(
    graph: &str,
    config: CompilerConfig,
    family_map: BTreeMap<String, Vec<String>>,
    runtime: MapRuntime,
) -> Result<WorkflowDef, GraphError> {
    let expander = NullExpander;
    let mut compiler = WorkflowCompiler::new(config, family_map, &expander, &runtime);
    compiler.compile_section("P1", graph)?;
    compiler.finish()
}

pub fn compile_params(
    graph: &str,
    expander: &dyn ParameterExpander,
) -> Result<WorkflowDef, GraphError> {
    let runtime = MapRuntime::new();
    let mut compiler = WorkflowCompiler::new(
        CompilerConfig::default(),
        BTreeMap::new(),
        expander,
        &runtime,
    );
    compiler.compile_section("P1", graph)?;
    compiler.finish()
}

pub fn families(defs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    defs.iter()
        .map(|(family, members)| {
            (
                family.to_string(),
                members.iter().map(|m| m.to_string()).collect(),
            )
        })
        .collect()
}

/// Compile and unwrap the expected failure.
pub fn compile_err(graph: &str) -> GraphError {
    compile(graph).expect_err("graph should fail to compile")
}
