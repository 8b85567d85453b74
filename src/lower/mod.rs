//! Lowering from parsed per-section trigger tables to the workflow IR.
//!
//! [`lower_section`] turns one section's parse results into task definitions,
//! interned triggers and dependencies. [`finalize`] runs the whole-workflow
//! checks that need every section: output requirement merging, opposite
//! output agreement, custom output resolution and completion expressions.

pub mod completion;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{CompilerConfig, RuntimeLookup};
use crate::error::GraphError;
use crate::expr;
use crate::ir::{DepEdge, DepGraph, DepLeaf, RequiredState, TaskDef, TaskTrigger, TriggerTable};
use crate::outputs;
use crate::parse::{PollingInfo, SectionParse, TriggerKey};

fn taskdef<'m>(tasks: &'m mut BTreeMap<String, TaskDef>, name: &str) -> &'m mut TaskDef {
    tasks
        .entry(name.to_string())
        .or_insert_with(|| TaskDef::new(name))
}

/// Lower one parsed graph section onto the accumulating task definitions.
pub fn lower_section(
    sequence: &str,
    section: &SectionParse,
    initial_point: Option<&str>,
    table: &mut TriggerTable,
    tasks: &mut BTreeMap<String, TaskDef>,
) -> Result<(), GraphError> {
    for (task, exprs) in &section.triggers {
        taskdef(tasks, task);
        for (expr_text, texpr) in exprs {
            // Suicide triggers remove instances; they never put the task
            // on the sequence.
            if !texpr.suicide {
                taskdef(tasks, task).add_sequence(sequence);
            }
            if expr_text.is_empty() {
                continue;
            }

            let tree = expr::compile(expr_text)?;
            let mut triggers: Vec<Arc<TaskTrigger>> = Vec::new();
            let mut xtrig_labels: Vec<String> = Vec::new();
            let expression = tree.try_map_leaves(
                &mut |leaf: &String| -> Result<DepLeaf, GraphError> {
                    match TriggerKey::parse(leaf)? {
                        TriggerKey::Xtrigger(label) => {
                            if !xtrig_labels.contains(&label) {
                                xtrig_labels.push(label.clone());
                            }
                            Ok(DepLeaf::Xtrigger(label))
                        }
                        TriggerKey::Task {
                            name,
                            offset,
                            output,
                        } => {
                            let trigger = table.intern(TaskTrigger::new(
                                &name,
                                offset.as_deref(),
                                &output,
                                initial_point,
                            ));
                            if !triggers.iter().any(|t| Arc::ptr_eq(t, &trigger)) {
                                triggers.push(Arc::clone(&trigger));
                            }
                            Ok(DepLeaf::Trigger(trigger))
                        }
                    }
                },
            )?;

            if !texpr.suicide && triggers.iter().any(|t| t.task_name == *task) {
                return Err(GraphError::semantic(
                    "S201",
                    format!("self-edge detected: {task} depends on itself: {expr_text}"),
                ));
            }

            for trigger in &triggers {
                let upstream = taskdef(tasks, &trigger.task_name);
                if trigger.cycle_point_offset.is_some() || trigger.offset_is_from_initial {
                    upstream.used_in_offset_trigger = true;
                } else {
                    upstream.add_sequence(sequence);
                }
                upstream
                    .graph_children
                    .entry(sequence.to_string())
                    .or_default()
                    .entry(trigger.output.clone())
                    .or_default()
                    .push((task.clone(), Arc::clone(trigger)));
                taskdef(tasks, task)
                    .graph_parents
                    .entry(sequence.to_string())
                    .or_default()
                    .entry(trigger.output.clone())
                    .or_default()
                    .push((trigger.task_name.clone(), Arc::clone(trigger)));
            }

            let tdef = taskdef(tasks, task);
            for label in xtrig_labels {
                let labels = tdef.xtrig_labels.entry(sequence.to_string()).or_default();
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
            tdef.dependencies
                .entry(sequence.to_string())
                .or_default()
                .push(crate::ir::Dependency {
                    expression,
                    task_triggers: triggers,
                    suicide: texpr.suicide,
                });
        }
    }
    Ok(())
}

/// Whole-workflow checks and derivations, after every section is lowered.
pub fn finalize(
    config: &CompilerConfig,
    runtime: &dyn RuntimeLookup,
    tasks: &mut BTreeMap<String, TaskDef>,
    task_output_opt: &BTreeMap<(String, String), bool>,
    memb_output_opt: &BTreeMap<(String, String), bool>,
    polling: &BTreeMap<String, PollingInfo>,
) -> Result<DepGraph, GraphError> {
    // Family-derived requirements apply only where no plain task reference
    // pinned the output.
    let mut merged = memb_output_opt.clone();
    for (key, optional) in task_output_opt {
        merged.insert(key.clone(), *optional);
    }

    // Opposite outputs may both be used only if both are optional.
    let mut coerced: Vec<(String, String)> = Vec::new();
    for ((task, output), optional) in &merged {
        let Some(opp) = outputs::opposite(output) else {
            continue;
        };
        if output.as_str() > opp {
            continue;
        }
        let Some(opp_optional) = merged.get(&(task.clone(), opp.to_string())) else {
            continue;
        };
        if !(*optional && *opp_optional) {
            if config.back_compat {
                tracing::warn!(
                    task = %task,
                    output = %output,
                    opposite = opp,
                    "opposite outputs coerced to optional"
                );
                coerced.push((task.clone(), output.clone()));
                coerced.push((task.clone(), opp.to_string()));
            } else {
                return Err(GraphError::semantic(
                    "S202",
                    format!(
                        "opposite outputs {task}:{output} and {task}:{opp} must both \
                         be optional if both are used"
                    ),
                ));
            }
        }
    }
    for key in coerced {
        merged.insert(key, true);
    }

    for tdef in tasks.values_mut() {
        tdef.implicit = !runtime.is_defined(&tdef.name);
        if let Some(custom) = runtime.custom_outputs(&tdef.name) {
            for (trigger, message) in custom {
                tdef.add_output(trigger, message);
            }
        }
    }

    for ((task, output), optional) in &merged {
        let tdef = taskdef(tasks, task);
        if !tdef.outputs.contains_key(output) {
            return Err(GraphError::semantic(
                "S203",
                format!("undefined custom output: {task}:{output}"),
            ));
        }
        let state = if *optional {
            RequiredState::Optional
        } else {
            RequiredState::Required
        };
        tdef.set_required(output, state);
    }

    // Custom outputs used as upstream triggers must also be defined.
    let mut upstream_refs: Vec<(String, String)> = Vec::new();
    for tdef in tasks.values() {
        for deps in tdef.dependencies.values() {
            for dep in deps {
                for trigger in &dep.task_triggers {
                    if !outputs::is_standard(&trigger.output) {
                        upstream_refs.push((trigger.task_name.clone(), trigger.output.clone()));
                    }
                }
            }
        }
    }
    for (task, output) in upstream_refs {
        let known = tasks
            .get(&task)
            .is_some_and(|t| t.outputs.contains_key(&output));
        if !known {
            return Err(GraphError::semantic(
                "S203",
                format!("undefined custom output: {task}:{output}"),
            ));
        }
    }

    let task_names: Vec<String> = tasks.keys().cloned().collect();
    for tdef in tasks.values() {
        for labels in tdef.xtrig_labels.values() {
            for label in labels {
                if task_names.contains(label) {
                    return Err(GraphError::semantic(
                        "S204",
                        format!("xtrigger label clashes with a task name: {label}"),
                    ));
                }
            }
        }
        if tdef.used_in_offset_trigger && tdef.sequences.is_empty() {
            return Err(GraphError::semantic(
                "S205",
                format!(
                    "{}: appears in an offset trigger but is not on any sequence",
                    tdef.name
                ),
            ));
        }
    }

    for (task, info) in polling {
        taskdef(tasks, task).polling = Some(info.clone());
    }

    for tdef in tasks.values_mut() {
        match runtime.completion(&tdef.name) {
            Some(expr_text) => {
                completion::validate(&tdef.name, expr_text, &tdef.outputs)?;
                tdef.completion = Some(expr_text.to_string());
            }
            None => tdef.completion = Some(completion::synthesize(&tdef.outputs)),
        }
    }

    let mut graph = DepGraph::default();
    for tdef in tasks.values() {
        graph.ensure_node(&tdef.name);
        for (sequence, deps) in &tdef.dependencies {
            for dep in deps {
                for trigger in &dep.task_triggers {
                    graph.add_edge(
                        &trigger.task_name,
                        &tdef.name,
                        DepEdge {
                            sequence: sequence.clone(),
                            output: trigger.output.clone(),
                            suicide: dep.suicide,
                        },
                    );
                }
            }
        }
    }
    Ok(graph)
}
