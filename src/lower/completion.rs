//! Completion expression synthesis and validation.
//!
//! Every task carries a boolean completion expression over its output
//! variables. A runtime override is validated against the output registry;
//! otherwise the expression is synthesized from output requirement states.

use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::expr::{self, ExprNode};
use crate::ir::{OutputDef, RequiredState};
use crate::outputs;

/// Completion of a task with no definition at all.
pub const FALLBACK_COMPLETION: &str = "succeeded or failed or expired";

fn state(registry: &BTreeMap<String, OutputDef>, output: &str) -> RequiredState {
    registry
        .get(output)
        .map(|d| d.required)
        .unwrap_or(RequiredState::Unset)
}

/// Derive a completion expression from the requirement states of a task's
/// outputs.
///
/// Required outputs form a conjunction, optional custom outputs an OR group
/// ANDed onto it. If success is optional the conjunction only binds on the
/// success branch. Optional submit failure and expiry append as alternative
/// completion paths. A task whose graph never constrains success or failure
/// is required to succeed.
pub fn synthesize(registry: &BTreeMap<String, OutputDef>) -> String {
    let optional = |o: &str| state(registry, o) == RequiredState::Optional;
    let finish_optional = optional(outputs::OUTPUT_SUCCEEDED) || optional(outputs::OUTPUT_FAILED);
    let submit_optional =
        optional(outputs::OUTPUT_SUBMITTED) || optional(outputs::OUTPUT_SUBMIT_FAILED);

    let mut required: Vec<&str> = registry
        .iter()
        .filter(|(label, def)| {
            def.required == RequiredState::Required
                && !matches!(
                    label.as_str(),
                    outputs::OUTPUT_SUBMITTED
                        | outputs::OUTPUT_SUBMIT_FAILED
                        | outputs::OUTPUT_EXPIRED
                )
        })
        .map(|(label, _)| label.as_str())
        .collect();
    if state(registry, outputs::OUTPUT_SUCCEEDED) == RequiredState::Unset
        && state(registry, outputs::OUTPUT_FAILED) == RequiredState::Unset
    {
        required.push(outputs::OUTPUT_SUCCEEDED);
    }
    required.sort_by_key(|o| outputs::sort_key(o));

    let optional_custom: Vec<&str> = registry
        .iter()
        .filter(|(label, def)| {
            def.required == RequiredState::Optional && !outputs::is_standard(label)
        })
        .map(|(label, _)| label.as_str())
        .collect();

    let mut terms: Vec<String> = required
        .iter()
        .map(|o| outputs::completion_variable(o))
        .collect();
    if !optional_custom.is_empty() {
        let vars: Vec<String> = optional_custom
            .iter()
            .map(|o| outputs::completion_variable(o))
            .collect();
        if vars.len() == 1 {
            terms.extend(vars);
        } else {
            terms.push(format!("({})", vars.join(" or ")));
        }
    }

    let mut expr = if finish_optional {
        if terms.is_empty() {
            "succeeded or failed".to_string()
        } else {
            format!("({} and succeeded) or failed", terms.join(" and "))
        }
    } else {
        terms.join(" and ")
    };
    if submit_optional {
        expr = format!("{expr} or submit_failed");
    }
    if optional(outputs::OUTPUT_EXPIRED) {
        expr = format!("{expr} or expired");
    }
    expr
}

/// Parse a completion expression and check that every variable names an
/// output in the registry.
pub fn validate(
    task: &str,
    expression: &str,
    registry: &BTreeMap<String, OutputDef>,
) -> Result<ExprNode<String>, GraphError> {
    let tree = expr::compile_completion(expression).map_err(|err| {
        GraphError::expression(
            "E003",
            format!("{task}: bad completion expression: {expression}: {err}"),
        )
    })?;
    for var in tree.leaves() {
        let known = registry
            .keys()
            .any(|label| outputs::completion_variable(label) == *var);
        if !known {
            return Err(GraphError::expression(
                "E004",
                format!("{task}: completion expression references undefined output: {var}"),
            ));
        }
    }
    Ok(tree)
}
