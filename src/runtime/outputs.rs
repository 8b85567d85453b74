//! Per-task-instance output completion tracking.

use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::expr::{self, ExprNode};
use crate::ir::{RequiredState, TaskDef};
use crate::lower::completion;
use crate::outputs;

#[derive(Debug, Clone)]
struct OutputState {
    message: String,
    completed: bool,
    required: bool,
}

/// Output registry and completion state for one task instance.
#[derive(Debug, Clone)]
pub struct TaskOutputs {
    /// trigger label -> state, including the task message form.
    by_trigger: BTreeMap<String, OutputState>,
    completion: ExprNode<String>,
}

impl TaskOutputs {
    /// Build from a compiled task definition.
    pub fn from_taskdef(tdef: &TaskDef) -> Result<Self, GraphError> {
        let mut by_trigger = BTreeMap::new();
        for (trigger, def) in &tdef.outputs {
            by_trigger.insert(
                trigger.clone(),
                OutputState {
                    message: def.message.clone(),
                    completed: false,
                    required: def.required == RequiredState::Required,
                },
            );
        }
        // Submission is required unless the graph says otherwise.
        if tdef.required_state(outputs::OUTPUT_SUBMITTED) == RequiredState::Unset
            && tdef.required_state(outputs::OUTPUT_SUBMIT_FAILED) == RequiredState::Unset
        {
            if let Some(state) = by_trigger.get_mut(outputs::OUTPUT_SUBMITTED) {
                state.required = true;
            }
        }
        // Likewise success, when the graph constrains neither outcome.
        // Keeps the flags in step with the synthesized completion expression.
        if tdef.required_state(outputs::OUTPUT_SUCCEEDED) == RequiredState::Unset
            && tdef.required_state(outputs::OUTPUT_FAILED) == RequiredState::Unset
        {
            if let Some(state) = by_trigger.get_mut(outputs::OUTPUT_SUCCEEDED) {
                state.required = true;
            }
        }
        let expr_text = match &tdef.completion {
            Some(text) => text.clone(),
            None => completion::synthesize(&tdef.outputs),
        };
        let completion = expr::compile_completion(&expr_text).map_err(|err| {
            GraphError::expression(
                "E003",
                format!("{}: bad completion expression: {expr_text}: {err}", tdef.name),
            )
        })?;
        Ok(TaskOutputs {
            by_trigger,
            completion,
        })
    }

    /// Registry for a task with no definition: the standard outputs, with
    /// submission required and any finish outcome accepted as complete.
    pub fn fallback() -> Self {
        let mut by_trigger = BTreeMap::new();
        for output in outputs::STANDARD_OUTPUTS {
            by_trigger.insert(
                output.to_string(),
                OutputState {
                    message: output.to_string(),
                    completed: false,
                    required: output == outputs::OUTPUT_SUBMITTED,
                },
            );
        }
        let completion = ExprNode::Or(vec![
            ExprNode::Leaf(outputs::OUTPUT_SUCCEEDED.to_string()),
            ExprNode::Leaf(outputs::OUTPUT_FAILED.to_string()),
            ExprNode::Leaf(outputs::OUTPUT_EXPIRED.to_string()),
        ]);
        TaskOutputs {
            by_trigger,
            completion,
        }
    }

    /// Mark an output completed (or not) by trigger label or task message.
    /// Returns the trigger label if the state changed.
    pub fn set_completion(&mut self, trigger_or_message: &str, completed: bool) -> Option<String> {
        let trigger = self
            .by_trigger
            .iter()
            .find(|(trigger, state)| {
                *trigger == trigger_or_message || state.message == trigger_or_message
            })
            .map(|(trigger, _)| trigger.clone())?;
        let state = self.by_trigger.get_mut(&trigger)?;
        if state.completed == completed {
            return None;
        }
        state.completed = completed;
        Some(trigger)
    }

    pub fn is_completed(&self, trigger: &str) -> bool {
        self.by_trigger.get(trigger).is_some_and(|s| s.completed)
    }

    /// Evaluate the completion expression over current output states.
    /// Variables that name no registered output count as false.
    pub fn is_complete(&self) -> bool {
        self.completion.eval(&|var: &String| {
            self.by_trigger
                .iter()
                .any(|(trigger, state)| outputs::completion_variable(trigger) == *var && state.completed)
        })
    }

    /// True if a required output has not been completed.
    pub fn is_incomplete(&self) -> bool {
        !self.incomplete().is_empty()
    }

    /// Required outputs not yet completed, in lifecycle order.
    pub fn incomplete(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .by_trigger
            .iter()
            .filter(|(_, state)| state.required && !state.completed)
            .map(|(trigger, _)| trigger.as_str())
            .collect();
        labels.sort_by_key(|o| outputs::sort_key(o));
        labels
    }

    /// Completed outputs, in lifecycle order.
    pub fn completed(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .by_trigger
            .iter()
            .filter(|(_, state)| state.completed)
            .map(|(trigger, _)| trigger.as_str())
            .collect();
        labels.sort_by_key(|o| outputs::sort_key(o));
        labels
    }

    pub fn message_for(&self, trigger: &str) -> Option<&str> {
        self.by_trigger.get(trigger).map(|s| s.message.as_str())
    }

    pub fn trigger_for_message(&self, message: &str) -> Option<&str> {
        self.by_trigger
            .iter()
            .find(|(_, state)| state.message == message)
            .map(|(trigger, _)| trigger.as_str())
    }

    /// Standard outputs implied by an output or message, in order. Lets a
    /// late or out-of-order report backfill the lifecycle states it implies.
    pub fn implied(&self, trigger_or_message: &str) -> &'static [&'static str] {
        match trigger_or_message {
            outputs::OUTPUT_STARTED => &[outputs::OUTPUT_SUBMITTED],
            outputs::OUTPUT_SUCCEEDED | outputs::OUTPUT_FAILED => {
                &[outputs::OUTPUT_SUBMITTED, outputs::OUTPUT_STARTED]
            }
            _ => &[],
        }
    }
}
