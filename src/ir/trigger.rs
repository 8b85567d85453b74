//! Resolved trigger objects and the workflow-wide intern table.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::expr::ExprNode;

/// A resolved reference to one named output of one upstream task at one
/// offset class.
///
/// Every field participates in the identity key: two references anywhere in
/// the graph with equal fields intern to the same shared object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskTrigger {
    pub task_name: String,
    /// Offset text without brackets or a leading `^`. None for same-point
    /// triggers.
    pub cycle_point_offset: Option<String>,
    pub output: String,
    pub offset_is_irregular: bool,
    pub offset_is_absolute: bool,
    pub offset_is_from_initial: bool,
    /// Standardised initial point, present only for `^` offsets.
    pub initial_point: Option<String>,
}

impl TaskTrigger {
    pub fn new(
        task_name: &str,
        offset: Option<&str>,
        output: &str,
        initial_point: Option<&str>,
    ) -> Self {
        let mut offset_is_from_initial = false;
        let mut offset = offset;
        if let Some(rest) = offset.and_then(|o| o.strip_prefix('^')) {
            offset_is_from_initial = true;
            offset = if rest.is_empty() { None } else { Some(rest) };
        }
        let (offset_is_irregular, offset_is_absolute) = match offset {
            None => (false, false),
            Some(o) => classify_offset(o),
        };
        TaskTrigger {
            task_name: task_name.to_string(),
            cycle_point_offset: offset.map(str::to_string),
            output: output.to_string(),
            offset_is_irregular,
            offset_is_absolute,
            offset_is_from_initial,
            initial_point: if offset_is_from_initial {
                initial_point.map(str::to_string)
            } else {
                None
            },
        }
    }
}

/// Classify an offset as (irregular, absolute).
///
/// A single signed interval (`-P1D`, `+PT6H`, `-P3`) is regular. Everything
/// else is irregular; irregular offsets not starting with `P`, `+`, `-` or
/// `T` are absolute points (`2000`, `20000101T0600Z`).
fn classify_offset(offset: &str) -> (bool, bool) {
    let regular = offset
        .strip_prefix(['-', '+'])
        .is_some_and(|rest| rest.starts_with('P') && !rest.contains(['+', '-', '^']));
    if regular {
        return (false, false);
    }
    let absolute = !offset.starts_with(['P', '+', '-', 'T']);
    (true, absolute)
}

impl std::fmt::Display for TaskTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cycle_point_offset {
            Some(offset) if self.offset_is_from_initial => {
                write!(f, "{}[^{}]:{}", self.task_name, offset, self.output)
            }
            Some(offset) => write!(f, "{}[{}]:{}", self.task_name, offset, self.output),
            None if self.offset_is_from_initial => {
                write!(f, "{}[^]:{}", self.task_name, self.output)
            }
            None => write!(f, "{}:{}", self.task_name, self.output),
        }
    }
}

/// Workflow-wide trigger intern table. Owns every [`TaskTrigger`]; all
/// dependencies hold shared handles into it, so identical references resolve
/// to the same object and fan-out notification stays O(1) per trigger.
#[derive(Debug, Default)]
pub struct TriggerTable {
    interned: HashMap<TaskTrigger, Arc<TaskTrigger>>,
}

impl TriggerTable {
    pub fn intern(&mut self, trigger: TaskTrigger) -> Arc<TaskTrigger> {
        if let Some(existing) = self.interned.get(&trigger) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(trigger.clone());
        self.interned.insert(trigger, Arc::clone(&shared));
        shared
    }

    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }
}

/// A dependency expression leaf: a shared task trigger or an xtrigger label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepLeaf {
    Trigger(Arc<TaskTrigger>),
    Xtrigger(String),
}

impl std::fmt::Display for DepLeaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepLeaf::Trigger(t) => write!(f, "{t}"),
            DepLeaf::Xtrigger(label) => write!(f, "@{label}"),
        }
    }
}

/// One graph rule: a boolean expression of triggers implying a downstream
/// task, plus the suicide flag. Immutable after parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dependency {
    pub expression: ExprNode<DepLeaf>,
    /// Every distinct task trigger in the expression, in leaf order.
    pub task_triggers: Vec<Arc<TaskTrigger>>,
    pub suicide: bool,
}
