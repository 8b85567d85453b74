//! Static task definitions and the compiled workflow model.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ir::graph::DepGraph;
use crate::ir::trigger::{Dependency, TaskTrigger};
use crate::outputs;
use crate::parse::PollingInfo;

/// Tri-state output requirement. `Unset` means the graph and runtime config
/// said nothing; completion synthesis decides the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredState {
    Required,
    Optional,
    #[default]
    Unset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDef {
    pub message: String,
    pub required: RequiredState,
}

/// Per-sequence adjacency: output name -> [(peer task, shared trigger)].
pub type Adjacency = BTreeMap<String, BTreeMap<String, Vec<(String, Arc<TaskTrigger>)>>>;

/// Static definition of one task, independent of any cycle point instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDef {
    pub name: String,
    /// Cycling sequences this task is a member of, in first-seen order.
    pub sequences: Vec<String>,
    /// Output registry: trigger label -> (message, requirement).
    pub outputs: BTreeMap<String, OutputDef>,
    /// Dependencies per sequence.
    pub dependencies: BTreeMap<String, Vec<Dependency>>,
    /// sequence -> my output -> downstream tasks triggered off it.
    pub graph_children: Adjacency,
    /// sequence -> upstream output -> upstream tasks I trigger off.
    pub graph_parents: Adjacency,
    /// Xtrigger labels per sequence.
    pub xtrig_labels: BTreeMap<String, Vec<String>>,
    /// Completion expression: runtime override or synthesized.
    pub completion: Option<String>,
    /// True if the task has no runtime configuration of its own.
    pub implicit: bool,
    /// True if some dependency references this task at a cycle point offset.
    pub used_in_offset_trigger: bool,
    /// Inter-workflow polling target, if this is a polling task.
    pub polling: Option<PollingInfo>,
}

impl TaskDef {
    /// New task definition with the standard outputs registered as unset.
    pub fn new(name: &str) -> Self {
        let mut defs = BTreeMap::new();
        for output in outputs::STANDARD_OUTPUTS {
            defs.insert(
                output.to_string(),
                OutputDef {
                    message: output.to_string(),
                    required: RequiredState::Unset,
                },
            );
        }
        TaskDef {
            name: name.to_string(),
            sequences: Vec::new(),
            outputs: defs,
            dependencies: BTreeMap::new(),
            graph_children: Adjacency::new(),
            graph_parents: Adjacency::new(),
            xtrig_labels: BTreeMap::new(),
            completion: None,
            implicit: true,
            used_in_offset_trigger: false,
            polling: None,
        }
    }

    pub fn add_sequence(&mut self, sequence: &str) {
        if !self.sequences.iter().any(|s| s == sequence) {
            self.sequences.push(sequence.to_string());
        }
    }

    /// Register a custom output from runtime configuration.
    pub fn add_output(&mut self, trigger: &str, message: &str) {
        self.outputs.entry(trigger.to_string()).or_insert(OutputDef {
            message: message.to_string(),
            required: RequiredState::Unset,
        });
    }

    pub fn set_required(&mut self, output: &str, state: RequiredState) {
        if let Some(def) = self.outputs.get_mut(output) {
            def.required = state;
        }
    }

    pub fn required_state(&self, output: &str) -> RequiredState {
        self.outputs
            .get(output)
            .map(|d| d.required)
            .unwrap_or_default()
    }

    /// Output labels in standard-first sorted order.
    pub fn sorted_outputs(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.outputs.keys().map(String::as_str).collect();
        labels.sort_by_key(|o| outputs::sort_key(o));
        labels
    }
}

/// The compiled static dependency model for one workflow.
#[derive(Debug, Serialize)]
pub struct WorkflowDef {
    pub tasks: BTreeMap<String, TaskDef>,
    /// All graph sections compiled, in compile order.
    pub sequences: Vec<String>,
    #[serde(skip)]
    pub graph: DepGraph,
}

impl WorkflowDef {
    pub fn task(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }
}
