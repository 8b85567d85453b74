//! Compiler configuration and the runtime-config collaborator interface.

use std::collections::BTreeMap;

/// Explicit compiler configuration, threaded through every phase in place of
/// process-global flags.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Relaxed back-compatibility mode: output-optionality conflicts are
    /// coerced to optional with a warning instead of failing the load.
    pub back_compat: bool,
    /// The workflow's initial cycle point (standardised string form), used as
    /// part of trigger identity for `[^...]` offsets.
    pub initial_point: Option<String>,
}

/// Read-only accessor for per-task runtime configuration.
///
/// The configuration-file format itself is an external collaborator; the
/// compiler only consumes the per-task custom outputs map and the optional
/// completion expression override.
pub trait RuntimeLookup {
    /// Custom outputs declared for a task: trigger label -> message.
    fn custom_outputs(&self, task: &str) -> Option<&BTreeMap<String, String>>;

    /// Explicit completion expression override for a task, if any.
    fn completion(&self, task: &str) -> Option<&str>;

    /// True if the task has any runtime configuration at all.
    /// Tasks appearing in the graph without one are recorded as implicit.
    fn is_defined(&self, task: &str) -> bool;
}

/// Map-backed [`RuntimeLookup`], sufficient for tests and embedding hosts
/// that load their configuration elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MapRuntime {
    tasks: BTreeMap<String, TaskRuntime>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskRuntime {
    pub outputs: BTreeMap<String, String>,
    pub completion: Option<String>,
}

impl MapRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task with no custom outputs.
    pub fn define(&mut self, task: &str) -> &mut TaskRuntime {
        self.tasks.entry(task.to_string()).or_default()
    }

    pub fn with_output(mut self, task: &str, trigger: &str, message: &str) -> Self {
        self.define(task)
            .outputs
            .insert(trigger.to_string(), message.to_string());
        self
    }

    pub fn with_completion(mut self, task: &str, completion: &str) -> Self {
        self.define(task).completion = Some(completion.to_string());
        self
    }
}

impl RuntimeLookup for MapRuntime {
    fn custom_outputs(&self, task: &str) -> Option<&BTreeMap<String, String>> {
        self.tasks.get(task).map(|t| &t.outputs)
    }

    fn completion(&self, task: &str) -> Option<&str> {
        self.tasks.get(task).and_then(|t| t.completion.as_deref())
    }

    fn is_defined(&self, task: &str) -> bool {
        self.tasks.contains_key(task)
    }
}
