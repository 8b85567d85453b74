//! Compiled intermediate representation: triggers, task definitions and the
//! workflow dependency graph.

pub mod graph;
pub mod taskdef;
pub mod trigger;

pub use graph::{DepEdge, DepGraph};
pub use taskdef::{OutputDef, RequiredState, TaskDef, WorkflowDef};
pub use trigger::{DepLeaf, Dependency, TaskTrigger, TriggerTable};
