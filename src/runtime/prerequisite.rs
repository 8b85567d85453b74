//! Prerequisite instances: a compiled dependency bound to a cycle point.

use serde::Serialize;

use crate::cycling::CycleSolver;
use crate::error::GraphError;
use crate::expr::ExprNode;
use crate::ir::{DepLeaf, Dependency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepState {
    Satisfied,
    ForceSatisfied,
    Unsatisfied,
}

impl DepState {
    pub fn is_satisfied(self) -> bool {
        !matches!(self, DepState::Unsatisfied)
    }
}

/// What one prerequisite leaf waits on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrereqTarget {
    Output {
        task: String,
        point: String,
        output: String,
    },
    Xtrigger {
        label: String,
    },
}

/// One task instance's view of one dependency expression.
///
/// Leaf satisfaction state lives here; the overall result is cached and
/// re-evaluated only when a leaf changes, so broadcasting an output to its
/// dependents costs O(affected leaves).
#[derive(Debug, Clone)]
pub struct Prerequisite {
    /// Cycle point of the owning task instance.
    pub point: String,
    targets: Vec<PrereqTarget>,
    states: Vec<DepState>,
    /// Conditional structure, kept only when the expression has an OR;
    /// plain conjunctions evaluate as "all leaves satisfied".
    expression: Option<ExprNode<usize>>,
    cached: Option<bool>,
}

impl Prerequisite {
    /// Instantiate a compiled dependency at a cycle point, resolving each
    /// trigger's offset to a concrete upstream point.
    pub fn from_dependency(
        dep: &Dependency,
        point: &str,
        solver: &dyn CycleSolver,
    ) -> Result<Self, GraphError> {
        let mut targets: Vec<PrereqTarget> = Vec::new();
        let tree = dep.expression.try_map_leaves(&mut |leaf: &DepLeaf| {
            let target = match leaf {
                DepLeaf::Trigger(t) => PrereqTarget::Output {
                    task: t.task_name.clone(),
                    point: t.point_for(point, solver)?,
                    output: t.output.clone(),
                },
                DepLeaf::Xtrigger(label) => PrereqTarget::Xtrigger {
                    label: label.clone(),
                },
            };
            Ok::<usize, GraphError>(match targets.iter().position(|t| *t == target) {
                Some(i) => i,
                None => {
                    targets.push(target);
                    targets.len() - 1
                }
            })
        })?;
        let states = vec![DepState::Unsatisfied; targets.len()];
        let expression = if tree.has_or() { Some(tree) } else { None };
        Ok(Prerequisite {
            point: point.to_string(),
            targets,
            states,
            expression,
            cached: None,
        })
    }

    pub fn is_satisfied(&mut self) -> bool {
        if let Some(cached) = self.cached {
            return cached;
        }
        let value = self.evaluate();
        self.cached = Some(value);
        value
    }

    fn evaluate(&self) -> bool {
        match &self.expression {
            Some(tree) => tree.eval(&|i| self.states[*i].is_satisfied()),
            None => self.states.iter().all(|s| s.is_satisfied()),
        }
    }

    /// Mark any leaves waiting on this output as satisfied. Returns true if
    /// a leaf changed state.
    pub fn satisfy_output(&mut self, task: &str, point: &str, output: &str) -> bool {
        self.satisfy(|t| {
            matches!(
                t,
                PrereqTarget::Output {
                    task: t_task,
                    point: t_point,
                    output: t_output,
                } if t_task == task && t_point == point && t_output == output
            )
        })
    }

    /// Mark any leaves waiting on this xtrigger label as satisfied.
    pub fn satisfy_xtrigger(&mut self, label: &str) -> bool {
        self.satisfy(|t| matches!(t, PrereqTarget::Xtrigger { label: t_label } if t_label == label))
    }

    fn satisfy(&mut self, matches: impl Fn(&PrereqTarget) -> bool) -> bool {
        let mut changed = false;
        for (i, target) in self.targets.iter().enumerate() {
            if self.states[i] == DepState::Unsatisfied && matches(target) {
                self.states[i] = DepState::Satisfied;
                changed = true;
            }
        }
        if changed {
            self.cached = Some(self.evaluate());
        }
        changed
    }

    /// Force-satisfy every unsatisfied leaf.
    pub fn set_satisfied(&mut self) {
        for state in &mut self.states {
            if *state == DepState::Unsatisfied {
                *state = DepState::ForceSatisfied;
            }
        }
        self.cached = Some(self.evaluate());
    }

    /// Reset every leaf to unsatisfied.
    pub fn set_not_satisfied(&mut self) {
        for state in &mut self.states {
            *state = DepState::Unsatisfied;
        }
        self.cached = Some(self.targets.is_empty());
    }

    /// Leaf targets and their current states, for introspection and dumps.
    pub fn state(&self) -> impl Iterator<Item = (&PrereqTarget, DepState)> {
        self.targets.iter().zip(self.states.iter().copied())
    }

    pub fn unsatisfied(&self) -> Vec<&PrereqTarget> {
        self.state()
            .filter(|(_, s)| !s.is_satisfied())
            .map(|(t, _)| t)
            .collect()
    }
}
