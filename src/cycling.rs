//! Cycle point arithmetic collaborator interface.
//!
//! Point and interval semantics are opaque to the compiler: a [`CycleSolver`]
//! supplies the arithmetic. [`IntegerCycling`] covers integer cycling; date
//! time cycling plugs in through the same trait.

use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::ir::TaskTrigger;

pub trait CycleSolver {
    /// Apply a signed interval offset (e.g. `-P1`, `+P1D`) to a point.
    fn point_add(&self, point: &str, offset: &str) -> Result<String, GraphError>;

    /// Canonical form of a point.
    fn standardise(&self, point: &str) -> Result<String, GraphError>;

    /// First point of a named sequence. Children of absolute and
    /// initial-point triggers start there.
    fn sequence_start(&self, sequence: &str) -> Option<String>;
}

/// Integer cycling: points are integers, intervals are `P<n>`.
#[derive(Debug, Default, Clone)]
pub struct IntegerCycling {
    sequence_starts: BTreeMap<String, String>,
}

impl IntegerCycling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence_start(mut self, sequence: &str, point: &str) -> Self {
        self.sequence_starts
            .insert(sequence.to_string(), point.to_string());
        self
    }
}

fn parse_int_point(point: &str) -> Result<i64, GraphError> {
    point.parse().map_err(|_| {
        GraphError::semantic("S300", format!("invalid integer cycle point: {point}"))
    })
}

impl CycleSolver for IntegerCycling {
    fn point_add(&self, point: &str, offset: &str) -> Result<String, GraphError> {
        let base = parse_int_point(point)?;
        let (sign, body) = match offset.strip_prefix('-') {
            Some(body) => (-1, body),
            None => (1, offset.strip_prefix('+').unwrap_or(offset)),
        };
        let steps: i64 = body
            .strip_prefix('P')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| {
                GraphError::semantic("S301", format!("invalid integer interval: {offset}"))
            })?;
        Ok((base + sign * steps).to_string())
    }

    fn standardise(&self, point: &str) -> Result<String, GraphError> {
        Ok(parse_int_point(point)?.to_string())
    }

    fn sequence_start(&self, sequence: &str) -> Option<String> {
        self.sequence_starts.get(sequence).cloned()
    }
}

impl TaskTrigger {
    /// The point of the upstream output this trigger pertains to, given the
    /// dependent task's point.
    pub fn point_for(&self, point: &str, solver: &dyn CycleSolver) -> Result<String, GraphError> {
        if self.offset_is_from_initial {
            let initial = self.initial_point.as_deref().ok_or_else(|| {
                GraphError::semantic(
                    "S302",
                    format!("initial cycle point required for trigger {self}"),
                )
            })?;
            return match &self.cycle_point_offset {
                Some(offset) => solver.point_add(initial, offset),
                None => solver.standardise(initial),
            };
        }
        match &self.cycle_point_offset {
            Some(offset) if self.offset_is_absolute => solver.standardise(offset),
            Some(offset) => solver.point_add(point, offset),
            None => Ok(point.to_string()),
        }
    }

    /// The parent (upstream) point for a dependent task at `from_point`.
    /// Identical to [`TaskTrigger::point_for`]; named for graph traversal.
    pub fn parent_point(
        &self,
        from_point: &str,
        solver: &dyn CycleSolver,
    ) -> Result<String, GraphError> {
        self.point_for(from_point, solver)
    }

    /// The child (downstream) point spawned off this trigger when the
    /// upstream output appears at `from_point` on `sequence`.
    pub fn child_point(
        &self,
        from_point: &str,
        sequence: &str,
        solver: &dyn CycleSolver,
    ) -> Result<String, GraphError> {
        let Some(offset) = &self.cycle_point_offset else {
            if self.offset_is_from_initial || self.offset_is_absolute {
                return sequence_start(sequence, solver);
            }
            return Ok(from_point.to_string());
        };
        if self.offset_is_absolute || self.offset_is_from_initial {
            // First child is at the start of the sequence; later points are
            // reached by ordinary spawning.
            return sequence_start(sequence, solver);
        }
        // Sign flip finds children, e.g. -P1D+PT18H becomes +P1D-PT18H.
        let flipped: String = offset
            .chars()
            .map(|c| match c {
                '-' => '+',
                '+' => '-',
                c => c,
            })
            .collect();
        let flipped = if flipped.starts_with(['-', '+']) {
            flipped
        } else {
            format!("-{flipped}")
        };
        solver.point_add(from_point, &flipped)
    }
}

fn sequence_start(sequence: &str, solver: &dyn CycleSolver) -> Result<String, GraphError> {
    solver.sequence_start(sequence).ok_or_else(|| {
        GraphError::semantic("S303", format!("sequence {sequence} has no start point"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_point_arithmetic() {
        let solver = IntegerCycling::new();
        assert_eq!(solver.point_add("5", "-P2").unwrap(), "3");
        assert_eq!(solver.point_add("5", "+P1").unwrap(), "6");
        assert_eq!(solver.point_add("5", "P1").unwrap(), "6");
        assert!(solver.point_add("5", "-PT6H").is_err());
    }

    #[test]
    fn trigger_points() {
        let solver = IntegerCycling::new().with_sequence_start("P1", "1");
        let t = TaskTrigger::new("foo", Some("-P1"), "succeeded", None);
        assert_eq!(t.point_for("5", &solver).unwrap(), "4");
        assert_eq!(t.child_point("4", "P1", &solver).unwrap(), "5");

        let t = TaskTrigger::new("foo", Some("2"), "succeeded", None);
        assert_eq!(t.point_for("5", &solver).unwrap(), "2");
        assert_eq!(t.child_point("2", "P1", &solver).unwrap(), "1");

        let t = TaskTrigger::new("foo", Some("^"), "succeeded", Some("1"));
        assert_eq!(t.point_for("7", &solver).unwrap(), "1");
    }
}
