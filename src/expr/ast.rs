//! Tagged boolean expression tree over generic leaf values.
//!
//! The same shape serves string leaves at parse time and resolved
//! trigger/satisfaction leaves at runtime.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprNode<T> {
    Leaf(T),
    And(Vec<ExprNode<T>>),
    Or(Vec<ExprNode<T>>),
}

impl<T> ExprNode<T> {
    /// Apply `f` to every leaf value, preserving tree shape.
    pub fn map_leaves<U>(&self, f: &mut impl FnMut(&T) -> U) -> ExprNode<U> {
        match self {
            ExprNode::Leaf(v) => ExprNode::Leaf(f(v)),
            ExprNode::And(children) => {
                ExprNode::And(children.iter().map(|c| c.map_leaves(f)).collect())
            }
            ExprNode::Or(children) => {
                ExprNode::Or(children.iter().map(|c| c.map_leaves(f)).collect())
            }
        }
    }

    /// Fallible leaf mapping; the first error aborts the walk.
    pub fn try_map_leaves<U, E>(
        &self,
        f: &mut impl FnMut(&T) -> Result<U, E>,
    ) -> Result<ExprNode<U>, E> {
        Ok(match self {
            ExprNode::Leaf(v) => ExprNode::Leaf(f(v)?),
            ExprNode::And(children) => ExprNode::And(
                children
                    .iter()
                    .map(|c| c.try_map_leaves(f))
                    .collect::<Result<_, E>>()?,
            ),
            ExprNode::Or(children) => ExprNode::Or(
                children
                    .iter()
                    .map(|c| c.try_map_leaves(f))
                    .collect::<Result<_, E>>()?,
            ),
        })
    }

    /// Visit every leaf value in depth-first order.
    pub fn for_each_leaf(&self, f: &mut impl FnMut(&T)) {
        match self {
            ExprNode::Leaf(v) => f(v),
            ExprNode::And(children) | ExprNode::Or(children) => {
                for c in children {
                    c.for_each_leaf(f);
                }
            }
        }
    }

    /// All leaf values in depth-first order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            ExprNode::Leaf(v) => out.push(v),
            ExprNode::And(children) | ExprNode::Or(children) => {
                for c in children {
                    c.collect_leaves(out);
                }
            }
        }
    }

    /// True if the tree contains an OR node anywhere.
    pub fn has_or(&self) -> bool {
        match self {
            ExprNode::Leaf(_) => false,
            ExprNode::Or(_) => true,
            ExprNode::And(children) => children.iter().any(|c| c.has_or()),
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for ExprNode<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExprNode::Leaf(v) => write!(f, "{v}"),
            ExprNode::And(children) => {
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            ExprNode::Or(children) => {
                write!(f, "(")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
        }
    }
}
