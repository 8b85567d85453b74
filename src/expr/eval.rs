//! Short-circuit evaluation of [`ExprNode`] trees.

use std::collections::BTreeMap;

use super::ast::ExprNode;

impl<T> ExprNode<T> {
    /// Evaluate the tree with truth values supplied per leaf.
    pub fn eval<F>(&self, lookup: &F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        match self {
            ExprNode::Leaf(value) => lookup(value),
            ExprNode::And(children) => children.iter().all(|c| c.eval(lookup)),
            ExprNode::Or(children) => children.iter().any(|c| c.eval(lookup)),
        }
    }
}

impl ExprNode<String> {
    /// Evaluate against a name-keyed context; absent names count as false.
    pub fn eval_context(&self, ctx: &BTreeMap<String, bool>) -> bool {
        self.eval(&|name: &String| ctx.get(name).copied().unwrap_or(false))
    }
}
