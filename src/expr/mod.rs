//! Boolean expression trees for trigger and completion expressions.

mod ast;
mod compile;
mod eval;

pub use ast::ExprNode;
pub use compile::{ExprError, compile, compile_completion};
