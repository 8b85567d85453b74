pub mod compiler;
pub mod config;
pub mod cycling;
pub mod error;
pub mod expand;
pub mod expr;
pub mod ir;
pub mod lower;
pub mod outputs;
pub mod parse;
pub mod runtime;

pub use compiler::WorkflowCompiler;
pub use config::{CompilerConfig, MapRuntime, RuntimeLookup};
pub use error::{ErrorKind, GraphError};
pub use ir::WorkflowDef;
