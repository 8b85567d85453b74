//! Runtime satisfaction structures instantiated from the compiled IR.

pub mod outputs;
pub mod prerequisite;

pub use outputs::TaskOutputs;
pub use prerequisite::{DepState, Prerequisite, PrereqTarget};
