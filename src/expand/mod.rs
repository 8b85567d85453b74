//! Family and parameter expansion.

pub mod family;
pub mod param;

pub use param::{NullExpander, ParameterExpander, TableExpander, contains_parameters, REMOVE_MARKER};
