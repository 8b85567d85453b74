//! Unified graph-load error type used across all phases.

use crate::expr::ExprError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed graph text: arrows, operators, node format, parentheses.
    Syntax,
    /// Well-formed text with illegal meaning: family misuse, self-edges,
    /// optionality conflicts.
    Semantic,
    /// Malformed or non-boolean trigger/completion expression.
    Expression,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "Syntax"),
            ErrorKind::Semantic => write!(f, "Semantic"),
            ErrorKind::Expression => write!(f, "Expression"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphError {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.kind, self.code, self.message)
    }
}

impl std::error::Error for GraphError {}

impl GraphError {
    pub fn syntax(code: &str, message: impl Into<String>) -> Self {
        GraphError {
            code: code.into(),
            kind: ErrorKind::Syntax,
            message: message.into(),
        }
    }

    pub fn semantic(code: &str, message: impl Into<String>) -> Self {
        GraphError {
            code: code.into(),
            kind: ErrorKind::Semantic,
            message: message.into(),
        }
    }

    pub fn expression(code: &str, message: impl Into<String>) -> Self {
        GraphError {
            code: code.into(),
            kind: ErrorKind::Expression,
            message: message.into(),
        }
    }
}

impl From<ExprError> for GraphError {
    fn from(e: ExprError) -> Self {
        GraphError::expression("E001", e.to_string())
    }
}
