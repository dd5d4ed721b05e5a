use std::fmt;

use crate::token::Span;

/// A tree shape the resolver relies on did not hold.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalError {
    pub message: String,
    pub span: Span,
}

impl InternalError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal error at {}: {}", self.span, self.message)
    }
}

impl std::error::Error for InternalError {}
