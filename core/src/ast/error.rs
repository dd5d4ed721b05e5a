use std::fmt;
use std::sync::Arc;

use crate::ast::Ast;
use crate::token::Span;

/// Error produced while turning text into a tree.
#[derive(Debug, Clone)]
pub enum StaticError {
    /// Malformed token. `rest` is the partial tree of the text before it,
    /// if that text stopped at a dangling `.` or inside a `local`.
    Lex {
        message: String,
        span: Span,
        rest: Option<Arc<Ast>>,
    },
    /// Unexpected token. `rest` is whatever could be built up to the
    /// failure, annotated and ready for analysis.
    Parse {
        message: String,
        span: Span,
        rest: Option<Arc<Ast>>,
    },
}

impl StaticError {
    pub fn message(&self) -> &str {
        match self {
            StaticError::Lex { message, .. } | StaticError::Parse { message, .. } => message,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            StaticError::Lex { span, .. } | StaticError::Parse { span, .. } => *span,
        }
    }

    pub fn rest(&self) -> Option<&Arc<Ast>> {
        match self {
            StaticError::Lex { rest, .. } | StaticError::Parse { rest, .. } => rest.as_ref(),
        }
    }
}

impl fmt::Display for StaticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.span(), self.message())
    }
}

impl std::error::Error for StaticError {}
