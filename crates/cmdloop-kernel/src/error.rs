//! Interpreter error kinds.
//!
//! Every error a command can raise is one of these. The dispatch loop prints
//! it, stores the message in the global `error` variable, and keeps going.
//! Only [`InterpError::Syntax`] changes control flow: it stops the nested
//! block or script that produced it.

use thiserror::Error;

/// Result type for command handlers and the block reader.
pub type InterpResult<T> = Result<T, InterpError>;

/// Errors raised while reading or running commands.
#[derive(Debug, Error)]
pub enum InterpError {
    /// Malformed block structure: unterminated brace, missing `else {`, etc.
    #[error("syntax error: {0}")]
    Syntax(String),
    /// Wrong arguments to a builtin, bad operator, predicate arity mismatch.
    #[error("{0}")]
    Usage(String),
    /// No builtin or function with this name.
    #[error("invalid command: {0}")]
    UnknownCommand(String),
    /// Misuse of the asynchronous dispatch barrier.
    #[error("{0}")]
    Concurrency(String),
    /// Failure reading a line source or writing output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl InterpError {
    /// Build a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Build a syntax error.
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    /// Whether this error must abort the construct currently being executed.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }
}
