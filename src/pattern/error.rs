//! Error type for the pattern compiler.

use std::fmt;

use thiserror::Error;

/// An error that occurred while compiling pattern text.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{position}] {kind}: {message}")]
pub struct PatternError {
    pub message: String,
    /// 0-based character offset into the pattern text.
    pub position: usize,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Text that does not match the grammar, a bad parameter or an unclosed bracket.
    Syntax,
    /// An effect letter with no registered effect.
    UnknownEffect,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "PATTERN_SYNTAX",
            ErrorKind::UnknownEffect => "UNKNOWN_EFFECT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "syntax error"),
            ErrorKind::UnknownEffect => write!(f, "unknown effect"),
        }
    }
}

impl PatternError {
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            kind: ErrorKind::Syntax,
        }
    }

    pub fn unknown_effect(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            kind: ErrorKind::UnknownEffect,
        }
    }
}
