//! Tokenizer error types

use crate::shared::models::FileLocation;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// Malformed input; aborts the current configuration only
    #[error("syntax error at {location}: {message}")]
    Syntax {
        message: String,
        location: FileLocation,
    },

    /// Broken tokenizer invariant (reported as `internalAstError`)
    #[error("internal error at {location}: {message}")]
    Internal {
        message: String,
        location: FileLocation,
    },
}

impl TokenizeError {
    pub fn syntax(message: impl Into<String>, location: FileLocation) -> Self {
        Self::Syntax {
            message: message.into(),
            location,
        }
    }

    pub fn internal(message: impl Into<String>, location: FileLocation) -> Self {
        Self::Internal {
            message: message.into(),
            location,
        }
    }

    pub fn location(&self) -> &FileLocation {
        match self {
            Self::Syntax { location, .. } | Self::Internal { location, .. } => location,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. } | Self::Internal { message, .. } => message,
        }
    }

    /// Diagnostic id used when the error is reported
    pub fn diagnostic_id(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntaxError",
            Self::Internal { .. } => "internalAstError",
        }
    }
}

pub type TokenizeResult<T> = Result<T, TokenizeError>;
