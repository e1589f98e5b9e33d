//! Preprocessor error types

use crate::features::tokenizer::TokenizeError;
use crate::shared::models::FileLocation;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    /// Lexing the source failed
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    /// `#error` reached in the active configuration
    #[error("#error {message}")]
    ErrorDirective {
        message: String,
        location: FileLocation,
    },

    /// `#else`/`#endif` without `#if`, or a missing `#endif`
    #[error("unbalanced conditional at {location}: {message}")]
    Unbalanced {
        message: String,
        location: FileLocation,
    },

    /// `#if` expression that cannot be evaluated
    #[error("invalid #if expression at {location}: {message}")]
    InvalidExpression {
        message: String,
        location: FileLocation,
    },
}

impl PreprocessError {
    pub fn location(&self) -> &FileLocation {
        match self {
            Self::Tokenize(e) => e.location(),
            Self::ErrorDirective { location, .. }
            | Self::Unbalanced { location, .. }
            | Self::InvalidExpression { location, .. } => location,
        }
    }

    /// Diagnostic id used when the error is reported
    pub fn diagnostic_id(&self) -> &'static str {
        match self {
            Self::Tokenize(e) => e.diagnostic_id(),
            Self::ErrorDirective { .. } => "preprocessorErrorDirective",
            Self::Unbalanced { .. } | Self::InvalidExpression { .. } => "syntaxError",
        }
    }

    /// Message text for the diagnostic
    pub fn diagnostic_message(&self) -> String {
        match self {
            Self::Tokenize(e) => e.message().to_string(),
            Self::ErrorDirective { message, .. } => format!("#error {}", message),
            Self::Unbalanced { message, .. } | Self::InvalidExpression { message, .. } => message.clone(),
        }
    }
}

pub type PreprocessResult<T> = Result<T, PreprocessError>;
