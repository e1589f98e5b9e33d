//! Library loading errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML syntax or schema mismatch
    #[error("Library YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Well-formed YAML with inconsistent content
    #[error("Invalid library definition '{name}': {message}")]
    Invalid { name: String, message: String },
}

impl LibraryError {
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type LibraryResult<T> = Result<T, LibraryError>;
