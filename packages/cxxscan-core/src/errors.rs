//! Error types for cxxscan-core
//!
//! File-local problems (syntax errors, `#error`, budget exhaustion) are turned
//! into diagnostics by the pipeline; only environment failures surface here.

use crate::config::ConfigError;
use crate::features::build_cache::CacheError;
use crate::features::library::LibraryError;
use crate::features::preprocessor::PreprocessError;
use crate::features::tokenizer::TokenizeError;
use thiserror::Error;

/// Main error type for cxxscan operations
#[derive(Debug, Error)]
pub enum CxxscanError {
    /// Input could not be read at all
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Termination was requested before the file finished
    #[error("Analysis terminated")]
    Terminated,
}

/// Result type alias for cxxscan operations
pub type Result<T> = std::result::Result<T, CxxscanError>;
