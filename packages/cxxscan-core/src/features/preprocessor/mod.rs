//! Preprocessor Feature
//!
//! ## Structure
//! - `domain/` - MacroDef, configuration strings
//! - `infrastructure/` - `#if` evaluation, macro expansion, errors
//! - `application/` - Preprocessor (configuration discovery, preprocessing)

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::Preprocessor;
pub use domain::{parse_configuration, MacroDef};
pub use infrastructure::{PreprocessError, PreprocessResult};
