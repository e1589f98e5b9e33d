//! Preprocessor infrastructure: `#if` evaluation and macro expansion

pub mod errors;
pub mod expand;
pub mod expression;

pub use errors::{PreprocessError, PreprocessResult};
pub use expand::{expand, MacroTable};
pub use expression::{condition_names, evaluate};
