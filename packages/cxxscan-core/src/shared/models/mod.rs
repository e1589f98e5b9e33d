//! Shared models

mod error_message;
mod ids;
mod location;

pub use error_message::{Certainty, DedupKey, ErrorMessage, Severity};
pub use ids::{FunctionId, ScopeId, TokenId, TypeId, VariableId};
pub use location::FileLocation;
