//! Symbol Database Feature
//!
//! One linear pass over the simplified token list builds the scope tree,
//! variables, functions and class types, assigns variable ids, links calls
//! to functions and gives expressions their value types.
//!
//! ## Structure
//! - `domain/` - Scope, Variable, Function, Type and the SymbolDatabase arenas
//! - `infrastructure/` - declaration parsing, the scope walk, call linking
//!   and value types
//! - `application/` - `SymbolDatabase::build`

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::{
    Access, BaseInfo, Dimension, Function, FunctionFlags, FunctionKind, Scope, ScopeKind,
    SymbolDatabase, Type, Variable, VariableFlags,
};
pub use infrastructure::{argument_count, call_arguments, callee_name};
