//! Symbol database domain model

mod database;
mod function;
mod scope;
mod type_info;
mod variable;

pub use database::SymbolDatabase;
pub use function::{Function, FunctionFlags, FunctionKind};
pub use scope::{Scope, ScopeKind};
pub use type_info::{Access, BaseInfo, Type};
pub use variable::{Dimension, Variable, VariableFlags};
