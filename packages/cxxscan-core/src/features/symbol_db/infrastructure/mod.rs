//! Symbol database construction: declaration parsing, the scope walk,
//! call linking and expression types

pub mod calls;
pub mod declarations;
pub mod function_head;
pub mod scope_builder;
pub mod value_types;

pub use calls::{argument_count, call_arguments, callee_name, link_calls, resolve_bases};
pub use declarations::{canonical_type, parse_declaration, parse_parameters, Declarator};
pub use function_head::{function_head, FunctionHead};
pub use scope_builder::ScopeBuilder;
pub use value_types::{integer_literal_type, set_value_types};
