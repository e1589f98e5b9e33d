//! Value-flow infrastructure: token access classification, the forward
//! walker and the passes built on them

pub mod access;
pub mod forward;
pub mod passes;

pub use access::{
    classify_access, dereference_of, function_end, is_assigned_through, is_do_while_tail, is_variable_changed,
    ordinal, Access, ArgumentUse,
};
pub use forward::{forward, Flow};
pub use passes::default_passes;
