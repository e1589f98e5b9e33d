//! CTU infrastructure

mod call_graph;
mod summary;

pub use call_graph::CallGraph;
pub use summary::{first_parameter_uses, summarize_calls, ParameterUse};
