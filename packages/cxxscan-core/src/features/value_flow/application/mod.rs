//! Value-flow application layer

mod engine;

pub use engine::{Bailout, Budget, ValueFlowEngine, ValueFlowReport};
