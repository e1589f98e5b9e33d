//! Value-flow passes
//!
//! Each pass is one `ValueFlowPass` implementation. `default_passes` lists
//! them in the order the engine runs them: seeds first (literals, sizes,
//! lifetimes, uninit), then the passes that combine and move values.

mod array_size;
mod assignment;
mod conditions;
mod constant_fold;
mod container_size;
mod for_loop;
mod function_return;
mod lifetime;
mod literals;
mod sub_function;
mod uninit;

pub use array_size::SizeofPass;
pub use assignment::AssignmentPass;
pub use conditions::ConditionPass;
pub use constant_fold::ConstantFoldPass;
pub use container_size::ContainerSizePass;
pub use for_loop::ForLoopPass;
pub use function_return::FunctionReturnPass;
pub use lifetime::LifetimePass;
pub use literals::{LiteralPass, StringLiteralPass};
pub use sub_function::SubFunctionPass;
pub use uninit::UninitPass;

use crate::features::value_flow::domain::{Value, ValueData};
use crate::features::value_flow::ports::ValueFlowPass;

/// Passes in engine order
pub fn default_passes() -> Vec<Box<dyn ValueFlowPass>> {
    vec![
        Box::new(LiteralPass),
        Box::new(StringLiteralPass),
        Box::new(SizeofPass),
        Box::new(ConstantFoldPass),
        Box::new(FunctionReturnPass),
        Box::new(LifetimePass),
        Box::new(UninitPass),
        Box::new(AssignmentPass),
        Box::new(ConditionPass),
        Box::new(ForLoopPass),
        Box::new(ContainerSizePass),
        Box::new(SubFunctionPass),
    ]
}

/// Value as it appears in reasoning steps
pub(crate) fn value_text(value: &Value) -> String {
    match &value.data {
        ValueData::Int(n) => n.to_string(),
        ValueData::Float(f) => f.to_string(),
        ValueData::ContainerSize(n) => format!("size={}", n),
        ValueData::Uninit => "<uninit>".to_string(),
        ValueData::Tok(_) => "<string>".to_string(),
        ValueData::Lifetime { .. } => "<address>".to_string(),
        ValueData::Symbolic { delta, .. } => format!("<symbolic{:+}>", delta),
    }
}
