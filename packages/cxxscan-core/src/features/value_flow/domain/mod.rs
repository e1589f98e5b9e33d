//! Value-flow domain model

mod value;
mod value_store;

pub use value::{Bound, ErrorPath, LifetimeKind, LifetimeScope, Value, ValueData, ValueKind};
pub use value_store::ValueStore;
