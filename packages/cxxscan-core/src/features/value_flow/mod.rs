//! Value Flow Feature
//!
//! Attaches possible runtime values to tokens. Passes are run sweep after
//! sweep until a sweep adds nothing; values are only ever added, so the
//! loop terminates once every pass is saturated or the budget is spent.
//!
//! ## Structure
//! - `domain/` - Value, ValueStore
//! - `ports/` - ValueFlowPass, PassContext
//! - `infrastructure/` - access classification, forward walker, passes
//! - `application/` - ValueFlowEngine (fixed-point loop + budget)

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{Bailout, Budget, ValueFlowEngine, ValueFlowReport};
pub use domain::{Bound, ErrorPath, LifetimeKind, LifetimeScope, Value, ValueData, ValueKind, ValueStore};
pub use infrastructure::{classify_access, Access};
pub use ports::{PassContext, ValueFlowPass};
