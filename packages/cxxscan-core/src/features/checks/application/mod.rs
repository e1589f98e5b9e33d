//! Check orchestration

mod registry;

pub use registry::{register_checks, CheckRegistry};
