//! Whole-program (CTU) Feature
//!
//! Each analyzed file contributes a [`FileSummary`]: call sites passing a
//! null or uninitialized argument, calls that forward a parameter to
//! another function, and parameters a function uses unsafely. Once every
//! file is summarized, call sites are matched against unsafe usages,
//! following forwarded parameters up to the configured depth.
//!
//! ## Structure
//! - `domain/` - FileSummary and its records
//! - `infrastructure/` - summary extraction, nested-call graph (petgraph)
//! - `application/` - whole-program matching

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{find_unsafe_calls, CtuFinding};
pub use domain::{CallSite, CtuValue, FileSummary, NestedCall, UnsafeUsage};
pub use infrastructure::{first_parameter_uses, summarize_calls, CallGraph, ParameterUse};
