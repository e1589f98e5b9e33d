//! Checks Feature
//!
//! Independent analyses over the annotated token list. Every check
//! implements the [`Check`] port, reports through the shared [`Reporter`]
//! and may contribute a whole-program summary.
//!
//! ## Structure
//! - `domain/` - Diagnostic and CWE ids
//! - `ports/` - Check, CheckContext, Reporter
//! - `infrastructure/` - the built-in checks
//! - `application/` - CheckRegistry and its fixed check order

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{register_checks, CheckRegistry};
pub use domain::{cwe, Diagnostic};
pub use ports::{Check, CheckContext, Reporter};
