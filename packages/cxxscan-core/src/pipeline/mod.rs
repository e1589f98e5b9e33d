//! Pipeline orchestration
//!
//! Drives every input file through preprocess → tokenize → symbol database
//! → value flow → checks, once per preprocessor configuration, then runs the
//! whole-program pass over the collected summaries.
//!
//! ## Structure
//! - `analyzer.rs` - Analyzer (per-file state machine, parallel file driver)
//! - `dedup.rs` - DedupLogger
//! - `terminate.rs` - TerminateFlag
//! - `result.rs` - FileOutcome, RunSummary

mod analyzer;
mod dedup;
mod result;
mod terminate;

pub use analyzer::Analyzer;
pub use dedup::DedupLogger;
pub use result::{FileOutcome, RunSummary};
pub use terminate::TerminateFlag;
