//! Build-dir Cache Feature
//!
//! Persists the result of every analyzed file+configuration (diagnostics
//! and whole-program summaries) so unchanged files are not analyzed again.
//! An entry is valid only for the fingerprint of its source content,
//! configuration and result-affecting settings.
//!
//! ## Structure
//! - `types.rs` - CacheEntry, Fingerprint (blake3)
//! - `disk_cache.rs` - BuildDirCache (serde_json, atomic writes)
//! - `error.rs` - CacheError

mod disk_cache;
mod error;
mod types;

pub use disk_cache::BuildDirCache;
pub use error::{CacheError, CacheResult};
pub use types::{CacheEntry, Fingerprint};
