//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains (where it needs them):
//! - domain/         - Pure data model
//! - ports/          - Interface definitions (traits)
//! - application/    - Use cases
//! - infrastructure/ - Algorithms and external formats

// Leaves first: source text → tokens
pub mod preprocessor;
pub mod tokenizer;

// Declarative third-party API knowledge
pub mod library;

// Scopes, variables, functions, types
pub mod symbol_db;

// Fixed-point value propagation
pub mod value_flow;

// Check registry and the individual checks
pub mod checks;

// Whole-program (cross translation unit) analysis
pub mod ctu;

// Per-file/per-configuration summaries on disk
pub mod build_cache;
