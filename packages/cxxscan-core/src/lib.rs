/*
 * cxxscan - static analysis engine for C and C++
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (ErrorMessage, ids, locations) and the sink port
 * - features/    : Vertical slices (preprocessor → tokenizer → symbol_db → value_flow → checks → ctu)
 * - pipeline/    : Per-file orchestration, deduplication, parallel file driver
 * - config/      : Settings, check level, platform profiles
 *
 * Every file+configuration runs a single-threaded pipeline with its own token
 * arena; parallelism is per file (rayon).
 */

#![allow(clippy::too_many_arguments)] // Pass entry points carry the full context
#![allow(clippy::should_implement_trait)] // from_str naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::collapsible_if)] // Readability over brevity
#![allow(clippy::collapsible_else_if)] // else if clarity
#![allow(clippy::needless_range_loop)] // Range loop for indexing

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and ports
pub mod shared;

/// Feature modules (pipeline stages)
pub mod features;

/// Pipeline orchestration
pub mod pipeline;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{AnalysisLimits, CheckLevel, Platform, PlatformKind, Settings};
pub use errors::{CxxscanError, Result};
pub use features::checks::{register_checks, CheckRegistry};
pub use features::library::Library;
pub use pipeline::{Analyzer, FileOutcome, RunSummary};
pub use shared::models::{Certainty, ErrorMessage, FileLocation, Severity};
pub use shared::ports::{CollectingLogger, ErrorLogger};
