//! Configuration system
//!
//! - `Settings`: everything one analysis run needs (YAML loadable, validated)
//! - `CheckLevel` + `AnalysisLimits`: normal vs exhaustive budgets
//! - `Platform`: target integer widths used by folding and `sizeof`

pub mod check_level;
pub mod error;
pub mod platform;
pub mod settings;

// Re-exports
pub use check_level::{AnalysisLimits, CheckLevel};
pub use error::{ConfigError, ConfigResult};
pub use platform::{Platform, PlatformKind, PrimitiveType};
pub use settings::{CtuSettings, Settings};
