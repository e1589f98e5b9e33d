//! Analysis settings
//!
//! Built in code with the builder methods or loaded from a versioned YAML
//! file:
//!
//! ```yaml
//! version: 1
//! check_level: exhaustive
//! platform: avr8
//! max_configs: 4
//! severities: [error, warning]
//! ctu:
//!   max_ctu_depth: 3
//! ```

use super::check_level::{AnalysisLimits, CheckLevel};
use super::error::{ConfigError, ConfigResult};
use super::platform::{Platform, PlatformKind};
use crate::shared::models::Severity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SUPPORTED_VERSIONS: [u32; 1] = [1];

/// Whole-program analysis settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtuSettings {
    pub enabled: bool,
    /// Longest call chain followed from a call site to an unsafe usage
    pub max_ctu_depth: usize,
}

impl Default for CtuSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_ctu_depth: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub check_level: CheckLevel,

    /// Explicit limits; when absent they follow `check_level`
    pub limits: Option<AnalysisLimits>,

    pub platform: PlatformKind,

    /// Configurations analyzed per file unless `force` is set
    pub max_configs: usize,

    /// Analyze every configuration
    pub force: bool,

    /// Report identical diagnostics more than once
    pub emit_duplicates: bool,

    /// Enabled severities (`error` is always enabled)
    pub severities: Vec<Severity>,

    /// Report inconclusive diagnostics
    pub inconclusive: bool,

    pub ctu: CtuSettings,

    /// Directory for per-file analyzer summaries
    pub build_dir: Option<PathBuf>,

    /// User defines (`NAME` or `NAME=VALUE`) applied to every configuration
    pub defines: Vec<String>,

    /// Surface value-flow bailouts as `debug` diagnostics
    pub debug_warnings: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_level: CheckLevel::Normal,
            limits: None,
            platform: PlatformKind::Unix64,
            max_configs: 12,
            force: false,
            emit_duplicates: false,
            severities: vec![
                Severity::Error,
                Severity::Warning,
                Severity::Style,
                Severity::Performance,
                Severity::Portability,
                Severity::Information,
            ],
            inconclusive: false,
            ctu: CtuSettings::default(),
            build_dir: None,
            defines: Vec::new(),
            debug_warnings: false,
        }
    }
}

#[derive(Deserialize)]
struct SettingsFile {
    version: Option<u32>,
    #[serde(flatten)]
    settings: Settings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------

    pub fn check_level(mut self, level: CheckLevel) -> Self {
        self.check_level = level;
        self
    }

    pub fn limits(mut self, limits: AnalysisLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn platform(mut self, kind: PlatformKind) -> Self {
        self.platform = kind;
        self
    }

    pub fn max_configs(mut self, n: usize) -> Self {
        self.max_configs = n;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn emit_duplicates(mut self, emit: bool) -> Self {
        self.emit_duplicates = emit;
        self
    }

    pub fn severities(mut self, severities: &[Severity]) -> Self {
        self.severities = severities.to_vec();
        self
    }

    pub fn inconclusive(mut self, enabled: bool) -> Self {
        self.inconclusive = enabled;
        self
    }

    pub fn ctu(mut self, ctu: CtuSettings) -> Self {
        self.ctu = ctu;
        self
    }

    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(dir.into());
        self
    }

    pub fn define(mut self, define: impl Into<String>) -> Self {
        self.defines.push(define.into());
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Effective limits
    pub fn analysis_limits(&self) -> AnalysisLimits {
        self.limits
            .clone()
            .unwrap_or_else(|| AnalysisLimits::for_level(self.check_level))
    }

    pub fn target(&self) -> Platform {
        Platform::from_kind(self.platform)
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        severity == Severity::Error || self.severities.contains(&severity)
    }

    /// Stable text used to invalidate cached results when settings change
    pub fn signature(&self) -> String {
        format!(
            "{}|{}|{}|{:?}|{}|{:?}",
            self.check_level,
            self.platform.as_str(),
            self.inconclusive,
            self.severities,
            self.ctu.max_ctu_depth,
            self.defines
        )
    }

    // ------------------------------------------------------------------
    // Loading and validation
    // ------------------------------------------------------------------

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: SettingsFile = serde_yaml::from_str(content)?;
        match file.version {
            None => return Err(ConfigError::MissingVersion),
            Some(v) if !SUPPORTED_VERSIONS.contains(&v) => {
                return Err(ConfigError::UnsupportedVersion {
                    found: v,
                    supported: SUPPORTED_VERSIONS.to_vec(),
                })
            }
            Some(_) => {}
        }
        file.settings.validate()?;
        Ok(file.settings)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_configs == 0 || self.max_configs > 10_000 {
            return Err(ConfigError::range_with_hint(
                "max_configs",
                self.max_configs,
                1,
                10_000,
                "At least one configuration must be analyzed",
            ));
        }
        if self.ctu.max_ctu_depth == 0 || self.ctu.max_ctu_depth > 64 {
            return Err(ConfigError::range_with_hint(
                "ctu.max_ctu_depth",
                self.ctu.max_ctu_depth,
                1,
                64,
                "Call chains are followed at least one level",
            ));
        }
        for define in &self.defines {
            let name = define.split('=').next().unwrap_or_default();
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(ConfigError::Validation(format!(
                    "invalid define '{}': expected NAME or NAME=VALUE",
                    define
                )));
            }
        }
        if let Some(limits) = &self.limits {
            limits.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_configs, 12);
        assert!(!settings.force);
        assert!(settings.ctu.enabled);
        assert_eq!(settings.target().sizeof_pointer, 8);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_limits_follow_check_level() {
        let settings = Settings::new().check_level(CheckLevel::Exhaustive);
        assert_eq!(settings.analysis_limits(), AnalysisLimits::unbounded());
    }

    #[test]
    fn test_yaml_loading() {
        let yaml = r#"
version: 1
check_level: exhaustive
platform: avr8
max_configs: 4
severities: [error, warning]
ctu:
  max_ctu_depth: 3
"#;
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.check_level, CheckLevel::Exhaustive);
        assert_eq!(settings.platform, PlatformKind::Avr8);
        assert_eq!(settings.max_configs, 4);
        assert_eq!(settings.ctu.max_ctu_depth, 3);
        assert!(settings.ctu.enabled);
        assert!(!settings.is_enabled(Severity::Style));
        assert!(settings.is_enabled(Severity::Error));
    }

    #[test]
    fn test_yaml_requires_version() {
        let err = Settings::from_yaml_str("max_configs: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVersion));
    }

    #[test]
    fn test_yaml_rejects_unknown_version() {
        let err = Settings::from_yaml_str("version: 7\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 7, .. }));
    }

    #[test]
    fn test_validation_range() {
        let settings = Settings::new().max_configs(0);
        assert!(matches!(settings.validate(), Err(ConfigError::Range { .. })));
    }

    #[test]
    fn test_invalid_define() {
        let settings = Settings::new().define("=3");
        assert!(settings.validate().is_err());
    }
}
