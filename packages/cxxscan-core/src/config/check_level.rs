//! Analysis depth
//!
//! `CheckLevel` chooses default `AnalysisLimits`; every limit stays
//! individually overridable.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Analysis depth knob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    /// Bounded simplification and value-flow budgets
    #[default]
    Normal,

    /// No artificial bounds
    Exhaustive,
}

impl CheckLevel {
    /// Parse check level from string
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "exhaustive" => Ok(Self::Exhaustive),
            _ => Err(ConfigError::UnknownCheckLevel(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Exhaustive => "exhaustive",
        }
    }
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning budgets. `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisLimits {
    /// Full value-flow sweeps before giving up on a fixed point
    pub max_value_flow_iterations: Option<usize>,

    /// Wall-clock budget for value flow of one configuration
    #[serde(with = "opt_millis")]
    pub value_flow_time_budget: Option<Duration>,

    /// Distinct values kept per token
    pub max_values_per_token: Option<usize>,

    /// Nested branches a forward analysis may descend into
    pub max_forward_branches: Option<usize>,

    /// Call sites considered when pushing arguments into a callee
    pub max_sub_function_calls: Option<usize>,

    /// Simplification rounds over the token list
    pub max_simplify_rounds: Option<usize>,
}

impl AnalysisLimits {
    pub fn for_level(level: CheckLevel) -> Self {
        match level {
            CheckLevel::Normal => Self {
                max_value_flow_iterations: Some(4),
                value_flow_time_budget: Some(Duration::from_secs(10)),
                max_values_per_token: Some(10),
                max_forward_branches: Some(8),
                max_sub_function_calls: Some(20),
                max_simplify_rounds: Some(2),
            },
            CheckLevel::Exhaustive => Self::unbounded(),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            max_value_flow_iterations: None,
            value_flow_time_budget: None,
            max_values_per_token: None,
            max_forward_branches: None,
            max_sub_function_calls: None,
            max_simplify_rounds: None,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_value_flow_iterations == Some(0) {
            return Err(ConfigError::range_with_hint(
                "max_value_flow_iterations",
                0,
                1,
                "unbounded",
                "At least one sweep is required",
            ));
        }
        if self.max_values_per_token == Some(0) {
            return Err(ConfigError::range_with_hint(
                "max_values_per_token",
                0,
                1,
                "unbounded",
                "Tokens must be able to carry one value",
            ));
        }
        if self.max_simplify_rounds == Some(0) {
            return Err(ConfigError::range_with_hint(
                "max_simplify_rounds",
                0,
                1,
                "unbounded",
                "Simplification runs at least once",
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self::for_level(CheckLevel::Normal)
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_level_parsing() {
        assert_eq!(CheckLevel::from_str("normal").unwrap(), CheckLevel::Normal);
        assert_eq!(CheckLevel::from_str("EXHAUSTIVE").unwrap(), CheckLevel::Exhaustive);
        assert!(CheckLevel::from_str("fast").is_err());
    }

    #[test]
    fn test_check_level_display() {
        assert_eq!(CheckLevel::Normal.to_string(), "normal");
        assert_eq!(CheckLevel::Exhaustive.to_string(), "exhaustive");
    }

    #[test]
    fn test_exhaustive_is_unbounded() {
        let limits = AnalysisLimits::for_level(CheckLevel::Exhaustive);
        assert_eq!(limits, AnalysisLimits::unbounded());
        assert!(AnalysisLimits::for_level(CheckLevel::Normal)
            .max_value_flow_iterations
            .is_some());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut limits = AnalysisLimits::default();
        limits.max_value_flow_iterations = Some(0);
        assert!(limits.validate().is_err());
    }
}
