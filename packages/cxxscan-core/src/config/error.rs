//! Configuration error types

use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Range validation error
    #[error("Invalid range for field '{field}': {value} not in {min}..={max}. {hint}")]
    Range {
        field: String,
        value: String,
        min: String,
        max: String,
        hint: String,
    },

    /// Missing version field in YAML
    #[error("Missing 'version' field in settings file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    /// Unsupported version
    #[error("Unsupported settings version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    /// Unknown check level name
    #[error("Unknown check level '{0}'. Valid levels: normal, exhaustive")]
    UnknownCheckLevel(String),

    /// Unknown platform name
    #[error("Unknown platform '{name}'. {suggestion}")]
    UnknownPlatform { name: String, suggestion: String },

    /// Unknown severity name
    #[error("Unknown severity '{0}'. Valid: error, warning, style, performance, portability, information, debug")]
    UnknownSeverity(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create a range error with a hint
    pub fn range_with_hint(
        field: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
        hint: impl Into<String>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            hint: hint.into(),
        }
    }

    /// Create an unknown platform error suggesting the nearest known name
    pub fn unknown_platform(name: impl Into<String>, known: &[&str]) -> Self {
        let name = name.into();
        let suggestion = find_closest_match(&name, known);
        Self::UnknownPlatform { name, suggestion }
    }
}

/// Find closest match using simple edit distance
fn find_closest_match(target: &str, candidates: &[&str]) -> String {
    match candidates
        .iter()
        .min_by_key(|candidate| edit_distance(target, candidate))
    {
        Some(closest) => format!("Did you mean '{}'?", closest),
        None => "No platforms available".to_string(),
    }
}

/// Edit distance where swapping two adjacent characters costs one edit
fn edit_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    let mut prev2: Vec<usize> = vec![0; b.len() + 1];
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for i in 0..a.len() {
        cur[0] = i + 1;
        for j in 0..b.len() {
            let cost = usize::from(a[i] != b[j]);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
            if i > 0 && j > 0 && a[i] == b[j - 1] && a[i - 1] == b[j] {
                cur[j + 1] = cur[j + 1].min(prev2[j - 1] + 1);
            }
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("unix64", "unix64"), 0);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("unix46", "unix64"), 1);
        assert_eq!(edit_distance("unix46", "unix32"), 2);
    }

    #[test]
    fn test_unknown_platform_suggestion() {
        let err = ConfigError::unknown_platform("unix46", &["unix32", "unix64", "win64"]);
        assert!(err.to_string().contains("unix64"));
        let err = ConfigError::unknown_platform("win46", &["unix64", "win64", "win32A"]);
        assert!(err.to_string().contains("'win64'"));
    }

    #[test]
    fn test_error_formatting() {
        let err = ConfigError::range_with_hint("max_configs", 0, 1, 10000, "At least one configuration");
        let msg = err.to_string();
        assert!(msg.contains("max_configs"));
        assert!(msg.contains("1..=10000"));
    }
}
