//! Preprocessor domain model

use crate::features::tokenizer::RawToken;

/// A `#define`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub name: String,
    /// `None` for object-like macros
    pub params: Option<Vec<String>>,
    /// Last parameter collects the remaining arguments
    pub variadic: bool,
    pub body: Vec<RawToken>,
}

impl MacroDef {
    pub fn object(name: impl Into<String>, body: Vec<RawToken>) -> Self {
        Self {
            name: name.into(),
            params: None,
            variadic: false,
            body,
        }
    }

    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.as_ref()?.iter().position(|p| p == name)
    }
}

/// `A;B=2` → `[("A", "1"), ("B", "2")]`
pub fn parse_configuration(cfg: &str) -> Vec<(String, String)> {
    cfg.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_define)
        .collect()
}

/// `NAME` or `NAME=VALUE`
pub fn parse_define(define: &str) -> (String, String) {
    match define.split_once('=') {
        Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
        None => (define.trim().to_string(), "1".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_configuration() {
        assert_eq!(
            parse_configuration("A;B=2"),
            vec![("A".to_string(), "1".to_string()), ("B".to_string(), "2".to_string())]
        );
        assert!(parse_configuration("").is_empty());
    }
}
