//! Check domain: one diagnostic before it is placed in the source

use crate::features::value_flow::domain::{ErrorPath, Value};
use crate::shared::models::{Certainty, Severity, TokenId};

/// CWE ids used by the built-in checks
pub mod cwe {
    pub const UNINIT: u16 = 457;
    pub const NULL_POINTER: u16 = 476;
    pub const MISMATCH_ALLOC: u16 = 762;
    pub const MEMLEAK: u16 = 401;
    pub const RESOURCE_LEAK: u16 = 775;
    pub const DOUBLE_FREE: u16 = 415;
    pub const OUT_OF_BOUNDS: u16 = 788;
    pub const ALWAYS_FALSE: u16 = 570;
    pub const DIV_ZERO: u16 = 369;
    pub const DANGLING: u16 = 562;
    pub const CONTAINER_BOUNDS: u16 = 398;
    pub const VIRTUAL_DTOR: u16 = 404;
    pub const FORMAT_ARGS: u16 = 685;
}

/// A diagnostic as a check produces it: message template, severity and
/// the tokens it is located at
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub id: &'static str,
    pub severity: Severity,
    /// `$symbol:` lines followed by `short[\nverbose]`
    pub message: String,
    pub certainty: Certainty,
    pub cwe: Option<u16>,
    /// Reasoning steps leading to `at`
    pub path: ErrorPath,
    pub at: Option<TokenId>,
}

impl Diagnostic {
    pub fn new(id: &'static str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id,
            severity,
            message: message.into(),
            certainty: Certainty::Normal,
            cwe: None,
            path: Vec::new(),
            at: None,
        }
    }

    pub fn at(mut self, tok: TokenId) -> Self {
        self.at = Some(tok);
        self
    }

    pub fn cwe(mut self, cwe: u16) -> Self {
        self.cwe = Some(cwe);
        self
    }

    pub fn path(mut self, path: ErrorPath) -> Self {
        self.path = path;
        self
    }

    /// Reasoning steps of `value`, followed by the reported token
    pub fn with_value(self, value: &Value) -> Self {
        let inconclusive = value.is_inconclusive();
        self.path(value.error_path.clone()).inconclusive(inconclusive)
    }

    pub fn inconclusive(mut self, inconclusive: bool) -> Self {
        if inconclusive {
            self.certainty = Certainty::Inconclusive;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_path_and_certainty() {
        let value = Value::int(0)
            .with_kind(crate::features::value_flow::ValueKind::Inconclusive)
            .with_step(TokenId(3), "Assignment 'p=0', assigned value is 0");
        let d = Diagnostic::new("nullPointer", Severity::Error, "Null pointer dereference: p")
            .with_value(&value)
            .at(TokenId(7));
        assert_eq!(d.path.len(), 1);
        assert_eq!(d.certainty, Certainty::Inconclusive);
        assert_eq!(d.at, Some(TokenId(7)));
    }
}
