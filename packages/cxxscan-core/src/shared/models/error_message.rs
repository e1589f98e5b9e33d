//! Diagnostic model shared by checks, the orchestrator and the sink
//!
//! Messages are templated: leading `$symbol:<name>` lines register symbol
//! names and every `$symbol` in the text is replaced by the first symbol.
//! After the symbol lines, the text is `short` or `short\nverbose`.

use super::location::FileLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Style,
    Performance,
    Portability,
    Information,
    /// Engine-internal notes (budget bailouts); never enabled by default
    Debug,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Style => "style",
            Self::Performance => "performance",
            Self::Portability => "portability",
            Self::Information => "information",
            Self::Debug => "debug",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "style" => Some(Self::Style),
            "performance" => Some(Self::Performance),
            "portability" => Some(Self::Portability),
            "information" => Some(Self::Information),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence of a diagnostic, filterable independently from severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Certainty {
    #[default]
    Normal,
    Inconclusive,
}

/// A diagnostic produced by a check or by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub id: String,
    pub severity: Severity,
    pub certainty: Certainty,
    /// Error path, outermost first; the last entry is the reported location
    pub call_stack: Vec<FileLocation>,
    pub short_message: String,
    pub verbose_message: String,
    pub cwe: Option<u16>,
    pub symbol_names: Vec<String>,
    /// Primary file of the translation unit that produced the message
    pub file0: String,
}

impl ErrorMessage {
    pub fn new(
        call_stack: Vec<FileLocation>,
        file0: impl Into<String>,
        severity: Severity,
        templated: &str,
        id: impl Into<String>,
        certainty: Certainty,
    ) -> Self {
        let (symbol_names, short_message, verbose_message) = expand_template(templated);
        Self {
            id: id.into(),
            severity,
            certainty,
            call_stack,
            short_message,
            verbose_message,
            cwe: None,
            symbol_names,
            file0: file0.into(),
        }
    }

    pub fn with_cwe(mut self, cwe: u16) -> Self {
        self.cwe = Some(cwe);
        self
    }

    /// Location the message is reported at (last call stack entry)
    pub fn location(&self) -> Option<&FileLocation> {
        self.call_stack.last()
    }

    pub fn is_inconclusive(&self) -> bool {
        self.certainty == Certainty::Inconclusive
    }

    /// Identity used for duplicate suppression within one run
    pub fn dedup_key(&self) -> DedupKey {
        let (file, line, column) = match self.location() {
            Some(loc) => (loc.file.clone(), loc.line, loc.column),
            None => (self.file0.clone(), 0, 0),
        };
        DedupKey {
            id: self.id.clone(),
            file,
            line,
            column,
            message: self.verbose_message.clone(),
        }
    }

    /// Stable 64-bit hash of the dedup identity
    pub fn hash64(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.dedup_key().hash(&mut hasher);
        hasher.finish()
    }

    /// Plain one-line rendering, `file:line:col: severity: message [id]`
    pub fn to_text(&self) -> String {
        let location = match self.location() {
            Some(loc) => format!("{}: ", loc),
            None => String::new(),
        };
        let inconclusive = if self.is_inconclusive() {
            ":inconclusive"
        } else {
            ""
        };
        format!(
            "{}{}{}: {} [{}]",
            location, self.severity, inconclusive, self.short_message, self.id
        )
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// (id, file, line, column, message)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub id: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

fn expand_template(templated: &str) -> (Vec<String>, String, String) {
    let mut symbols = Vec::new();
    let mut rest = templated;
    while let Some(stripped) = rest.strip_prefix("$symbol:") {
        let (name, tail) = match stripped.split_once('\n') {
            Some((name, tail)) => (name, tail),
            None => (stripped, ""),
        };
        symbols.push(name.to_string());
        rest = tail;
    }

    let substituted = match symbols.first() {
        Some(first) => rest.replace("$symbol", first),
        None => rest.to_string(),
    };

    match substituted.split_once('\n') {
        Some((short, verbose)) => (symbols, short.to_string(), verbose.to_string()),
        None => (symbols, substituted.clone(), substituted),
    }
}
