//! Source location types

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a diagnostic call stack / error path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Step explanation ("Assignment 'x=5', assigned value is 5")
    #[serde(default)]
    pub info: String,
}

impl FileLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            info: String::new(),
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
