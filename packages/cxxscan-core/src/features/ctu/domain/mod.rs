//! CTU summary records
//!
//! Functions are identified by their CTU key (qualified name plus arity),
//! arguments by their 1-based position.

use crate::shared::models::FileLocation;
use serde::{Deserialize, Serialize};

/// Argument fact tracked across translation units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CtuValue {
    /// Null pointer passed
    Null,
    /// Address of an uninitialized object passed
    Uninit,
}

/// `f(..., arg, ...)` where `arg` carries a [`CtuValue`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub callee: String,
    pub arg_index: usize,
    pub arg_expr: String,
    pub value: CtuValue,
    /// Reasoning steps for the value, ending at the call
    pub path: Vec<FileLocation>,
}

/// Function `caller` passes its parameter `caller_arg` on to `callee`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedCall {
    pub caller: String,
    pub caller_arg: usize,
    pub callee: String,
    pub callee_arg: usize,
    pub location: FileLocation,
}

/// Parameter `arg_index` of `function` is used without a guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsafeUsage {
    pub function: String,
    pub arg_index: usize,
    pub param: String,
    pub value: CtuValue,
    pub location: FileLocation,
}

/// Everything one file+configuration contributes to whole-program analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file: String,
    pub calls: Vec<CallSite>,
    pub nested_calls: Vec<NestedCall>,
    pub usages: Vec<UnsafeUsage>,
}

impl FileSummary {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.nested_calls.is_empty() && self.usages.is_empty()
    }

    /// Append the records of `other`
    pub fn merge(&mut self, other: FileSummary) {
        self.calls.extend(other.calls);
        self.nested_calls.extend(other.nested_calls);
        self.usages.extend(other.usages);
    }
}
