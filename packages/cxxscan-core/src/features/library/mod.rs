//! Library Feature
//!
//! Declarative knowledge about third-party APIs: allocation/deallocation
//! pairs, pure and noreturn functions, argument constraints, format-string
//! functions and container member semantics.
//!
//! ## Structure
//! - `domain/` - Library and its function/container records
//! - `infrastructure/` - YAML loader and the embedded `std.yaml`

pub mod domain;
pub mod infrastructure;

pub use domain::{
    AllocFunc, AllocKind, ArgInfo, ContainerAction, ContainerInfo, ContainerYield, FormatKind,
    FunctionInfo, Library, MinSize, NEW_ARRAY_GROUP, NEW_GROUP,
};
pub use infrastructure::{LibraryError, LibraryResult};

use infrastructure::STD_YAML;
use lazy_static::lazy_static;
use std::path::Path;

lazy_static! {
    // parsed once per process
    static ref STANDARD: Result<Library, String> =
        infrastructure::from_yaml_str(STD_YAML).map_err(|e| e.to_string());
}

impl Library {
    /// The embedded standard library definition
    pub fn standard() -> LibraryResult<Library> {
        STANDARD
            .as_ref()
            .map(Clone::clone)
            .map_err(|message| LibraryError::invalid("std", message.clone()))
    }

    pub fn from_yaml_str(yaml: &str) -> LibraryResult<Library> {
        infrastructure::from_yaml_str(yaml)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> LibraryResult<Library> {
        infrastructure::from_yaml_file(path)
    }
}
