//! YAML library definitions
//!
//! # Schema
//! ```yaml
//! allocations:
//!   - kind: memory            # or resource
//!     alloc: [malloc, calloc]
//!     dealloc: [free]
//! functions:
//!   - names: [memcpy]
//!     pure: false
//!     noreturn: false
//!     format: printf          # or scanf, with format_arg
//!     args:
//!       - { index: 1, not_null: true, min_size: { arg_value: 3 } }
//! containers:
//!   - id: stdVector
//!     types: ["std::vector"]
//!     indexable: true
//!     actions: { push_back: push, clear: clear }
//!     yields: { size: size, empty: empty }
//! ```

use super::errors::{LibraryError, LibraryResult};
use crate::features::library::domain::{
    AllocFunc, AllocKind, ArgInfo, ContainerAction, ContainerInfo, ContainerYield, FormatKind,
    FunctionInfo, Library, MinSize,
};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub allocations: Vec<AllocationConfig>,
    pub functions: Vec<FunctionConfig>,
    pub containers: Vec<ContainerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllocationConfig {
    pub kind: AllocKind,
    pub alloc: Vec<String>,
    pub dealloc: Vec<String>,
    /// 1-based argument released by the dealloc functions
    #[serde(default = "default_dealloc_arg")]
    pub dealloc_arg: usize,
}

fn default_dealloc_arg() -> usize {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionConfig {
    pub names: Vec<String>,
    pub pure: bool,
    pub noreturn: bool,
    pub format: Option<FormatKind>,
    pub format_arg: Option<usize>,
    pub args: Vec<ArgConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArgConfig {
    pub index: usize,
    pub not_null: bool,
    pub not_uninit: bool,
    pub min_size: Option<MinSizeConfig>,
}

/// Exactly one field is set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MinSizeConfig {
    pub arg_value: Option<usize>,
    pub strlen: Option<usize>,
    pub bytes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub id: String,
    pub types: Vec<String>,
    pub indexable: bool,
    pub string_like: bool,
    pub actions: FxHashMap<String, ContainerAction>,
    pub yields: FxHashMap<String, ContainerYield>,
}

/// Parse and validate a YAML library definition
pub fn from_yaml_str(yaml: &str) -> LibraryResult<Library> {
    let config: LibraryConfig = serde_yaml::from_str(yaml)?;
    build_library(config)
}

pub fn from_yaml_file(path: impl AsRef<Path>) -> LibraryResult<Library> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

fn build_library(config: LibraryConfig) -> LibraryResult<Library> {
    let mut lib = Library::empty();

    for alloc in config.allocations {
        let Some(first) = alloc.alloc.first() else {
            return Err(LibraryError::invalid("allocation", "no alloc function"));
        };
        if alloc.dealloc.is_empty() {
            return Err(LibraryError::invalid(first.clone(), "no dealloc function"));
        }
        let group = lib.allocate_group();
        for name in alloc.alloc {
            let f = AllocFunc {
                group,
                kind: alloc.kind,
                arg: 0,
            };
            lib.allocs.insert(name, f);
        }
        for name in alloc.dealloc {
            let f = AllocFunc {
                group,
                kind: alloc.kind,
                arg: alloc.dealloc_arg,
            };
            lib.deallocs.insert(name, f);
        }
    }

    for function in config.functions {
        let Some(first) = function.names.first().cloned() else {
            return Err(LibraryError::invalid("function", "no names"));
        };
        let info = function_info(&first, &function)?;
        for name in function.names {
            lib.functions.insert(name, info.clone());
        }
    }

    for container in config.containers {
        if container.types.is_empty() {
            return Err(LibraryError::invalid(container.id, "no types"));
        }
        let info = ContainerInfo {
            id: container.id.clone(),
            actions: container.actions,
            yields: container.yields,
            indexable: container.indexable,
            string_like: container.string_like,
        };
        for ty in container.types {
            lib.containers.insert(ty, info.clone());
        }
    }

    Ok(lib)
}

fn function_info(name: &str, config: &FunctionConfig) -> LibraryResult<FunctionInfo> {
    let mut args = FxHashMap::default();
    for arg in &config.args {
        if arg.index == 0 {
            return Err(LibraryError::invalid(name, "argument indexes start at 1"));
        }
        let min_size = arg
            .min_size
            .as_ref()
            .map(|m| min_size(name, m))
            .transpose()?;
        args.insert(
            arg.index,
            ArgInfo {
                not_null: arg.not_null,
                not_uninit: arg.not_uninit,
                min_size,
            },
        );
    }
    let format_arg = match (config.format, config.format_arg) {
        (Some(_), Some(0)) | (Some(_), None) => {
            return Err(LibraryError::invalid(name, "format functions need format_arg >= 1"))
        }
        (_, arg) => arg.unwrap_or(0),
    };
    Ok(FunctionInfo {
        pure: config.pure,
        noreturn: config.noreturn,
        args,
        format: config.format,
        format_arg,
    })
}

fn min_size(name: &str, config: &MinSizeConfig) -> LibraryResult<MinSize> {
    match (config.arg_value, config.strlen, config.bytes) {
        (Some(arg), None, None) => Ok(MinSize::ArgValue(arg)),
        (None, Some(arg), None) => Ok(MinSize::StrLen(arg)),
        (None, None, Some(bytes)) => Ok(MinSize::Bytes(bytes)),
        _ => Err(LibraryError::invalid(name, "min_size needs exactly one of arg_value, strlen, bytes")),
    }
}
