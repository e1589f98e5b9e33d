//! Library loading: YAML schema, embedded standard definitions

pub mod errors;
pub mod loader;

pub use errors::{LibraryError, LibraryResult};
pub use loader::{from_yaml_file, from_yaml_str, LibraryConfig};

/// Embedded standard C/C++ definitions
pub const STD_YAML: &str = include_str!("std.yaml");
