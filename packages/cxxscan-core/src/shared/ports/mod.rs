//! Shared ports

mod error_logger;

pub use error_logger::{CollectingLogger, ErrorLogger, SharedLogger};
