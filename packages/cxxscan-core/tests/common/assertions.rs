//! Assertions over reported diagnostics

use cxxscan_core::{CollectingLogger, ErrorMessage};
use std::collections::HashSet;

/// No two messages share (id, file, line, column, message)
pub fn assert_no_duplicates(errors: &[ErrorMessage]) {
    let mut seen = HashSet::new();
    for msg in errors {
        assert!(seen.insert(msg.dedup_key()), "duplicate diagnostic: {}", msg.to_text());
    }
}

/// Rendered diagnostics in a stable order
pub fn sorted_texts(logger: &CollectingLogger) -> Vec<String> {
    let mut texts: Vec<String> = logger.errors.iter().map(|m| m.to_text()).collect();
    texts.sort();
    texts
}

pub fn count_id(logger: &CollectingLogger, id: &str) -> usize {
    logger.with_id(id).len()
}
