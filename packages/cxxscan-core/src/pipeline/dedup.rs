//! Duplicate suppression in front of the sink

use crate::shared::models::{DedupKey, ErrorMessage};
use crate::shared::ports::ErrorLogger;
use rustc_hash::FxHashSet;

/// Forwards each (id, file, line, column, message) at most once per run
pub struct DedupLogger<L: ErrorLogger> {
    inner: L,
    seen: FxHashSet<DedupKey>,
    enabled: bool,
    forwarded: usize,
    suppressed: usize,
}

impl<L: ErrorLogger> DedupLogger<L> {
    /// `enabled == false` forwards everything (emit duplicates)
    pub fn new(inner: L, enabled: bool) -> Self {
        Self {
            inner,
            seen: FxHashSet::default(),
            enabled,
            forwarded: 0,
            suppressed: 0,
        }
    }

    pub fn forwarded(&self) -> usize {
        self.forwarded
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: ErrorLogger> ErrorLogger for DedupLogger<L> {
    fn report_err(&mut self, msg: &ErrorMessage) {
        if self.enabled && !self.seen.insert(msg.dedup_key()) {
            self.suppressed += 1;
            return;
        }
        self.forwarded += 1;
        self.inner.report_err(msg);
    }

    fn report_out(&mut self, text: &str) {
        self.inner.report_out(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Certainty, FileLocation, Severity};
    use crate::shared::ports::CollectingLogger;

    fn message(line: u32, text: &str) -> ErrorMessage {
        ErrorMessage::new(
            vec![FileLocation::new("a.c", line, 3)],
            "a.c",
            Severity::Error,
            text,
            "zerodiv",
            Certainty::Normal,
        )
    }

    #[test]
    fn test_identical_messages_reach_the_sink_once() {
        let mut dedup = DedupLogger::new(CollectingLogger::new(), true);
        dedup.report_err(&message(2, "Division by zero."));
        dedup.report_err(&message(2, "Division by zero."));
        dedup.report_err(&message(3, "Division by zero."));
        assert_eq!(dedup.forwarded(), 2);
        assert_eq!(dedup.suppressed(), 1);
        assert_eq!(dedup.into_inner().errors.len(), 2);
    }

    #[test]
    fn test_emit_duplicates() {
        let mut dedup = DedupLogger::new(CollectingLogger::new(), false);
        dedup.report_err(&message(2, "Division by zero."));
        dedup.report_err(&message(2, "Division by zero."));
        assert_eq!(dedup.suppressed(), 0);
        assert_eq!(dedup.into_inner().errors.len(), 2);
    }
}
