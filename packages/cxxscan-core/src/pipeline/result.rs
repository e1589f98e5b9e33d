//! Pipeline result types

use crate::features::ctu::FileSummary;
use std::collections::BTreeMap;

/// What happened to one input file
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub file: String,

    /// Configurations discovered in the file
    pub configurations: usize,

    /// Configurations analyzed or replayed from the cache, in order
    pub checked: Vec<String>,

    /// Configurations whose result came from the build-dir cache
    pub cache_hits: usize,

    /// Configurations aborted by a syntax error or `#error`
    pub aborted: Vec<String>,

    /// Diagnostics produced for the file before deduplication
    pub diagnostics: usize,

    /// Configurations where value flow stopped on its budget
    pub bailouts: usize,

    /// Termination was requested before the file finished; its
    /// diagnostics were discarded
    pub terminated: bool,

    /// Whole-program summaries per configuration, keyed by check name
    pub file_infos: Vec<BTreeMap<String, FileSummary>>,
}

impl FileOutcome {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// Configurations discovered but never analyzed
    pub fn skipped(&self) -> usize {
        self.configurations.saturating_sub(self.checked.len())
    }
}

/// Result of a multi-file run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Per-file outcomes in input order
    pub outcomes: Vec<FileOutcome>,

    /// Files that could not be read, with the reason
    pub failed: Vec<(String, String)>,

    /// Diagnostics that reached the sink
    pub reported: usize,

    /// Diagnostics dropped as duplicates
    pub suppressed: usize,

    /// The whole-program pass reported something
    pub whole_program_findings: bool,

    pub terminated: bool,
}

impl RunSummary {
    pub fn files_checked(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.terminated).count()
    }

    pub fn cache_hits(&self) -> usize {
        self.outcomes.iter().map(|o| o.cache_hits).sum()
    }

    pub fn configurations_checked(&self) -> usize {
        self.outcomes.iter().map(|o| o.checked.len()).sum()
    }
}
