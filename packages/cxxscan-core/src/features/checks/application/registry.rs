//! Check registry
//!
//! The ordered, immutable collection of checks that every file is run
//! through. Built once and shared read-only by all workers.

use crate::config::Settings;
use crate::features::checks::infrastructure::{
    AutoVariables, BufferOverrun, ClassCheck, ConditionCheck, IoCheck, MemoryCheck, NullPointer, OtherCheck,
    StlCheck, UninitVar,
};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::ctu::FileSummary;
use crate::shared::models::ErrorMessage;
use crate::shared::ports::{CollectingLogger, ErrorLogger};
use std::collections::BTreeMap;
use tracing::debug;

/// Ordered set of checks; order decides report order within a file
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

/// The built-in checks in their fixed order
pub fn register_checks() -> CheckRegistry {
    CheckRegistry::new(vec![
        Box::new(UninitVar),
        Box::new(NullPointer),
        Box::new(MemoryCheck),
        Box::new(BufferOverrun),
        Box::new(ConditionCheck),
        Box::new(OtherCheck),
        Box::new(AutoVariables),
        Box::new(StlCheck),
        Box::new(ClassCheck),
        Box::new(IoCheck),
    ])
}

impl CheckRegistry {
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.iter().map(|c| c.as_ref())
    }

    /// Run every check over one file+configuration
    pub fn run_all(&self, ctx: &CheckContext<'_>, logger: &mut dyn ErrorLogger) -> usize {
        let mut reporter = Reporter::new(ctx.list, ctx.settings, ctx.file0, logger);
        for check in &self.checks {
            let before = reporter.reported();
            check.run_checks(ctx, &mut reporter);
            debug!(check = check.name(), file = ctx.file0, reported = reporter.reported() - before, "check done");
        }
        reporter.reported()
    }

    /// Whole-program summaries of one file+configuration, keyed by check
    pub fn file_infos(&self, ctx: &CheckContext<'_>) -> BTreeMap<String, FileSummary> {
        self.checks
            .iter()
            .filter_map(|c| c.get_file_info(ctx).map(|info| (c.name().to_string(), info)))
            .collect()
    }

    /// Hand every check the summaries it produced for all files
    pub fn analyse_whole_program(
        &self,
        summaries: &BTreeMap<String, Vec<FileSummary>>,
        settings: &Settings,
        logger: &mut dyn ErrorLogger,
    ) -> bool {
        let mut reporter = Reporter::whole_program(settings, logger);
        let mut any = false;
        for check in &self.checks {
            let Some(infos) = summaries.get(check.name()) else { continue };
            any |= check.analyse_whole_program(infos, settings, &mut reporter);
        }
        any
    }

    /// One example of every message any check can produce
    pub fn error_list(&self) -> Vec<ErrorMessage> {
        let mut logger = CollectingLogger::new();
        {
            let mut reporter = Reporter::error_list(&mut logger);
            for check in &self.checks {
                check.get_error_messages(&mut reporter);
            }
        }
        logger.errors
    }

    /// Documentation of all checks
    pub fn documentation(&self) -> String {
        let mut out = String::new();
        for check in &self.checks {
            let info = check.class_info();
            let mut lines = info.lines();
            let title = lines.next().unwrap_or_default();
            out.push_str(&format!("## {}\n\n{}\n", check.name(), title));
            for line in lines {
                out.push_str(line.trim());
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}
