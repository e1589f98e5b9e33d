//! Check Ports
//!
//! [`Check`] is the one capability every check implements. Checks see the
//! analyzed file through [`CheckContext`] and emit through [`Reporter`], the
//! shared "report an error" call that is also used to enumerate each
//! check's messages without any source.

use crate::config::{Platform, Settings};
use crate::features::checks::domain::Diagnostic;
use crate::features::ctu::FileSummary;
use crate::features::library::Library;
use crate::features::symbol_db::SymbolDatabase;
use crate::features::tokenizer::TokenList;
use crate::shared::models::{Certainty, ErrorMessage, FileLocation};
use crate::shared::ports::ErrorLogger;

// ═══════════════════════════════════════════════════════════════════════════
// Check context
// ═══════════════════════════════════════════════════════════════════════════

/// One analyzed file+configuration, read-only
pub struct CheckContext<'a> {
    pub list: &'a TokenList,
    pub db: &'a SymbolDatabase,
    pub settings: &'a Settings,
    pub library: &'a Library,
    pub platform: Platform,
    /// Primary file of the translation unit
    pub file0: &'a str,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        list: &'a TokenList,
        db: &'a SymbolDatabase,
        settings: &'a Settings,
        library: &'a Library,
        file0: &'a str,
    ) -> Self {
        Self {
            list,
            db,
            settings,
            library,
            platform: settings.target(),
            file0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Reporter
// ═══════════════════════════════════════════════════════════════════════════

/// Turns [`Diagnostic`]s into [`ErrorMessage`]s and hands them to the sink
///
/// Without a token list (error-list mode) messages carry no location and
/// no severity or certainty filtering applies.
pub struct Reporter<'r> {
    list: Option<&'r TokenList>,
    settings: Option<&'r Settings>,
    file0: String,
    logger: &'r mut dyn ErrorLogger,
    reported: usize,
}

impl<'r> Reporter<'r> {
    pub fn new(list: &'r TokenList, settings: &'r Settings, file0: &str, logger: &'r mut dyn ErrorLogger) -> Self {
        Self {
            list: Some(list),
            settings: Some(settings),
            file0: file0.to_string(),
            logger,
            reported: 0,
        }
    }

    /// Reporter for whole-program results, located by file positions only
    pub fn whole_program(settings: &'r Settings, logger: &'r mut dyn ErrorLogger) -> Self {
        Self {
            list: None,
            settings: Some(settings),
            file0: String::new(),
            logger,
            reported: 0,
        }
    }

    /// Reporter that lists messages without source
    pub fn error_list(logger: &'r mut dyn ErrorLogger) -> Self {
        Self {
            list: None,
            settings: None,
            file0: String::new(),
            logger,
            reported: 0,
        }
    }

    pub fn is_error_list(&self) -> bool {
        self.settings.is_none()
    }

    /// Messages passed to the sink so far
    pub fn reported(&self) -> usize {
        self.reported
    }

    fn accepts(&self, diagnostic: &Diagnostic) -> bool {
        match self.settings {
            Some(settings) => {
                settings.is_enabled(diagnostic.severity)
                    && (diagnostic.certainty == Certainty::Normal || settings.inconclusive)
            }
            None => true,
        }
    }

    fn call_stack(&self, diagnostic: &Diagnostic) -> Vec<FileLocation> {
        let Some(list) = self.list else {
            return Vec::new();
        };
        let mut stack: Vec<FileLocation> = diagnostic
            .path
            .iter()
            .map(|(t, info)| list.location(*t).with_info(info.clone()))
            .collect();
        if let Some(at) = diagnostic.at {
            let here = list.location(at);
            let same = stack
                .last()
                .is_some_and(|l| (l.file.as_str(), l.line, l.column) == (here.file.as_str(), here.line, here.column));
            if !same {
                stack.push(here);
            }
        }
        stack
    }

    /// The shared report call
    pub fn report(&mut self, diagnostic: Diagnostic) {
        let stack = self.call_stack(&diagnostic);
        self.report_at(diagnostic, stack);
    }

    /// Report with an explicit call stack (whole-program results)
    pub fn report_at(&mut self, diagnostic: Diagnostic, call_stack: Vec<FileLocation>) {
        if !self.accepts(&diagnostic) {
            return;
        }
        let file0 = match (self.file0.is_empty(), call_stack.first()) {
            (true, Some(first)) => first.file.clone(),
            _ => self.file0.clone(),
        };
        let mut msg = ErrorMessage::new(
            call_stack,
            file0,
            diagnostic.severity,
            &diagnostic.message,
            diagnostic.id,
            diagnostic.certainty,
        );
        msg.cwe = diagnostic.cwe;
        self.reported += 1;
        self.logger.report_err(&msg);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Check port
// ═══════════════════════════════════════════════════════════════════════════

/// One independent analysis over the annotated token list
///
/// Checks hold no per-run state; the same instance serves every file and
/// every worker thread.
pub trait Check: Send + Sync {
    /// Unique check name ("UninitVar")
    fn name(&self) -> &'static str;

    /// Documentation of what the check finds
    fn class_info(&self) -> &'static str;

    /// Analyze one file+configuration
    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>);

    /// Emit one example of every message the check can produce
    fn get_error_messages(&self, reporter: &mut Reporter<'_>);

    /// Whole-program summary of one file+configuration
    fn get_file_info(&self, _ctx: &CheckContext<'_>) -> Option<FileSummary> {
        None
    }

    /// Analyze the summaries of all files; returns true when anything was
    /// reported
    fn analyse_whole_program(&self, _summaries: &[FileSummary], _settings: &Settings, _reporter: &mut Reporter<'_>) -> bool {
        false
    }
}
