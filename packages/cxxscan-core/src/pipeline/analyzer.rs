//! Analyzer: the per-file state machine and the parallel file driver
//!
//! ```text
//! start → configurations → for each configuration (≤ max_configs unless forced):
//!     cache lookup → preprocess → tokenize → symbol DB → value flow → checks
//!     → CTU summary → cache write
//! → flush diagnostics → end of file
//! ```
//!
//! A file's diagnostics are buffered and reach the sink only once the file
//! is finished, so a cancelled file leaves nothing behind.

use crate::config::Settings;
use crate::errors::Result;
use crate::features::build_cache::{BuildDirCache, CacheEntry, Fingerprint};
use crate::features::checks::{register_checks, CheckContext, CheckRegistry};
use crate::features::ctu::FileSummary;
use crate::features::library::Library;
use crate::features::preprocessor::Preprocessor;
use crate::features::symbol_db::SymbolDatabase;
use crate::features::tokenizer::{TokenList, Tokenizer};
use crate::features::value_flow::{Bailout, ValueFlowEngine, ValueFlowReport};
use crate::pipeline::{DedupLogger, FileOutcome, RunSummary, TerminateFlag};
use crate::shared::models::{Certainty, ErrorMessage, FileLocation, Severity};
use crate::shared::ports::{CollectingLogger, ErrorLogger, SharedLogger};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one file+configuration
#[derive(Debug, Default)]
struct ConfigResult {
    messages: Vec<ErrorMessage>,
    file_infos: BTreeMap<String, FileSummary>,
    cached: bool,
    aborted: bool,
    bailout: bool,
}

impl ConfigResult {
    fn aborted(message: ErrorMessage) -> Self {
        Self {
            messages: vec![message],
            aborted: true,
            ..Default::default()
        }
    }
}

/// Analysis driver shared by all worker threads
pub struct Analyzer {
    settings: Arc<Settings>,
    library: Arc<Library>,
    registry: Arc<CheckRegistry>,
    cache: Option<BuildDirCache>,
    terminate: TerminateFlag,
}

impl Analyzer {
    /// Analyzer with the built-in library and checks
    pub fn new(settings: Settings) -> Result<Self> {
        let library = Library::standard()?;
        Self::with_parts(settings, library, register_checks())
    }

    pub fn with_parts(settings: Settings, library: Library, registry: CheckRegistry) -> Result<Self> {
        settings.validate()?;
        let cache = match &settings.build_dir {
            Some(dir) => Some(BuildDirCache::new(dir)?),
            None => None,
        };
        info!(
            check_level = %settings.check_level,
            platform = settings.platform.as_str(),
            checks = registry.len(),
            build_dir = settings.build_dir.is_some(),
            "analyzer ready"
        );
        Ok(Self {
            settings: Arc::new(settings),
            library: Arc::new(library),
            registry: Arc::new(registry),
            cache,
            terminate: TerminateFlag::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Handle for requesting termination from another thread
    pub fn terminate_flag(&self) -> TerminateFlag {
        self.terminate.clone()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Single file
    // ═══════════════════════════════════════════════════════════════════════

    /// Analyze source text; duplicates are suppressed within this call
    pub fn check_source(&self, file: &str, source: &str, logger: &mut dyn ErrorLogger) -> FileOutcome {
        let mut sink = DedupLogger::new(logger, !self.settings.emit_duplicates);
        self.run_file(file, source, &mut sink)
    }

    /// Read and analyze one file
    pub fn check_file(&self, path: &Path, logger: &mut dyn ErrorLogger) -> Result<FileOutcome> {
        let mut sink = DedupLogger::new(logger, !self.settings.emit_duplicates);
        self.analyze_path(path, &mut sink)
    }

    fn analyze_path(&self, path: &Path, logger: &mut dyn ErrorLogger) -> Result<FileOutcome> {
        let bytes = std::fs::read(path)?;
        let source = String::from_utf8_lossy(&bytes);
        Ok(self.run_file(&path.to_string_lossy(), &source, logger))
    }

    fn run_file(&self, file: &str, source: &str, logger: &mut dyn ErrorLogger) -> FileOutcome {
        let mut outcome = FileOutcome::new(file);
        if self.terminate.is_requested() {
            debug!(file, "termination requested, file skipped");
            outcome.terminated = true;
            return outcome;
        }
        logger.report_out(&format!("Checking {} ...", file));

        let pre = match Preprocessor::new(source, file, &self.settings.defines) {
            Ok(pre) => pre,
            Err(err) => {
                warn!(file, error = %err, "file could not be lexed");
                let msg = error_message(file, err.diagnostic_id(), &err.diagnostic_message(), err.location());
                logger.report_err(&msg);
                outcome.aborted.push(String::new());
                outcome.diagnostics = 1;
                return outcome;
            }
        };

        let configurations = pre.configurations();
        outcome.configurations = configurations.len();
        let limit = if self.settings.force {
            configurations.len()
        } else {
            configurations.len().min(self.settings.max_configs)
        };

        let mut messages = Vec::new();
        if limit < configurations.len() {
            info!(file, total = configurations.len(), checked = limit, "too many configurations");
            if self.settings.is_enabled(Severity::Information) {
                messages.push(too_many_configs(file, limit, configurations.len()));
            }
        }

        for cfg in configurations.iter().take(limit) {
            if self.terminate.is_requested() {
                info!(file, cfg = cfg.as_str(), "termination requested, partial results discarded");
                outcome.terminated = true;
                return outcome;
            }
            if !cfg.is_empty() {
                logger.report_out(&format!("Checking {}: {}...", file, cfg));
            }

            let result = self.check_configuration(&pre, source, cfg);
            outcome.checked.push(cfg.clone());
            if result.cached {
                outcome.cache_hits += 1;
            }
            if result.aborted {
                outcome.aborted.push(cfg.clone());
            }
            if result.bailout {
                outcome.bailouts += 1;
            }
            messages.extend(result.messages);
            outcome.file_infos.push(result.file_infos);
        }

        outcome.diagnostics = messages.len();
        for msg in &messages {
            logger.report_err(msg);
        }
        debug!(
            file,
            configurations = outcome.checked.len(),
            cache_hits = outcome.cache_hits,
            diagnostics = outcome.diagnostics,
            "file done"
        );
        outcome
    }

    /// Cache lookup, analysis, cache write
    fn check_configuration(&self, pre: &Preprocessor, source: &str, cfg: &str) -> ConfigResult {
        let file = pre.file_name();
        let Some(cache) = &self.cache else {
            return self.analyze_configuration(pre, cfg);
        };

        let fingerprint = Fingerprint::for_analysis(source, cfg, &self.settings.signature());
        if let Some(entry) = cache.read_summary(file, cfg) {
            if entry.is_valid_for(&fingerprint) {
                debug!(file, cfg, fingerprint = %fingerprint, "build-dir cache hit");
                return ConfigResult {
                    messages: entry.diagnostics,
                    file_infos: entry.file_infos,
                    cached: true,
                    ..Default::default()
                };
            }
            debug!(file, cfg, "stale build-dir cache entry");
        }

        let result = self.analyze_configuration(pre, cfg);
        let entry = CacheEntry {
            version: CacheEntry::VERSION,
            fingerprint,
            diagnostics: result.messages.clone(),
            file_infos: result.file_infos.clone(),
        };
        if let Err(err) = cache.write_summary(file, cfg, &entry) {
            warn!(file, cfg, error = %err, "build-dir cache entry not written");
        }
        result
    }

    /// Preprocess → tokenize → symbol DB → value flow → checks
    fn analyze_configuration(&self, pre: &Preprocessor, cfg: &str) -> ConfigResult {
        let file = pre.file_name();

        let raw = match pre.preprocess(cfg) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(file, cfg, error = %err, "configuration skipped");
                return ConfigResult::aborted(error_message(
                    file,
                    err.diagnostic_id(),
                    &err.diagnostic_message(),
                    err.location(),
                ));
            }
        };

        let mut list = match Tokenizer::new(&self.settings).tokenize(raw, pre.files()) {
            Ok(output) => {
                if output.simplify.bounded {
                    debug!(file, cfg, rounds = output.simplify.rounds, "simplification stopped on its round limit");
                }
                output.list
            }
            Err(err) => {
                warn!(file, cfg, error = %err, "configuration aborted");
                return ConfigResult::aborted(error_message(file, err.diagnostic_id(), err.message(), err.location()));
            }
        };

        let db = SymbolDatabase::build(&mut list, &self.settings, &self.library);
        let report = ValueFlowEngine::new().run(&mut list, &db, &self.settings, &self.library);

        let mut messages = Vec::new();
        if let Some(reason) = report.bailout {
            if self.settings.debug_warnings {
                messages.push(bailout_message(&list, file, reason, &report));
            }
        }

        let ctx = CheckContext::new(&list, &db, &self.settings, &self.library, file);
        let mut collected = CollectingLogger::new();
        let reported = self.registry.run_all(&ctx, &mut collected);
        debug!(file, cfg, reported, values = report.total_values(), "configuration checked");
        messages.extend(collected.errors);

        ConfigResult {
            messages,
            file_infos: self.registry.file_infos(&ctx),
            bailout: report.bailout.is_some(),
            ..Default::default()
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Many files
    // ═══════════════════════════════════════════════════════════════════════

    /// Analyze files in parallel, then run the whole-program pass
    ///
    /// Every file gets its own pipeline state; only the sink is shared.
    pub fn check_files<L: ErrorLogger + Send>(&self, files: &[PathBuf], logger: &mut L) -> RunSummary {
        let sink = Arc::new(Mutex::new(DedupLogger::new(logger, !self.settings.emit_duplicates)));
        let shared = SharedLogger::new(Arc::clone(&sink));

        let results: Vec<(String, Result<FileOutcome>)> = files
            .par_iter()
            .map(|path| {
                let mut out = shared.clone();
                (path.display().to_string(), self.analyze_path(path, &mut out))
            })
            .collect();

        let mut summary = RunSummary::default();
        for (file, result) in results {
            match result {
                Ok(outcome) => summary.outcomes.push(outcome),
                Err(err) => {
                    warn!(file = file.as_str(), error = %err, "file could not be analyzed");
                    summary.failed.push((file, err.to_string()));
                }
            }
        }
        summary.terminated = self.terminate.is_requested() || summary.outcomes.iter().any(|o| o.terminated);

        if self.settings.ctu.enabled && !summary.terminated {
            let summaries = collect_summaries(&summary.outcomes);
            if !summaries.is_empty() {
                let mut out = shared.clone();
                summary.whole_program_findings =
                    self.registry.analyse_whole_program(&summaries, &self.settings, &mut out);
                debug!(
                    checks = summaries.len(),
                    findings = summary.whole_program_findings,
                    "whole-program analysis done"
                );
            }
        }

        drop(shared);
        let sink = sink.lock();
        summary.reported = sink.forwarded();
        summary.suppressed = sink.suppressed();
        info!(
            files = summary.outcomes.len(),
            failed = summary.failed.len(),
            reported = summary.reported,
            suppressed = summary.suppressed,
            cache_hits = summary.cache_hits(),
            terminated = summary.terminated,
            "analysis finished"
        );
        summary
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("checks", &self.registry.names())
            .field("build_dir", &self.cache.as_ref().map(|c| c.dir().to_path_buf()))
            .finish()
    }
}

/// Summaries of all files grouped by the check that produced them
fn collect_summaries(outcomes: &[FileOutcome]) -> BTreeMap<String, Vec<FileSummary>> {
    let mut grouped: BTreeMap<String, Vec<FileSummary>> = BTreeMap::new();
    for infos in outcomes.iter().flat_map(|o| o.file_infos.iter()) {
        for (check, info) in infos {
            grouped.entry(check.clone()).or_default().push(info.clone());
        }
    }
    grouped
}

fn error_message(file: &str, id: &str, text: &str, location: &FileLocation) -> ErrorMessage {
    ErrorMessage::new(
        vec![location.clone()],
        file,
        Severity::Error,
        text,
        id,
        Certainty::Normal,
    )
}

fn too_many_configs(file: &str, checked: usize, total: usize) -> ErrorMessage {
    ErrorMessage::new(
        Vec::new(),
        file,
        Severity::Information,
        &format!(
            "Too many #ifdef configurations - only {} of {} configurations are checked. \
             Use force to check all configurations.",
            checked, total
        ),
        "toomanyconfigs",
        Certainty::Normal,
    )
}

fn bailout_message(list: &TokenList, file: &str, reason: Bailout, report: &ValueFlowReport) -> ErrorMessage {
    let location = match list.iter().next() {
        Some(first) => list.location(first),
        None => FileLocation::new(file, 0, 0),
    };
    let text = match reason {
        Bailout::Iterations => format!(
            "Value flow analysis stopped after {} iterations. Results may be incomplete.",
            report.iterations
        ),
        Bailout::Timeout => format!(
            "Value flow analysis stopped after {} ms. Results may be incomplete.",
            report.elapsed.as_millis()
        ),
    };
    ErrorMessage::new(vec![location], file, Severity::Debug, &text, "valueFlowBailout", Certainty::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisLimits;
    use crate::errors::CxxscanError;
    use pretty_assertions::assert_eq;

    fn analyzer(settings: Settings) -> Analyzer {
        Analyzer::new(settings).unwrap()
    }

    #[test]
    fn test_single_uninitialized_variable() {
        let mut logger = CollectingLogger::new();
        let outcome = analyzer(Settings::default()).check_source("a.c", "void f(){ int a; a++; }", &mut logger);
        assert_eq!(outcome.checked, vec![String::new()]);
        assert_eq!(logger.ids(), vec!["uninitvar"]);
        assert_eq!(logger.errors[0].severity, Severity::Error);
        assert_eq!(logger.output, vec!["Checking a.c ...".to_string()]);
    }

    #[test]
    fn test_syntax_error_aborts_only_its_configuration() {
        let code = "#ifdef A\nvoid f() { ( }\n#else\nvoid g() { int x; x++; }\n#endif\n";
        let mut logger = CollectingLogger::new();
        let outcome = analyzer(Settings::default()).check_source("a.c", code, &mut logger);
        assert_eq!(outcome.checked, vec![String::new(), "A".to_string()]);
        assert_eq!(outcome.aborted, vec!["A".to_string()]);
        assert_eq!(logger.ids(), vec!["uninitvar", "syntaxError"]);
    }

    #[test]
    fn test_error_directive_skips_configuration() {
        let code = "#ifdef A\n#error A is unsupported\n#endif\nint x;\n";
        let mut logger = CollectingLogger::new();
        let outcome = analyzer(Settings::default()).check_source("a.c", code, &mut logger);
        assert_eq!(outcome.aborted, vec!["A".to_string()]);
        let msgs = logger.with_id("preprocessorErrorDirective");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].short_message, "#error A is unsupported");
    }

    #[test]
    fn test_bailout_is_a_debug_message() {
        let limits = AnalysisLimits {
            max_value_flow_iterations: Some(1),
            ..AnalysisLimits::default()
        };
        let code = "void f() { int a = 1; int b = a; int c = b; int d = c; int e = d; }";
        let quiet = Settings::default().limits(limits.clone());
        let mut logger = CollectingLogger::new();
        let outcome = analyzer(quiet).check_source("a.c", code, &mut logger);
        assert_eq!(outcome.bailouts, 1);
        assert!(logger.with_id("valueFlowBailout").is_empty());

        let mut loud = Settings::default().limits(limits);
        loud.debug_warnings = true;
        let mut logger = CollectingLogger::new();
        analyzer(loud).check_source("a.c", code, &mut logger);
        let msgs = logger.with_id("valueFlowBailout");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].severity, Severity::Debug);
    }

    #[test]
    fn test_terminated_before_start() {
        let analyzer = analyzer(Settings::default());
        analyzer.terminate_flag().request();
        let mut logger = CollectingLogger::new();
        let outcome = analyzer.check_source("a.c", "void f(){ int a; a++; }", &mut logger);
        assert!(outcome.terminated);
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let err = Analyzer::new(Settings::default().max_configs(0)).unwrap_err();
        assert!(matches!(err, CxxscanError::Config(_)));
    }
}
