//! Multi-file runs: deduplication, build-dir cache, whole-program analysis,
//! termination and unreadable inputs.

mod common;

use common::*;
use cxxscan_core::features::build_cache::BuildDirCache;
use cxxscan_core::{CollectingLogger, Settings};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn ctu_sources(dir: &TempDir) -> Vec<std::path::PathBuf> {
    write_sources(dir.path(), &[("a.c", CTU_NULL_CALLER), ("b.c", CTU_NULL_CALLEE)])
}

// ═══════════════════════════════════════════════════════════════════════════
// Deduplication
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_duplicates_reach_the_sink_once() {
    let dir = TempDir::new().unwrap();
    let path = write_sources(dir.path(), &[("dup.c", TWO_DEFECTS)]).remove(0);

    let mut logger = CollectingLogger::new();
    let summary = analyzer(Settings::default()).check_files(&[path.clone(), path], &mut logger);

    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(count_id(&logger, "uninitvar"), 1);
    assert_eq!(count_id(&logger, "zerodiv"), 1);
    assert_eq!(summary.reported, logger.errors.len());
    assert_eq!(summary.suppressed, summary.outcomes[0].diagnostics);
    assert_no_duplicates(&logger.errors);
}

#[test]
fn test_emit_duplicates_opts_out() {
    let dir = TempDir::new().unwrap();
    let path = write_sources(dir.path(), &[("dup.c", TWO_DEFECTS)]).remove(0);

    let mut logger = CollectingLogger::new();
    let summary = analyzer(Settings::default().emit_duplicates(true)).check_files(&[path.clone(), path], &mut logger);

    assert_eq!(count_id(&logger, "uninitvar"), 2);
    assert_eq!(summary.suppressed, 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Whole-program analysis
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_null_passed_across_files() {
    let dir = TempDir::new().unwrap();
    let files = ctu_sources(&dir);

    let mut logger = CollectingLogger::new();
    let summary = analyzer(Settings::default()).check_files(&files, &mut logger);

    assert!(summary.whole_program_findings);
    let msgs = logger.with_id("ctunullpointer");
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].short_message, "Null pointer dereference: p");
    let files: Vec<&str> = msgs[0].call_stack.iter().map(|l| l.file.as_str()).collect();
    assert!(files.first().is_some_and(|f| f.ends_with("a.c")));
    assert!(files.last().is_some_and(|f| f.ends_with("b.c")));
}

#[test]
fn test_whole_program_pass_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let files = ctu_sources(&dir);
    let mut settings = Settings::default();
    settings.ctu.enabled = false;

    let mut logger = CollectingLogger::new();
    let summary = analyzer(settings).check_files(&files, &mut logger);
    assert!(!summary.whole_program_findings);
    assert_eq!(count_id(&logger, "ctunullpointer"), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Build-dir cache
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cache_round_trip_reproduces_diagnostics() {
    let src = TempDir::new().unwrap();
    let build = TempDir::new().unwrap();
    let files = ctu_sources(&src);
    let settings = Settings::default().build_dir(build.path());

    let mut scratch = CollectingLogger::new();
    analyzer(Settings::default()).check_files(&files, &mut scratch);

    let mut first = CollectingLogger::new();
    let cold = analyzer(settings.clone()).check_files(&files, &mut first);
    assert_eq!(cold.cache_hits(), 0);

    let cache = BuildDirCache::new(build.path()).unwrap();
    for file in &files {
        assert!(cache.read_summary(&file.to_string_lossy(), "").is_some());
    }

    let mut second = CollectingLogger::new();
    let warm = analyzer(settings).check_files(&files, &mut second);
    assert_eq!(warm.cache_hits(), 2);
    assert_eq!(count_id(&second, "ctunullpointer"), 1);
    assert_eq!(sorted_texts(&second), sorted_texts(&first));
    assert_eq!(sorted_texts(&second), sorted_texts(&scratch));
}

#[test]
fn test_changed_source_misses_the_cache() {
    let src = TempDir::new().unwrap();
    let build = TempDir::new().unwrap();
    let files = ctu_sources(&src);
    let settings = Settings::default().build_dir(build.path());

    analyzer(settings.clone()).check_files(&files, &mut CollectingLogger::new());
    std::fs::write(&files[1], "void use(int *p) {\n}\n").unwrap();

    let mut logger = CollectingLogger::new();
    let summary = analyzer(settings).check_files(&files, &mut logger);
    assert_eq!(summary.cache_hits(), 1);
    assert_eq!(count_id(&logger, "ctunullpointer"), 0);
}

#[test]
fn test_changed_settings_miss_the_cache() {
    let src = TempDir::new().unwrap();
    let build = TempDir::new().unwrap();
    let files = ctu_sources(&src);

    analyzer(Settings::default().build_dir(build.path())).check_files(&files, &mut CollectingLogger::new());
    let summary = analyzer(Settings::default().build_dir(build.path()).inconclusive(true))
        .check_files(&files, &mut CollectingLogger::new());
    assert_eq!(summary.cache_hits(), 0);
}

#[test]
fn test_corrupted_cache_is_recomputed() {
    let src = TempDir::new().unwrap();
    let build = TempDir::new().unwrap();
    let files = ctu_sources(&src);
    let settings = Settings::default().build_dir(build.path());

    let mut first = CollectingLogger::new();
    analyzer(settings.clone()).check_files(&files, &mut first);
    for entry in std::fs::read_dir(build.path()).unwrap() {
        std::fs::write(entry.unwrap().path(), b"\0\0 definitely not json").unwrap();
    }

    let mut second = CollectingLogger::new();
    let summary = analyzer(settings).check_files(&files, &mut second);
    assert_eq!(summary.cache_hits(), 0);
    assert!(summary.failed.is_empty());
    assert_eq!(sorted_texts(&second), sorted_texts(&first));
}

// ═══════════════════════════════════════════════════════════════════════════
// Termination and failures
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_terminated_run_discards_results() {
    let dir = TempDir::new().unwrap();
    let files = write_sources(dir.path(), &[("a.c", TWO_DEFECTS), ("b.c", TWO_DEFECTS)]);
    let analyzer = analyzer(Settings::default());
    analyzer.terminate_flag().request();

    let mut logger = CollectingLogger::new();
    let summary = analyzer.check_files(&files, &mut logger);
    assert!(summary.terminated);
    assert!(summary.outcomes.iter().all(|o| o.terminated));
    assert_eq!(summary.files_checked(), 0);
    assert!(logger.errors.is_empty());

    analyzer.terminate_flag().reset();
    let summary = analyzer.check_files(&files, &mut logger);
    assert!(!summary.terminated);
    assert_eq!(summary.files_checked(), 2);
}

#[test]
fn test_unreadable_file_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let mut files = write_sources(dir.path(), &[("ok.c", TWO_DEFECTS)]);
    files.push(dir.path().join("missing.c"));

    let mut logger = CollectingLogger::new();
    let summary = analyzer(Settings::default()).check_files(&files, &mut logger);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].0.ends_with("missing.c"));
    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(count_id(&logger, "zerodiv"), 1);
}

#[test]
fn test_check_file_reads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = write_sources(dir.path(), &[("one.c", TWO_DEFECTS)]).remove(0);
    let mut logger = CollectingLogger::new();
    let outcome = analyzer(Settings::default()).check_file(&path, &mut logger).unwrap();
    assert_eq!(outcome.checked, vec![String::new()]);
    assert_eq!(outcome.diagnostics, logger.errors.len());
    assert_eq!(count_id(&logger, "zerodiv"), 1);
    assert!(logger.output[0].starts_with("Checking "));
}
