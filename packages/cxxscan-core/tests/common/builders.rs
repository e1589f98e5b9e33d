//! Builders for analyzers and on-disk inputs

use cxxscan_core::features::library::Library;
use cxxscan_core::features::symbol_db::SymbolDatabase;
use cxxscan_core::features::tokenizer::{TokenList, Tokenizer};
use cxxscan_core::features::value_flow::{ValueFlowEngine, ValueFlowReport};
use cxxscan_core::{Analyzer, CollectingLogger, FileOutcome, Settings};
use std::path::{Path, PathBuf};

pub fn analyzer(settings: Settings) -> Analyzer {
    Analyzer::new(settings).expect("analyzer")
}

/// Analyze one source text with default settings
pub fn analyze(file: &str, code: &str) -> (FileOutcome, CollectingLogger) {
    analyze_with(Settings::default(), file, code)
}

pub fn analyze_with(settings: Settings, file: &str, code: &str) -> (FileOutcome, CollectingLogger) {
    let mut logger = CollectingLogger::new();
    let outcome = analyzer(settings).check_source(file, code, &mut logger);
    (outcome, logger)
}

/// Token list through value flow, without running checks
pub fn annotate(code: &str) -> (TokenList, SymbolDatabase, ValueFlowReport) {
    let settings = Settings::default();
    let library = Library::standard().expect("std library");
    let mut list = Tokenizer::new(&settings).tokenize_str(code, "test.cpp").expect("tokenize").list;
    let db = SymbolDatabase::build(&mut list, &settings, &library);
    let report = ValueFlowEngine::new().run(&mut list, &db, &settings, &library);
    (list, db, report)
}

/// Write `(name, code)` pairs below `dir`
pub fn write_sources(dir: &Path, files: &[(&str, &str)]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, code)| {
            let path = dir.join(name);
            std::fs::write(&path, code).expect("write source");
            path
        })
        .collect()
}
