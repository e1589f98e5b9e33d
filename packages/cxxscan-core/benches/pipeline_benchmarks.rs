//! Benchmarks for pipeline performance
//!
//! Run with: cargo bench --bench pipeline_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cxxscan_core::features::library::Library;
use cxxscan_core::features::symbol_db::SymbolDatabase;
use cxxscan_core::features::tokenizer::Tokenizer;
use cxxscan_core::features::value_flow::ValueFlowEngine;
use cxxscan_core::{Analyzer, CheckLevel, CollectingLogger, Settings};

/// Generate a translation unit with `functions` small functions
fn generate_source(functions: usize) -> String {
    (0..functions)
        .map(|i| {
            format!(
                "int func_{i}(int x, int *p) {{\n    int a = {i} + 1;\n    int buf[8];\n    if (x > a) {{\n        a = x * 2;\n    }}\n    for (int k = 0; k < 8; k++) {{\n        buf[k] = a + k;\n    }}\n    if (p) {{\n        *p = buf[a % 8];\n    }}\n    return a;\n}}\n"
            )
        })
        .collect()
}

/// Generate a file whose `#ifdef` blocks yield `configs + 1` configurations
fn generate_configurations(configs: usize) -> String {
    let mut code = String::new();
    for i in 0..configs {
        code.push_str(&format!("#ifdef CFG_{i}\nint g_{i} = {i};\n#endif\n"));
    }
    code.push_str(&generate_source(5));
    code
}

/// Tokenize → symbol database → value flow, without checks
fn bench_core_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("core_stages");
    let settings = Settings::default();
    let library = Library::standard().unwrap();

    for functions in [10, 50, 200] {
        let source = generate_source(functions);
        group.throughput(Throughput::Bytes(source.len() as u64));

        group.bench_with_input(BenchmarkId::new("tokenize", functions), &source, |b, source| {
            b.iter(|| Tokenizer::new(&settings).tokenize_str(black_box(source), "bench.c").unwrap())
        });

        group.bench_with_input(BenchmarkId::new("value_flow", functions), &source, |b, source| {
            b.iter(|| {
                let mut list = Tokenizer::new(&settings).tokenize_str(source, "bench.c").unwrap().list;
                let db = SymbolDatabase::build(&mut list, &settings, &library);
                ValueFlowEngine::new().run(&mut list, &db, &settings, &library)
            })
        });
    }

    group.finish();
}

/// Full per-file pipeline, both check levels
fn bench_check_source(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_source");

    for level in [CheckLevel::Normal, CheckLevel::Exhaustive] {
        let analyzer = Analyzer::new(Settings::default().check_level(level)).unwrap();
        for functions in [10, 100] {
            let source = generate_source(functions);
            group.bench_with_input(
                BenchmarkId::new(level.as_str(), functions),
                &source,
                |b, source| {
                    b.iter(|| {
                        let mut logger = CollectingLogger::new();
                        analyzer.check_source("bench.c", black_box(source), &mut logger)
                    })
                },
            );
        }
    }

    group.finish();
}

/// Configuration discovery and the max-configs limit
fn bench_configurations(c: &mut Criterion) {
    let mut group = c.benchmark_group("configurations");
    let source = generate_configurations(24);

    for (label, force) in [("limited", false), ("forced", true)] {
        let analyzer = Analyzer::new(Settings::default().force(force)).unwrap();
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut logger = CollectingLogger::new();
                analyzer.check_source("configs.c", black_box(&source), &mut logger)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_core_stages, bench_check_source, bench_configurations);
criterion_main!(benches);
