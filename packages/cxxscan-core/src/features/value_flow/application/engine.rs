//! Fixed-point value-flow engine

use crate::config::{AnalysisLimits, Settings};
use crate::features::library::Library;
use crate::features::symbol_db::SymbolDatabase;
use crate::features::tokenizer::TokenList;
use crate::features::value_flow::domain::ValueStore;
use crate::features::value_flow::infrastructure::default_passes;
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Sweeps run even without a configured iteration limit
const SAFETY_MAX_SWEEPS: usize = 1000;

/// Why the engine stopped before reaching a fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bailout {
    Iterations,
    Timeout,
}

/// Iteration counter plus wall-clock deadline
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub max_iterations: usize,
    pub deadline: Option<Instant>,
}

impl Budget {
    pub fn from_limits(limits: &AnalysisLimits, start: Instant) -> Self {
        Self {
            max_iterations: limits
                .max_value_flow_iterations
                .map_or(SAFETY_MAX_SWEEPS, |n| n.min(SAFETY_MAX_SWEEPS)),
            deadline: limits.value_flow_time_budget.map(|d| start + d),
        }
    }

    fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

/// Outcome of one engine run
#[derive(Debug, Clone, Default)]
pub struct ValueFlowReport {
    /// Sweeps executed
    pub iterations: usize,
    /// Values added so far, recorded after each sweep
    pub values_per_iteration: Vec<usize>,
    pub bailout: Option<Bailout>,
    pub elapsed: Duration,
    /// Values rejected by the per-token cap
    pub dropped: usize,
}

impl ValueFlowReport {
    pub fn total_values(&self) -> usize {
        self.values_per_iteration.last().copied().unwrap_or(0)
    }
}

pub struct ValueFlowEngine {
    passes: Vec<Box<dyn ValueFlowPass>>,
}

impl ValueFlowEngine {
    pub fn new() -> Self {
        Self {
            passes: default_passes(),
        }
    }

    pub fn with_passes(passes: Vec<Box<dyn ValueFlowPass>>) -> Self {
        Self { passes }
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run all passes until a sweep adds nothing or the budget runs out
    pub fn run(&self, list: &mut TokenList, db: &SymbolDatabase, settings: &Settings, library: &Library) -> ValueFlowReport {
        let start = Instant::now();
        let limits = settings.analysis_limits();
        let platform = settings.target();
        let budget = Budget::from_limits(&limits, start);
        let mut store = ValueStore::new(limits.max_values_per_token);
        let mut report = ValueFlowReport::default();

        let mut ctx = PassContext::new(list, db, &platform, library, &limits, &mut store);
        loop {
            if budget.expired(Instant::now()) {
                report.bailout = Some(Bailout::Timeout);
                break;
            }
            if report.iterations >= budget.max_iterations {
                report.bailout = Some(Bailout::Iterations);
                break;
            }
            report.iterations += 1;

            let mut added = 0;
            for pass in &self.passes {
                let n = pass.run(&mut ctx);
                #[cfg(feature = "trace")]
                debug!(pass = pass.name(), sweep = report.iterations, added = n, "value-flow pass");
                added += n;
            }
            report.values_per_iteration.push(ctx.values_added());
            if added == 0 {
                break;
            }
        }
        drop(ctx);

        report.dropped = store.dropped();
        report.elapsed = start.elapsed();
        match report.bailout {
            Some(reason) => warn!(
                reason = ?reason,
                iterations = report.iterations,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Value flow stopped before reaching a fixed point"
            ),
            None => debug!(
                iterations = report.iterations,
                values = report.total_values(),
                dropped = report.dropped,
                "Value flow converged"
            ),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckLevel;
    use crate::features::tokenizer::Tokenizer;

    struct Fixture {
        list: TokenList,
        db: SymbolDatabase,
        library: Library,
    }

    fn fixture(code: &str, settings: &Settings) -> Fixture {
        let mut list = Tokenizer::new(settings).tokenize_str(code, "t.cpp").unwrap().list;
        let library = Library::standard().unwrap();
        let db = SymbolDatabase::build(&mut list, settings, &library);
        Fixture { list, db, library }
    }

    fn nth_values(fx: &Fixture, text: &str, n: usize) -> Vec<crate::features::value_flow::domain::Value> {
        let t = fx.list.iter().filter(|&t| fx.list.text(t) == text).nth(n).unwrap();
        fx.list[t].values.clone()
    }

    const SAMPLE: &str = "int size() { return 4; }
        void f(int c) {
            int x = 2 + 3;
            int *p = 0;
            char buf[10];
            int y;
            if (c) { y = x; } else { y = size(); }
            for (int i = 0; i < 10; i++) { buf[i] = 0; }
            if (x == 5) { g(y); }
        }";

    #[test]
    fn test_values_grow_monotonically() {
        let settings = Settings::new().check_level(CheckLevel::Exhaustive);
        let mut fx = fixture(SAMPLE, &settings);
        let report = ValueFlowEngine::new().run(&mut fx.list, &fx.db, &settings, &fx.library);
        assert!(report.bailout.is_none());
        assert!(report.iterations >= 2);
        assert!(report.values_per_iteration.windows(2).all(|w| w[0] <= w[1]));
        // the final sweep added nothing
        let n = report.values_per_iteration.len();
        assert_eq!(report.values_per_iteration[n - 1], report.values_per_iteration[n - 2]);
    }

    #[test]
    fn test_second_run_adds_nothing() {
        let settings = Settings::new().check_level(CheckLevel::Exhaustive);
        let mut fx = fixture(SAMPLE, &settings);
        let engine = ValueFlowEngine::new();
        engine.run(&mut fx.list, &fx.db, &settings, &fx.library);
        let again = engine.run(&mut fx.list, &fx.db, &settings, &fx.library);
        assert_eq!(again.iterations, 1);
        assert_eq!(again.total_values(), 0);
    }

    #[test]
    fn test_iteration_budget_bails_out() {
        let mut limits = AnalysisLimits::unbounded();
        limits.max_value_flow_iterations = Some(1);
        let settings = Settings::new().limits(limits);
        let mut fx = fixture(SAMPLE, &settings);
        let report = ValueFlowEngine::new().run(&mut fx.list, &fx.db, &settings, &fx.library);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.bailout, Some(Bailout::Iterations));
    }

    #[test]
    fn test_expired_deadline_stops_immediately() {
        let mut limits = AnalysisLimits::unbounded();
        limits.value_flow_time_budget = Some(Duration::ZERO);
        let settings = Settings::new().limits(limits);
        let mut fx = fixture(SAMPLE, &settings);
        let report = ValueFlowEngine::new().run(&mut fx.list, &fx.db, &settings, &fx.library);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.bailout, Some(Bailout::Timeout));
    }

    #[test]
    fn test_folded_constant_known_at_condition() {
        let settings = Settings::default();
        let mut fx = fixture("void f() { int x = 2+3; if (x == 5) { g(); } }", &settings);
        ValueFlowEngine::new().run(&mut fx.list, &fx.db, &settings, &fx.library);
        let x = nth_values(&fx, "x", 2);
        assert_eq!(x.len(), 1);
        assert!(x[0].is_known());
        assert_eq!(x[0].int_value(), Some(5));
        let eq = nth_values(&fx, "==", 0);
        assert!(eq.iter().any(|v| v.is_known() && v.int_value() == Some(1)));
    }

    #[test]
    fn test_uninit_reaches_increment() {
        let settings = Settings::default();
        let mut fx = fixture("void f(){ int a; a++; }", &settings);
        ValueFlowEngine::new().run(&mut fx.list, &fx.db, &settings, &fx.library);
        let a = nth_values(&fx, "a", 1);
        assert!(a.iter().any(|v| v.is_uninit() && v.is_known()));
    }

    #[test]
    fn test_default_pass_order() {
        let names = ValueFlowEngine::new().pass_names();
        assert_eq!(names.first(), Some(&"literals"));
        assert_eq!(names.last(), Some(&"sub-function"));
        assert_eq!(names.len(), 12);
    }
}
