//! Property-based tests for the analysis pipeline
//!
//! Invariants that should hold for ALL generated programs:
//! - Idempotence: simplify(simplify(T)) == simplify(T)
//! - Brackets: every bracket is linked to its partner and back
//! - Variable ids: tokens sharing an id resolve to one declaration
//! - Value flow: values only grow and the engine stays within its budget
//! - Deduplication: no identical diagnostic reaches the sink twice

mod common;

use common::*;
use cxxscan_core::features::library::Library;
use cxxscan_core::features::symbol_db::SymbolDatabase;
use cxxscan_core::features::tokenizer::infrastructure::{links_are_consistent, simplify};
use cxxscan_core::features::tokenizer::{lex, Tokenizer};
use cxxscan_core::features::value_flow::ValueFlowEngine;
use cxxscan_core::{AnalysisLimits, Settings};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Program generator
// ============================================================================

fn statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..20).prop_map(|n| format!("a = a + {};", n)),
        (0i64..20).prop_map(|n| format!("if (a > {}) {{ a--; }} else {{ b = a; }}", n)),
        (1i64..8).prop_map(|n| format!("while (a < {}) {{ a++; }}", n)),
        (0i64..4).prop_map(|n| format!("buf[{}] = (char)a;", n)),
        Just("b = (a);".to_string()),
        Just("b = sizeof(int) * 2;".to_string()),
        Just("{ int a = 3; b += a; }".to_string()),
        Just("for (int i = 0; i < 4; i++) { b = b + i; }".to_string()),
        Just("if (!p) { return b; }".to_string()),
        Just("b = *p + a;".to_string()),
    ]
}

fn program() -> impl Strategy<Value = String> {
    prop::collection::vec(statement(), 1..12).prop_map(|stmts| {
        format!(
            "int f(int *p) {{\n    int a = 0;\n    int b = 1;\n    char buf[4];\n    {}\n    return a + b;\n}}\n",
            stmts.join("\n    ")
        )
    })
}

// ============================================================================
// Tokenizer invariants
// ============================================================================

proptest! {
    #[test]
    fn prop_simplification_is_idempotent(code in program()) {
        let tokenizer = Tokenizer::new(&Settings::default());
        let raw = lex(&code, 0, "p.c").unwrap();
        let mut list = tokenizer.create_tokens(raw, vec!["p.c".to_string()]).unwrap();

        simplify(&mut list, tokenizer.platform(), None);
        let once = list.stringify();
        prop_assert!(links_are_consistent(&list));

        simplify(&mut list, tokenizer.platform(), None);
        assert_eq!(list.stringify(), once);
        prop_assert!(links_are_consistent(&list));
    }

    #[test]
    fn prop_brackets_are_linked_both_ways(code in program()) {
        let list = Tokenizer::new(&Settings::default()).tokenize_str(&code, "p.c").unwrap().list;
        for t in list.iter() {
            if !matches!(list.text(t), "(" | "[" | "{") {
                continue;
            }
            let close = list.link(t);
            prop_assert!(close.is_some(), "unlinked '{}'", list.text(t));
            let close = close.unwrap();
            prop_assert!(matches!(list.text(close), ")" | "]" | "}"), "closing bracket expected after {}", list.text(t));
            prop_assert_eq!(list.link(close), Some(t));
        }
    }

    #[test]
    fn prop_variable_ids_resolve_to_one_declaration(code in program()) {
        let settings = Settings::default();
        let library = Library::standard().unwrap();
        let mut list = Tokenizer::new(&settings).tokenize_str(&code, "p.c").unwrap().list;
        let db = SymbolDatabase::build(&mut list, &settings, &library);

        let mut seen = HashMap::new();
        for t in list.iter() {
            let var_id = list[t].var_id;
            if var_id == 0 {
                continue;
            }
            let var = db.variable_of(&list, t);
            prop_assert!(var.is_some(), "var id {} without declaration", var_id);
            let var = var.unwrap();
            prop_assert_eq!(var.decl_id, var_id);
            let first = seen
                .entry(var_id)
                .or_insert_with(|| (var.scope, var.type_name.clone(), var.id))
                .clone();
            prop_assert_eq!(first, (var.scope, var.type_name.clone(), var.id));
        }
    }
}

// ============================================================================
// Value flow
// ============================================================================

proptest! {
    #[test]
    fn prop_value_flow_grows_and_terminates(code in program(), max_iterations in 1usize..6) {
        let limits = AnalysisLimits {
            max_value_flow_iterations: Some(max_iterations),
            ..AnalysisLimits::default()
        };
        let settings = Settings::default().limits(limits);
        let library = Library::standard().unwrap();
        let mut list = Tokenizer::new(&settings).tokenize_str(&code, "p.c").unwrap().list;
        let db = SymbolDatabase::build(&mut list, &settings, &library);
        let report = ValueFlowEngine::new().run(&mut list, &db, &settings, &library);

        prop_assert!(report.iterations <= max_iterations);
        prop_assert!(report.values_per_iteration.windows(2).all(|w| w[0] <= w[1]));
        let attached: usize = list.iter().map(|t| list[t].values.len()).sum();
        prop_assert!(attached > 0 || report.total_values() == 0);
    }
}

// ============================================================================
// Whole pipeline
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_no_duplicate_diagnostics(code in program()) {
        let (outcome, logger) = analyze("p.c", &code);
        prop_assert!(outcome.aborted.is_empty());
        assert_no_duplicates(&logger.errors);
    }
}
