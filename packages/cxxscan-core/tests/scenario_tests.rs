//! End-to-end scenarios through the whole pipeline
//!
//! Each test feeds source text to the Analyzer and checks what reaches the
//! sink, plus the intermediate annotations where the scenario names them.

mod common;

use common::*;
use cxxscan_core::features::tokenizer::TokenList;
use cxxscan_core::{Severity, Settings};
use pretty_assertions::assert_eq;

fn find(list: &TokenList, text: &str, next: &str) -> cxxscan_core::shared::models::TokenId {
    list.iter()
        .find(|&t| list.text(t) == text && list.str_at(t, 1) == next)
        .unwrap_or_else(|| panic!("no '{} {}' in token list", text, next))
}

// ═══════════════════════════════════════════════════════════════════════════
// Uninitialized variable
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn uninitialized_variable_reported_once_at_its_use() {
    let (list, db, _) = annotate("void f(){ int a; a++; }");
    let use_tok = find(&list, "a", "++");
    let var_id = list[use_tok].var_id;
    assert_ne!(var_id, 0);
    let var = db.variable_of_var_id(var_id).expect("declared variable");
    assert!(var.is_local());
    assert!(list[use_tok].values.iter().any(|v| v.is_uninit()));

    let (_, logger) = analyze("test.c", "void f(){ int a; a++; }");
    assert_eq!(logger.ids(), vec!["uninitvar"]);
    let msg = &logger.errors[0];
    assert_eq!(msg.severity, Severity::Error);
    assert_eq!(msg.location().map(|l| l.line), Some(1));
    assert_eq!(msg.symbol_names, vec!["a".to_string()]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Constant folding
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn constant_folding_keeps_live_branch_quiet() {
    let code = "void g();\nvoid f() {\n    int x = 2+3;\n    if (x==5) g();\n}\n";
    let (list, _, _) = annotate(code);
    let x = find(&list, "x", "==");
    assert!(list[x].values.iter().any(|v| v.is_known() && v.int_value() == Some(5)));

    let (_, logger) = analyze("test.c", code);
    assert_eq!(count_id(&logger, "knownConditionTrueFalse"), 0);
    assert!(logger.errors.is_empty(), "unexpected: {:?}", logger.ids());
}

#[test]
fn constant_folding_flags_dead_branch() {
    let code = "void g();\nvoid f() {\n    int x = 2+3;\n    if (x==4) g();\n}\n";
    let (_, logger) = analyze("test.c", code);
    let msgs = logger.with_id("knownConditionTrueFalse");
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].short_message, "Condition 'x==4' is always false");
}

// ═══════════════════════════════════════════════════════════════════════════
// Configuration limit
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn configuration_limit_checks_only_max_configs() {
    let code = independent_ifdefs(20);
    let settings = Settings::default().max_configs(12);
    let (outcome, logger) = analyze_with(settings, "cfg.c", &code);

    assert_eq!(outcome.configurations, 21);
    assert_eq!(outcome.checked.len(), 12);
    assert_eq!(outcome.skipped(), 9);
    assert_eq!(outcome.checked[0], "");

    let notices = logger.with_id("toomanyconfigs");
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Information);
    assert_eq!(
        notices[0].short_message,
        "Too many #ifdef configurations - only 12 of 21 configurations are checked. \
         Use force to check all configurations."
    );
    assert!(logger.errors.iter().all(|m| m.severity != Severity::Error));
}

#[test]
fn forced_run_checks_every_configuration() {
    let code = independent_ifdefs(20);
    let settings = Settings::default().max_configs(12).force(true);
    let (outcome, logger) = analyze_with(settings, "cfg.c", &code);
    assert_eq!(outcome.checked.len(), 21);
    assert_eq!(count_id(&logger, "toomanyconfigs"), 0);
}

#[test]
fn configuration_notice_follows_enabled_severities() {
    let code = independent_ifdefs(3);
    let settings = Settings::default().max_configs(2).severities(&[Severity::Error]);
    let (outcome, logger) = analyze_with(settings, "cfg.c", &code);
    assert_eq!(outcome.checked.len(), 2);
    assert_eq!(count_id(&logger, "toomanyconfigs"), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Container size
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn indexing_empty_vector_is_out_of_bounds() {
    let code = "void f() {\n    std::vector<int> v;\n    v[0] = 1;\n}\n";
    let (list, _, _) = annotate(code);
    let v = find(&list, "v", "[");
    assert!(list[v].values.iter().any(|val| val.is_known() && val.container_size_value() == Some(0)));

    let (_, logger) = analyze("test.cpp", code);
    assert_eq!(logger.ids(), vec!["containerOutOfBounds"]);
    let msg = &logger.errors[0];
    assert_eq!(msg.severity, Severity::Error);
    assert_eq!(msg.location().map(|l| l.line), Some(3));
    assert_eq!(msg.short_message, "Out of bounds access in expression 'v[0]' because 'v' is empty.");
}

#[test]
fn map_subscript_inserts_without_diagnostics() {
    let code = "void f() {\n    std::map<int, int> m;\n    m[1] = 2;\n}\n";
    let (_, logger) = analyze("test.cpp", code);
    assert!(logger.errors.is_empty(), "unexpected: {:?}", logger.ids());
}

// ═══════════════════════════════════════════════════════════════════════════
// Allocation / deallocation mismatch
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn mismatched_allocation_cites_both_sites_in_order() {
    let code = "void f(int n) {\n    int *p = malloc(n);\n    delete p;\n}\n";
    let (_, logger) = analyze("test.cpp", code);
    let msgs = logger.with_id("mismatchAllocDealloc");
    assert_eq!(msgs.len(), 1, "got {:?}", logger.ids());
    let lines: Vec<u32> = msgs[0].call_stack.iter().map(|l| l.line).collect();
    assert_eq!(lines, vec![2, 3]);
    assert_eq!(count_id(&logger, "memleak"), 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Best effort
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn several_defects_in_one_file() {
    let (outcome, logger) = analyze("test.c", TWO_DEFECTS);
    assert_eq!(outcome.diagnostics, logger.errors.len());
    assert_eq!(count_id(&logger, "uninitvar"), 1);
    assert_eq!(count_id(&logger, "zerodiv"), 1);
    assert_no_duplicates(&logger.errors);
}

#[test]
fn unknown_functions_do_not_abort() {
    let code = "void f() { int r = mystery(1, 2); if (r) { helper(r); } }\n";
    let (outcome, logger) = analyze("test.c", code);
    assert!(outcome.aborted.is_empty());
    assert!(logger.errors.is_empty(), "unexpected: {:?}", logger.ids());
}

#[test]
fn syntax_error_is_a_diagnostic() {
    let (outcome, logger) = analyze("broken.c", "void f() { int a[3; }\n");
    assert_eq!(outcome.aborted, vec![String::new()]);
    assert_eq!(logger.ids(), vec!["syntaxError"]);
    assert_eq!(logger.errors[0].severity, Severity::Error);
}
