//! Conditions with a known outcome

use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::tokenizer::TokenList;
use crate::features::value_flow::infrastructure::is_do_while_tail;
use crate::shared::models::{Severity, TokenId};

pub struct ConditionCheck;

fn always_false_message(condition: &str) -> String {
    format!("Condition '{}' is always false", condition)
}

/// Conditions the author wrote as constants on purpose
fn is_deliberate(list: &TokenList, condition: TokenId) -> bool {
    if list[condition].is_literal() {
        return true;
    }
    let (first, last) = list.expression_range(condition);
    list.range(Some(first), list.next(last))
        .any(|t| list[t].is_expanded_macro() || list.text(t) == "sizeof")
}

impl Check for ConditionCheck {
    fn name(&self) -> &'static str {
        "Condition"
    }

    fn class_info(&self) -> &'static str {
        "Match conditions with assignments and other conditions\n\
         - conditions that are always false"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        let keywords = list
            .iter()
            .filter(|&t| matches!(list.text(t), "if" | "while") && list.str_at(t, 1) == "(")
            .filter(|&t| !is_do_while_tail(list, ctx.db, t));
        for keyword in keywords {
            let Some(condition) = list.next(keyword).and_then(|open| list[open].ast_op2) else {
                continue;
            };
            if is_deliberate(list, condition) {
                continue;
            }
            let Some(value) = list[condition]
                .values
                .iter()
                .find(|v| v.is_known() && v.int_value() == Some(0))
            else {
                continue;
            };
            let text = list.expression_string(condition);
            reporter.report(
                Diagnostic::new("knownConditionTrueFalse", Severity::Style, always_false_message(&text))
                    .with_value(value)
                    .at(condition)
                    .cwe(cwe::ALWAYS_FALSE),
            );
        }
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        reporter.report(
            Diagnostic::new("knownConditionTrueFalse", Severity::Style, always_false_message("x"))
                .cwe(cwe::ALWAYS_FALSE),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::checks::infrastructure::testing::{check_code, messages};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_always_false() {
        let logger = check_code(&ConditionCheck, "void f() { int x = 3; if (x == 4) { g(); } }");
        assert_eq!(messages(&logger, "knownConditionTrueFalse"), vec!["Condition 'x==4' is always false"]);
        let msg = &logger.errors[0];
        assert_eq!(msg.severity, Severity::Style);
        assert_eq!(msg.cwe, Some(570));
    }

    #[test]
    fn test_always_true_is_silent() {
        let logger = check_code(&ConditionCheck, "void f() { int x = 3; if (x == 3) { g(); } }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_literal_and_do_while_are_skipped() {
        let logger = check_code(&ConditionCheck, "void f() { while (0) { g(); } do { g(); } while (0); }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_unknown_condition_is_silent() {
        let logger = check_code(&ConditionCheck, "void f(int x) { if (x == 4) { g(); } }");
        assert!(logger.errors.is_empty());
    }
}
