//! Other checks: integer division by zero

use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::tokenizer::TokenList;
use crate::shared::models::{Severity, TokenId};

pub struct OtherCheck;

const ZERODIV: &str = "Division by zero.";

fn zerodiv_cond_message(condition: &str, line: u32) -> String {
    format!(
        "Either the condition '{}' is redundant or there is division by zero at line {}.",
        condition, line
    )
}

fn is_float_operand(list: &TokenList, tok: Option<TokenId>) -> bool {
    tok.and_then(|t| list[t].value_type.as_ref())
        .is_some_and(|vt| vt.is_float() && vt.pointer == 0)
}

/// Integral `/`, `%`, `/=`, `%=` and their divisor
fn divisor(list: &TokenList, tok: TokenId) -> Option<TokenId> {
    let t = &list[tok];
    if !matches!(t.text.as_str(), "/" | "%" | "/=" | "%=") {
        return None;
    }
    let (lhs, rhs) = (t.ast_op1, t.ast_op2?);
    if is_float_operand(list, lhs) || is_float_operand(list, Some(rhs)) {
        return None;
    }
    Some(rhs)
}

impl Check for OtherCheck {
    fn name(&self) -> &'static str {
        "Other"
    }

    fn class_info(&self) -> &'static str {
        "Other checks\n\
         - division with zero"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for op in list.iter() {
            let Some(rhs) = divisor(list, op) else { continue };
            let zeros = list[rhs].values.iter().filter(|v| v.int_value() == Some(0) && v.indirect == 0);
            let hit = zeros
                .clone()
                .find(|v| v.is_known() || (v.is_possible() && v.condition.is_none()))
                .or_else(|| zeros.clone().find(|v| v.is_possible()));
            let Some(value) = hit else { continue };

            let diagnostic = match value.condition.filter(|_| !value.is_known()) {
                Some(cond) => Diagnostic::new(
                    "zerodivcond",
                    Severity::Warning,
                    zerodiv_cond_message(&list.expression_string(cond), list[op].line),
                ),
                None => Diagnostic::new("zerodiv", Severity::Error, ZERODIV),
            };
            reporter.report(diagnostic.with_value(value).at(op).cwe(cwe::DIV_ZERO));
        }
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        reporter.report(Diagnostic::new("zerodiv", Severity::Error, ZERODIV).cwe(cwe::DIV_ZERO));
        reporter.report(
            Diagnostic::new("zerodivcond", Severity::Warning, zerodiv_cond_message("x==0", 1)).cwe(cwe::DIV_ZERO),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::checks::infrastructure::testing::{check_code, messages};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_zero_divisor() {
        let logger = check_code(&OtherCheck, "int f(int a) { int b = 0; return a / b; }");
        assert_eq!(messages(&logger, "zerodiv"), vec!["Division by zero."]);
        assert_eq!(logger.errors[0].cwe, Some(369));
    }

    #[test]
    fn test_compound_and_modulo() {
        let logger = check_code(&OtherCheck, "void f(int a) { a %= 0; a = a % 0; }");
        assert_eq!(logger.with_id("zerodiv").len(), 2);
    }

    #[test]
    fn test_floating_point_division_is_allowed() {
        let logger = check_code(&OtherCheck, "double f(double a) { return a / 0.0; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_redundant_condition() {
        let logger = check_code(&OtherCheck, "int f(int a, int b) {\n int r = a / b;\n if (b == 0) { return 0; }\n return r; }");
        assert_eq!(
            messages(&logger, "zerodivcond"),
            vec!["Either the condition 'b==0' is redundant or there is division by zero at line 2."]
        );
        assert_eq!(logger.errors[0].severity, Severity::Warning);
    }
}
