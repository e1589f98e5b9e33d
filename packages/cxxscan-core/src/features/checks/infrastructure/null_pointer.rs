//! Null pointer dereferences

use crate::config::Settings;
use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::ctu::{find_unsafe_calls, first_parameter_uses, summarize_calls, CtuValue, FileSummary, UnsafeUsage};
use crate::features::symbol_db::{call_arguments, callee_name};
use crate::features::tokenizer::TokenList;
use crate::features::value_flow::domain::Value;
use crate::features::value_flow::infrastructure::{classify_access, dereference_of, Access};
use crate::shared::models::{Severity, TokenId};

pub struct NullPointer;

fn null_message(name: &str) -> String {
    format!("$symbol:{}\nNull pointer dereference: $symbol", name)
}

fn possible_message(name: &str) -> String {
    format!("$symbol:{}\nPossible null pointer dereference: $symbol", name)
}

fn redundant_message(condition: &str, name: &str) -> String {
    format!(
        "$symbol:{}\nEither the condition '{}' is redundant or there is possible null pointer dereference: $symbol.",
        name, condition
    )
}

fn is_pointer_token(ctx: &CheckContext<'_>, tok: TokenId) -> bool {
    let from_var = ctx.db.variable_of(ctx.list, tok).is_some_and(|v| v.is_pointer() && !v.is_array());
    from_var || ctx.list[tok].value_type.as_ref().is_some_and(|vt| vt.is_pointer())
}

/// Inside `sizeof`, `decltype` or `typeid`
fn is_unevaluated(list: &TokenList, tok: TokenId) -> bool {
    classify_access(list, tok) == Access::Unevaluated
}

impl NullPointer {
    fn dereferences(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for t in list.iter() {
            if list[t].var_id == 0 || !is_pointer_token(ctx, t) || is_unevaluated(list, t) {
                continue;
            }
            if dereference_of(list, t).is_none() {
                continue;
            }
            let name = list.expression_string(t);
            let nulls = list[t].values.iter().filter(|v| v.is_null());
            let Some(value) = pick_null(nulls, ctx.settings) else { continue };
            reporter.report(null_diagnostic(list, value, &name).at(t));
        }
    }

    /// Null passed where the library requires a valid pointer
    fn library_arguments(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for call in list.iter() {
            let Some(name_tok) = callee_name(list, call) else { continue };
            // user functions with a body are covered by the dereferences inside them
            if ctx.db.function_of(list, name_tok).is_some_and(|f| f.has_body()) {
                continue;
            }
            let name = list.text(name_tok);
            for (index, arg) in call_arguments(list, call).into_iter().enumerate() {
                if !ctx.library.is_not_null_arg(name, index + 1) {
                    continue;
                }
                let Some(value) = list[arg].values.iter().find(|v| v.is_known() && v.is_null()) else {
                    continue;
                };
                let expr = list.expression_string(arg);
                reporter.report(
                    Diagnostic::new("nullPointer", Severity::Error, null_message(&expr))
                        .with_value(value)
                        .at(arg)
                        .cwe(cwe::NULL_POINTER),
                );
            }
        }
    }
}

/// Known null first, then possible nulls
fn pick_null<'v>(values: impl Iterator<Item = &'v Value> + Clone, settings: &Settings) -> Option<&'v Value> {
    values
        .clone()
        .find(|v| v.is_known())
        .or_else(|| values.clone().find(|v| v.is_possible()))
        .or_else(|| values.clone().find(|v| v.is_inconclusive() && settings.inconclusive))
}

fn null_diagnostic(list: &TokenList, value: &Value, name: &str) -> Diagnostic {
    if value.is_known() {
        return Diagnostic::new("nullPointer", Severity::Error, null_message(name))
            .with_value(value)
            .cwe(cwe::NULL_POINTER);
    }
    let diagnostic = match value.condition {
        Some(cond) => Diagnostic::new(
            "nullPointerRedundantCheck",
            Severity::Warning,
            redundant_message(&list.expression_string(cond), name),
        ),
        None => Diagnostic::new("nullPointer", Severity::Warning, possible_message(name)),
    };
    diagnostic.with_value(value).cwe(cwe::NULL_POINTER)
}

impl Check for NullPointer {
    fn name(&self) -> &'static str {
        "NullPointer"
    }

    fn class_info(&self) -> &'static str {
        "Null pointers\n\
         - null pointer dereferencing\n\
         - undefined null pointer arithmetic"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        self.dereferences(ctx, reporter);
        self.library_arguments(ctx, reporter);
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        let cwe = cwe::NULL_POINTER;
        reporter.report(Diagnostic::new("nullPointer", Severity::Error, null_message("pointer")).cwe(cwe));
        reporter.report(
            Diagnostic::new(
                "nullPointerRedundantCheck",
                Severity::Warning,
                redundant_message("p==0", "pointer"),
            )
            .cwe(cwe),
        );
        reporter.report(Diagnostic::new("ctunullpointer", Severity::Error, null_message("pointer")).cwe(cwe));
    }

    fn get_file_info(&self, ctx: &CheckContext<'_>) -> Option<FileSummary> {
        let mut summary = FileSummary::new(ctx.file0);
        let (calls, nested) = summarize_calls(ctx.list, ctx.db, ctx.library);
        summary.calls = calls.into_iter().filter(|c| c.value == CtuValue::Null).collect();
        summary.nested_calls = nested;
        summary.usages = first_parameter_uses(ctx.list, ctx.db)
            .into_iter()
            .map(|u| UnsafeUsage {
                function: u.function_key,
                arg_index: u.arg_index,
                value: CtuValue::Null,
                location: ctx
                    .list
                    .location(u.token)
                    .with_info(format!("Dereferencing argument {} that is null", u.param)),
                param: u.param,
            })
            .collect();
        (!summary.is_empty()).then_some(summary)
    }

    fn analyse_whole_program(&self, summaries: &[FileSummary], settings: &Settings, reporter: &mut Reporter<'_>) -> bool {
        let findings = find_unsafe_calls(summaries, CtuValue::Null, settings.ctu.max_ctu_depth);
        for finding in &findings {
            let diagnostic = Diagnostic::new("ctunullpointer", Severity::Error, null_message(&finding.usage.param))
                .cwe(cwe::NULL_POINTER);
            reporter.report_at(diagnostic, finding.call_stack.clone());
        }
        !findings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::checks::infrastructure::testing::{check_code, check_program, messages};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_null() {
        let logger = check_code(&NullPointer, "void f() { int *p = 0; *p = 1; }");
        assert_eq!(messages(&logger, "nullPointer"), vec!["Null pointer dereference: p"]);
        let msg = &logger.errors[0];
        assert_eq!(msg.severity, Severity::Error);
        assert_eq!(msg.cwe, Some(476));
        // error path: assignment, then the dereference
        assert!(msg.call_stack.len() >= 2);
    }

    #[test]
    fn test_redundant_check() {
        let logger = check_code(&NullPointer, "void f(int *p) { *p = 0; if (!p) { return; } }");
        assert_eq!(
            messages(&logger, "nullPointerRedundantCheck"),
            vec!["Either the condition '!p' is redundant or there is possible null pointer dereference: p."]
        );
        assert_eq!(logger.errors[0].severity, Severity::Warning);
    }

    #[test]
    fn test_checked_pointer_is_safe() {
        let logger = check_code(&NullPointer, "void f(int *p) { if (p == 0) { return; } *p = 1; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_sizeof_is_not_a_dereference() {
        let logger = check_code(&NullPointer, "int f() { int *p = 0; return sizeof(*p); }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_library_not_null_argument() {
        let logger = check_code(&NullPointer, "int f() { return strlen(0); }");
        assert_eq!(messages(&logger, "nullPointer"), vec!["Null pointer dereference: 0"]);
    }

    #[test]
    fn test_ctu_null_argument() {
        let logger = check_program(
            &NullPointer,
            &[
                ("a.c", "void use(int *p); void f() { use(0); }"),
                ("b.c", "void use(int *p) { *p = 3; }"),
            ],
        );
        assert_eq!(messages(&logger, "ctunullpointer"), vec!["Null pointer dereference: p"]);
    }
}
