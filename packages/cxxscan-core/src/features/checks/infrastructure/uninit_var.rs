//! Uninitialized variables

use crate::config::Settings;
use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::ctu::{find_unsafe_calls, first_parameter_uses, summarize_calls, CtuValue, FileSummary, UnsafeUsage};
use crate::features::value_flow::infrastructure::{classify_access, Access};
use crate::shared::models::Severity;
use rustc_hash::FxHashSet;

pub struct UninitVar;

fn uninit_message(name: &str) -> String {
    format!("$symbol:{}\nUninitialized variable: $symbol", name)
}

fn ctu_message(param: &str, arg_expr: &str) -> String {
    let object = arg_expr.trim_start_matches('&');
    format!(
        "$symbol:{}\nUsing argument {} that points at uninitialized variable {}",
        param, param, object
    )
}

impl Check for UninitVar {
    fn name(&self) -> &'static str {
        "UninitVar"
    }

    fn class_info(&self) -> &'static str {
        "Uninitialized variables\n\
         - using uninitialized local variables\n\
         - passing the address of an uninitialized variable to a function that reads through it"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        let mut reported: FxHashSet<u32> = FxHashSet::default();
        for t in list.iter() {
            let var_id = list[t].var_id;
            if var_id == 0 || reported.contains(&var_id) {
                continue;
            }
            let Some(var) = ctx.db.variable_of(list, t) else { continue };
            if var.name_token == Some(t) || classify_access(list, t) == Access::Unevaluated {
                continue;
            }
            let Some(value) = list[t]
                .values
                .iter()
                .filter(|v| v.is_uninit() && v.indirect == 0)
                .find(|v| v.is_known() || (!v.is_impossible() && ctx.settings.inconclusive))
            else {
                continue;
            };
            reported.insert(var_id);
            reporter.report(
                Diagnostic::new("uninitvar", Severity::Error, uninit_message(&var.name))
                    .with_value(value)
                    .inconclusive(!value.is_known())
                    .at(t)
                    .cwe(cwe::UNINIT),
            );
        }
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        reporter.report(Diagnostic::new("uninitvar", Severity::Error, uninit_message("varname")).cwe(cwe::UNINIT));
        reporter.report(Diagnostic::new("ctuuninitvar", Severity::Error, ctu_message("p", "&x")).cwe(cwe::UNINIT));
    }

    fn get_file_info(&self, ctx: &CheckContext<'_>) -> Option<FileSummary> {
        let mut summary = FileSummary::new(ctx.file0);
        let (calls, nested) = summarize_calls(ctx.list, ctx.db, ctx.library);
        summary.calls = calls.into_iter().filter(|c| c.value == CtuValue::Uninit).collect();
        summary.nested_calls = nested;
        summary.usages = first_parameter_uses(ctx.list, ctx.db)
            .into_iter()
            .filter(|u| !u.written)
            .map(|u| UnsafeUsage {
                function: u.function_key,
                arg_index: u.arg_index,
                value: CtuValue::Uninit,
                location: ctx
                    .list
                    .location(u.token)
                    .with_info(format!("Dereferencing argument {} that is uninitialized", u.param)),
                param: u.param,
            })
            .collect();
        (!summary.is_empty()).then_some(summary)
    }

    fn analyse_whole_program(&self, summaries: &[FileSummary], settings: &Settings, reporter: &mut Reporter<'_>) -> bool {
        let findings = find_unsafe_calls(summaries, CtuValue::Uninit, settings.ctu.max_ctu_depth);
        for finding in &findings {
            let diagnostic = Diagnostic::new(
                "ctuuninitvar",
                Severity::Error,
                ctu_message(&finding.usage.param, &finding.call.arg_expr),
            )
            .cwe(cwe::UNINIT);
            reporter.report_at(diagnostic, finding.call_stack.clone());
        }
        !findings.is_empty()
    }
}
