//! Pointers to local storage outliving it

use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::value_flow::domain::{LifetimeScope, Value, ValueData};
use crate::shared::models::Severity;

pub struct AutoVariables;

const AUTO_VARIABLES: &str = "Address of local auto-variable assigned to a function parameter.";

fn dangling_message(name: &str) -> String {
    format!(
        "$symbol:{}\nReturning pointer to local variable '$symbol' that will be invalid when returning.",
        name
    )
}

/// Variable whose storage ends with the function
fn local_lifetime(value: &Value) -> Option<u32> {
    match value.data {
        ValueData::Lifetime {
            var_id,
            scope: LifetimeScope::Local | LifetimeScope::Argument,
            ..
        } if !value.is_impossible() => Some(var_id),
        _ => None,
    }
}

impl AutoVariables {
    fn returns(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for ret in list.iter().filter(|&t| list.text(t) == "return") {
            let Some(expr) = list[ret].ast_op1 else { continue };
            let Some((value, var_id)) = list[expr]
                .values
                .iter()
                .find_map(|v| local_lifetime(v).map(|id| (v, id)))
            else {
                continue;
            };
            let Some(var) = ctx.db.variable_of_var_id(var_id) else { continue };
            // lambdas and nested functions return into their own frame
            let returned_from = list[ret].scope.and_then(|s| ctx.db.enclosing_function_scope(s));
            if returned_from != ctx.db.enclosing_function_scope(var.scope) {
                continue;
            }
            reporter.report(
                Diagnostic::new("returnDanglingLifetime", Severity::Error, dangling_message(&var.name))
                    .with_value(value)
                    .at(ret)
                    .cwe(cwe::DANGLING),
            );
        }
    }

    /// `*param = &local`
    fn parameter_assignments(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for eq in list.iter().filter(|&t| list.text(t) == "=") {
            let (Some(lhs), Some(rhs)) = (list[eq].ast_op1, list[eq].ast_op2) else {
                continue;
            };
            if !list.is_unary_op(lhs, "*") {
                continue;
            }
            let param = list[lhs]
                .ast_op1
                .and_then(|p| ctx.db.variable_of(ctx.list, p))
                .is_some_and(|v| v.is_argument() && v.is_pointer());
            if !param {
                continue;
            }
            let local = list[rhs].values.iter().any(|v| {
                matches!(
                    v.data,
                    ValueData::Lifetime {
                        scope: LifetimeScope::Local,
                        ..
                    }
                ) && !v.is_impossible()
            });
            if local {
                reporter.report(
                    Diagnostic::new("autoVariables", Severity::Error, AUTO_VARIABLES)
                        .at(eq)
                        .cwe(cwe::DANGLING),
                );
            }
        }
    }
}

impl Check for AutoVariables {
    fn name(&self) -> &'static str {
        "AutoVariables"
    }

    fn class_info(&self) -> &'static str {
        "Auto variables\n\
         - returning a pointer to a local variable\n\
         - assigning the address of a local variable through a parameter"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        self.returns(ctx, reporter);
        self.parameter_assignments(ctx, reporter);
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        reporter.report(
            Diagnostic::new("returnDanglingLifetime", Severity::Error, dangling_message("x")).cwe(cwe::DANGLING),
        );
        reporter.report(Diagnostic::new("autoVariables", Severity::Error, AUTO_VARIABLES).cwe(cwe::DANGLING));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::checks::infrastructure::testing::{check_code, messages};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_return_address_of_local() {
        let logger = check_code(&AutoVariables, "int *f() { int x = 0; return &x; }");
        assert_eq!(
            messages(&logger, "returnDanglingLifetime"),
            vec!["Returning pointer to local variable 'x' that will be invalid when returning."]
        );
        let msg = &logger.errors[0];
        assert_eq!(msg.cwe, Some(562));
        assert_eq!(msg.call_stack.len(), 2);
    }

    #[test]
    fn test_return_local_array() {
        let logger = check_code(&AutoVariables, "char *f() { char buf[8]; return buf; }");
        assert_eq!(logger.with_id("returnDanglingLifetime").len(), 1);
    }

    #[test]
    fn test_static_local_is_fine() {
        let logger = check_code(&AutoVariables, "int *f() { static int x; return &x; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_assign_through_parameter() {
        let logger = check_code(&AutoVariables, "void f(int **p) { int x; *p = &x; }");
        assert_eq!(
            messages(&logger, "autoVariables"),
            vec!["Address of local auto-variable assigned to a function parameter."]
        );
    }
}
