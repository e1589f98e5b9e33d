//! Standard container misuse: out of bounds element access

use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::library::{ContainerInfo, ContainerYield};
use crate::features::symbol_db::call_arguments;
use crate::features::value_flow::domain::Value;
use crate::shared::models::{Severity, TokenId};

pub struct StlCheck;

fn bounds_message(expr: &str, container: &str, size: i64) -> String {
    let state = if size == 0 {
        format!("'{}' is empty", container)
    } else {
        format!("'{}' has {} elements", container, size)
    };
    format!(
        "$symbol:{}\nOut of bounds access in expression '{}' because {}.",
        container, expr, state
    )
}

/// The element access at `t` and the index it uses, if any
enum ElementAccess {
    /// `v[i]`, `v.at(i)`; carries the expression root and index token
    Indexed(TokenId, TokenId),
    /// `v.front()`, `v.back()`
    End(TokenId),
}

impl StlCheck {
    fn element_access(ctx: &CheckContext<'_>, info: &ContainerInfo, t: TokenId) -> Option<ElementAccess> {
        let list = ctx.list;
        let parent = list[t].ast_parent?;
        if list[parent].ast_op1 != Some(t) {
            return None;
        }
        match list.text(parent) {
            "[" if info.indexable => Some(ElementAccess::Indexed(parent, list[parent].ast_op2?)),
            "." if list[parent].original_name.is_none() => {
                let member = list[parent].ast_op2?;
                let call = list[parent].ast_parent.filter(|&c| list.text(c) == "(")?;
                match info.yield_of(list.text(member))? {
                    ContainerYield::At => {
                        let index = call_arguments(list, call).first().copied()?;
                        Some(ElementAccess::Indexed(call, index))
                    }
                    ContainerYield::Front | ContainerYield::Back => Some(ElementAccess::End(call)),
                    ContainerYield::Size | ContainerYield::Empty => None,
                }
            }
            _ => None,
        }
    }
}

impl Check for StlCheck {
    fn name(&self) -> &'static str {
        "Stl"
    }

    fn class_info(&self) -> &'static str {
        "Check for invalid usage of STL\n\
         - out of bounds element access of containers with known size"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for t in list.iter() {
            if list[t].var_id == 0 {
                continue;
            }
            let Some(var) = ctx.db.variable_of(list, t) else { continue };
            let Some(info) = var
                .value_type
                .as_ref()
                .filter(|vt| vt.is_container())
                .and_then(|vt| ctx.library.container(&vt.type_name))
            else {
                continue;
            };
            let Some((value, size)) = list[t]
                .values
                .iter()
                .find_map(|v| v.container_size_value().filter(|_| v.is_known()).map(|n| (v, n)))
            else {
                continue;
            };
            let Some(access) = Self::element_access(ctx, info, t) else { continue };

            let (root, out_of_bounds) = match access {
                ElementAccess::Indexed(root, index) => {
                    let bad = list[index].known_int().is_some_and(|i| i >= size);
                    (root, bad)
                }
                ElementAccess::End(root) => (root, size == 0),
            };
            if !out_of_bounds {
                continue;
            }
            let expr = list.expression_string(root);
            reporter.report(container_diagnostic(value, &expr, &var.name, size).at(root));
        }
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        reporter.report(
            Diagnostic::new("containerOutOfBounds", Severity::Error, bounds_message("v[0]", "v", 0))
                .cwe(cwe::CONTAINER_BOUNDS),
        );
    }
}

fn container_diagnostic(value: &Value, expr: &str, name: &str, size: i64) -> Diagnostic {
    Diagnostic::new("containerOutOfBounds", Severity::Error, bounds_message(expr, name, size))
        .with_value(value)
        .cwe(cwe::CONTAINER_BOUNDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::checks::infrastructure::testing::{check_code, messages};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_index_past_size() {
        let logger = check_code(&StlCheck, "void f() { std::vector<int> v{1, 2, 3}; v[3] = 0; v[2] = 0; }");
        assert_eq!(
            messages(&logger, "containerOutOfBounds"),
            vec!["Out of bounds access in expression 'v[3]' because 'v' has 3 elements."]
        );
    }

    #[test]
    fn test_front_of_empty() {
        let logger = check_code(&StlCheck, "int f() { std::vector<int> v; return v.front(); }");
        assert_eq!(
            messages(&logger, "containerOutOfBounds"),
            vec!["Out of bounds access in expression 'v.front()' because 'v' is empty."]
        );
    }

    #[test]
    fn test_push_back_grows() {
        let logger = check_code(&StlCheck, "void f() { std::vector<int> v; v.push_back(1); v[0] = 2; v.at(1) = 3; }");
        assert_eq!(
            messages(&logger, "containerOutOfBounds"),
            vec!["Out of bounds access in expression 'v.at(1)' because 'v' has 1 elements."]
        );
    }
}
