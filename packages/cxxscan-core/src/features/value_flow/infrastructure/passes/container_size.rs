//! Container sizes
//!
//! Local standard containers get a size from their declaration
//! (`std::vector<int> v;` is empty, `v{1, 2}` holds two) or from a
//! whole-container assignment. The forward walker tracks push/pop/clear;
//! this pass also turns `v.size()` and `v.empty()` into integer values.

use super::value_text;
use crate::features::library::{ContainerInfo, ContainerYield};
use crate::features::symbol_db::{callee_name, Variable};
use crate::features::tokenizer::domain::string_literal_value;
use crate::features::tokenizer::{TokenKind, TokenList};
use crate::features::value_flow::domain::{Value, ValueData};
use crate::features::value_flow::infrastructure::access::{function_end, statement_semicolon};
use crate::features::value_flow::infrastructure::forward::forward;
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

pub struct ContainerSizePass;

struct Seed {
    var_id: u32,
    at: TokenId,
    size: i64,
    start: TokenId,
    end: TokenId,
}

fn container_info<'l>(ctx: &PassContext<'l>, var: &Variable) -> Option<&'l ContainerInfo> {
    let library = ctx.library;
    let vt = var.value_type.as_ref().filter(|vt| vt.is_container())?;
    library.container(&vt.type_name)
}

/// Elements in the initializer list at `open`
fn brace_count(list: &TokenList, open: TokenId) -> Option<i64> {
    let close = list.link(open)?;
    let first = list.next(open)?;
    if first == close {
        return Some(0);
    }
    let mut count = 1;
    let mut cur = Some(first);
    while let Some(t) = cur.filter(|&t| t != close) {
        match list.text(t) {
            "," => count += 1,
            "(" | "[" | "{" => {
                cur = list.link(t).and_then(|l| list.next(l));
                continue;
            }
            _ => {}
        }
        cur = list.next(t);
    }
    Some(count)
}

/// Size of the container built from the expression starting at `t`
fn initial_size(list: &TokenList, info: &ContainerInfo, t: TokenId) -> Option<i64> {
    let tok = &list[t];
    match tok.text.as_str() {
        "{" => brace_count(list, t),
        _ if tok.kind == TokenKind::String && info.string_like => {
            string_literal_value(&tok.text).map(|s| s.chars().count() as i64)
        }
        _ => None,
    }
}

impl ContainerSizePass {
    /// Declarations: `v;`, `v{..}`, `v = {..}`, `v(n)`
    fn declarations(ctx: &PassContext<'_>) -> Vec<Seed> {
        let list = &*ctx.list;
        let mut out = Vec::new();
        for var in ctx.db.variables.iter().filter(|v| v.is_local() && !v.is_static() && !v.is_reference()) {
            let Some(info) = container_info(ctx, var) else { continue };
            let Some(name) = var.name_token else { continue };
            let Some(after) = list.next(name) else { continue };
            let (size, semi) = match list.text(after) {
                // `s ; s = "abc" ;` is left to the assignment form
                ";" if var.has_initializer() => continue,
                ";" => (Some(0), Some(after)),
                "{" => (brace_count(list, after), list.link(after).and_then(|c| list.next(c))),
                "=" => {
                    let Some(rhs) = list.next(after) else { continue };
                    let end = if list.text(rhs) == "{" { list.link(rhs) } else { Some(rhs) };
                    (initial_size(list, info, rhs), end.and_then(|e| list.next(e)))
                }
                "(" => {
                    let Some(close) = list.link(after) else { continue };
                    let arg = list.next(after).filter(|&a| a != close);
                    let size = match arg {
                        None => Some(0),
                        Some(a) if list.next(a) == Some(close) => list[a].known_int(),
                        Some(_) => None,
                    };
                    (size, list.next(close))
                }
                _ => continue,
            };
            let (Some(size), Some(semi)) = (size, semi.filter(|&s| list.text(s) == ";")) else {
                continue;
            };
            let (Some(start), Some(end)) = (list.next(semi), function_end(list, ctx.db, name)) else {
                continue;
            };
            out.push(Seed {
                var_id: var.decl_id,
                at: name,
                size,
                start,
                end,
            });
        }
        out
    }

    /// Statements `v = {..};` and `s = "...";`
    fn assignments(ctx: &PassContext<'_>) -> Vec<Seed> {
        let list = &*ctx.list;
        let mut out = Vec::new();
        for eq in list.iter() {
            if list.text(eq) != "=" || list[eq].ast_parent.is_some() {
                continue;
            }
            let Some(lhs) = list[eq].ast_op1 else { continue };
            let Some(var) = ctx.db.variable_of(list, lhs).filter(|v| v.is_local() && !v.is_reference()) else {
                continue;
            };
            let Some(info) = container_info(ctx, var) else { continue };
            let Some(size) = list.next(eq).and_then(|rhs| initial_size(list, info, rhs)) else {
                continue;
            };
            let Some(semi) = statement_semicolon(list, eq).or_else(|| {
                let rhs = list.next(eq)?;
                list.next(list.link(rhs)?).filter(|&s| list.text(s) == ";")
            }) else {
                continue;
            };
            let (Some(start), Some(end)) = (list.next(semi), function_end(list, ctx.db, eq)) else {
                continue;
            };
            out.push(Seed {
                var_id: var.decl_id,
                at: eq,
                size,
                start,
                end,
            });
        }
        out
    }

    /// `v.size()` / `v.empty()` calls with a tracked size
    fn yields(ctx: &PassContext<'_>) -> Vec<(TokenId, Value)> {
        let list = &*ctx.list;
        let mut out = Vec::new();
        for call in list.iter() {
            let Some(member) = callee_name(list, call) else { continue };
            let Some(dot) = list[call].ast_op1.filter(|&d| list.text(d) == ".") else {
                continue;
            };
            let Some(obj) = list[dot].ast_op1 else { continue };
            let Some(info) = ctx.db.variable_of(list, obj).and_then(|v| container_info(ctx, v)) else {
                continue;
            };
            let yielded = info.yield_of(list.text(member));
            for v in list[obj].values.iter() {
                let Some(n) = v.container_size_value() else { continue };
                let mut result = v.clone();
                result.data = match yielded {
                    Some(ContainerYield::Size) => ValueData::Int(n),
                    Some(ContainerYield::Empty) => ValueData::Int(i64::from(n == 0)),
                    _ => continue,
                };
                let info = format!("Calling '{}' returns {}", list.text(member), value_text(&result));
                out.push((call, result.with_step(call, info)));
            }
        }
        out
    }
}

impl ValueFlowPass for ContainerSizePass {
    fn name(&self) -> &'static str {
        "container-size"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let mut seeds = Self::declarations(ctx);
        seeds.extend(Self::assignments(ctx));

        let mut added = 0;
        for seed in seeds {
            let value = Value::container_size(seed.size).with_step(seed.at, format!("Container size is {}", seed.size));
            added += forward(ctx, seed.start, seed.end, seed.var_id, vec![value]);
        }
        for (call, value) in Self::yields(ctx) {
            added += usize::from(ctx.add_value(call, value));
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, ints, run, values};
    use super::super::LiteralPass;
    use super::*;

    fn sizes(a: &super::super::testing::Analyzed, name: &str, n: usize) -> Vec<i64> {
        values(a, name, n).iter().filter_map(|v| v.container_size_value()).collect()
    }

    #[test]
    fn test_empty_declaration_and_push() {
        let mut a = analyze("void f() { std::vector<int> v; v.push_back(1); g(v.size()); }");
        run(&mut a, &[&LiteralPass, &ContainerSizePass], 2);
        assert_eq!(sizes(&a, "v", 1), vec![0]);
        assert_eq!(sizes(&a, "v", 2), vec![1]);
    }

    #[test]
    fn test_initializer_list_size() {
        let mut a = analyze("void f() { std::vector<int> v{1, 2, 3}; g(v[0]); }");
        run(&mut a, &[&LiteralPass, &ContainerSizePass], 1);
        assert_eq!(sizes(&a, "v", 1), vec![3]);
    }

    #[test]
    fn test_size_call_yields_integer() {
        let mut a = analyze("void f() { std::vector<int> v; int n = v.size(); }");
        run(&mut a, &[&LiteralPass, &ContainerSizePass], 2);
        let call = values(&a, "(", 1);
        assert_eq!(call.iter().filter_map(|v| v.int_value()).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_non_container_is_ignored() {
        let mut a = analyze("void f() { int v; v = 3; g(v); }");
        run(&mut a, &[&LiteralPass, &ContainerSizePass], 1);
        assert!(ints(&a, "v", 2).is_empty());
        assert!(sizes(&a, "v", 2).is_empty());
    }
}
