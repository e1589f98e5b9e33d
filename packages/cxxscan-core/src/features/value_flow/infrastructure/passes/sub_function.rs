//! Argument values into called functions
//!
//! A value an argument has at a call site is a possible value of the
//! parameter inside the callee's body.

use super::value_text;
use crate::features::symbol_db::{call_arguments, callee_name};
use crate::features::value_flow::domain::{Value, ValueData};
use crate::features::value_flow::infrastructure::access::ordinal;
use crate::features::value_flow::infrastructure::forward::forward;
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::{FunctionId, TokenId};
use rustc_hash::FxHashMap;
use tracing::debug;

pub struct SubFunctionPass;

struct Injection {
    var_id: u32,
    start: TokenId,
    end: TokenId,
    values: Vec<Value>,
}

fn is_passable(v: &Value) -> bool {
    (v.is_known() || v.is_possible())
        && matches!(v.data, ValueData::Int(_) | ValueData::Float(_) | ValueData::Tok(_))
}

impl SubFunctionPass {
    fn collect(ctx: &PassContext<'_>) -> Vec<Injection> {
        let list = &*ctx.list;
        let db = ctx.db;
        let mut per_function: FxHashMap<FunctionId, usize> = FxHashMap::default();
        let mut out = Vec::new();

        for call in list.iter() {
            let Some(name) = callee_name(list, call) else { continue };
            let Some(function) = db.function_of(list, name).filter(|f| f.has_body()) else {
                continue;
            };
            let Some(body) = function.body_scope.map(|s| db.scope(s)) else { continue };
            let (Some(body_start), Some(body_end)) = (body.body_start, body.body_end) else {
                continue;
            };
            // recursion
            let caller = list[call].scope.and_then(|s| db.enclosing_function_scope(s));
            if caller == function.body_scope {
                continue;
            }
            let calls = per_function.entry(function.id).or_default();
            *calls += 1;
            if ctx.limits.max_sub_function_calls.is_some_and(|max| *calls > max) {
                debug!(function = %function.name, "sub-function call limit reached");
                continue;
            }
            let Some(start) = list.next(body_start) else { continue };

            for (index, arg) in call_arguments(list, call).into_iter().enumerate() {
                let Some(&param) = function.arg_list.get(index) else { break };
                let param = db.variable(param);
                if param.is_reference() || param.decl_id == 0 {
                    continue;
                }
                let expr = list.expression_string(arg);
                let values: Vec<Value> = list[arg]
                    .values
                    .iter()
                    .filter(|v| is_passable(v))
                    .map(|v| {
                        let mut passed = v.clone().possible();
                        passed.condition = None;
                        let info = format!(
                            "Calling function '{}', {} argument '{}' value is {}",
                            function.name,
                            ordinal(index + 1),
                            expr,
                            value_text(v)
                        );
                        passed.with_step(arg, info)
                    })
                    .collect();
                if values.is_empty() {
                    continue;
                }
                out.push(Injection {
                    var_id: param.decl_id,
                    start,
                    end: body_end,
                    values,
                });
            }
        }
        out
    }
}

impl ValueFlowPass for SubFunctionPass {
    fn name(&self) -> &'static str {
        "sub-function"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        Self::collect(ctx)
            .into_iter()
            .map(|i| forward(ctx, i.start, i.end, i.var_id, i.values))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, run, values};
    use super::super::LiteralPass;
    use super::*;

    #[test]
    fn test_argument_value_reaches_parameter() {
        let mut a = analyze("int g(int d) { return 10 / d; } void f() { g(0); }");
        run(&mut a, &[&LiteralPass, &SubFunctionPass], 1);
        let d = values(&a, "d", 1);
        assert_eq!(d.len(), 1);
        assert!(d[0].is_possible());
        assert_eq!(d[0].int_value(), Some(0));
        assert_eq!(d[0].error_path[0].1, "Calling function 'g', 1st argument '0' value is 0");
    }

    #[test]
    fn test_recursive_call_is_skipped() {
        let mut a = analyze("int g(int d) { if (d) { return g(d - 1); } return d; }");
        run(&mut a, &[&LiteralPass, &SubFunctionPass], 1);
        assert!(values(&a, "d", 1).is_empty());
    }
}
