//! Return values of trivial functions at their call sites
//!
//! A function whose body is exactly `{ return <constant expression> ; }`
//! returns the folded value at every call.

use crate::features::symbol_db::callee_name;
use crate::features::tokenizer::{TokenKind, TokenList};
use crate::features::value_flow::domain::Value;
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::{FunctionId, TokenId};
use rustc_hash::FxHashMap;

pub struct FunctionReturnPass;

/// Folded value of a body that only returns a constant
fn constant_return(list: &TokenList, body_start: TokenId, body_end: TokenId) -> Option<Value> {
    let ret = list.next(body_start).filter(|&r| list.text(r) == "return")?;
    let expr = list[ret].ast_op1?;
    let (first, last) = list.expression_range(expr);
    let semi = list.next(last).filter(|&s| list.text(s) == ";")?;
    if list.next(semi) != Some(body_end) {
        return None;
    }
    let constant_only = list.range(Some(first), Some(semi)).all(|t| {
        let tok = &list[t];
        matches!(tok.kind, TokenKind::Number | TokenKind::Boolean | TokenKind::Char | TokenKind::Op)
            || matches!(tok.text.as_str(), "(" | ")")
    });
    if !constant_only {
        return None;
    }
    list[expr]
        .values
        .iter()
        .find(|v| v.is_known() && (v.int_value().is_some() || v.float_value().is_some()))
        .map(|v| Value::new(v.data.clone()))
}

impl ValueFlowPass for FunctionReturnPass {
    fn name(&self) -> &'static str {
        "function-return"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let returns: FxHashMap<FunctionId, Value> = ctx
            .db
            .functions
            .iter()
            .filter(|f| f.has_body())
            .filter_map(|f| {
                let body = ctx.db.scope(f.body_scope?);
                let value = constant_return(ctx.list, body.body_start?, body.body_end?)?;
                Some((f.id, value))
            })
            .collect();
        if returns.is_empty() {
            return 0;
        }

        let calls: Vec<(TokenId, TokenId, FunctionId)> = ctx
            .list
            .iter()
            .filter_map(|open| {
                let name = callee_name(ctx.list, open)?;
                let f = ctx.list[name].function?;
                returns.contains_key(&f).then_some((open, name, f))
            })
            .collect();

        let mut added = 0;
        for (open, name, f) in calls {
            let Some(value) = returns.get(&f) else {
                continue;
            };
            let shown = super::value_text(value);
            let info = format!("Calling function '{}' returns {}", ctx.list.text(name), shown);
            if ctx.add_value(open, value.clone().with_step(name, info)) {
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, run, values};
    use super::super::{ConstantFoldPass, LiteralPass};
    use super::*;

    #[test]
    fn test_constant_return_reaches_call() {
        let mut a = analyze("int size() { return 4 * 2; } void f() { g(size()); }");
        run(&mut a, &[&LiteralPass, &ConstantFoldPass, &FunctionReturnPass], 1);
        let call = values(&a, "(", 3);
        assert_eq!(call.len(), 1);
        assert_eq!(call[0].int_value(), Some(8));
        assert_eq!(call[0].error_path[0].1, "Calling function 'size' returns 8");
    }

    #[test]
    fn test_non_trivial_body_is_ignored() {
        let mut a = analyze("int n; int size() { n++; return 4; } void f() { g(size()); }");
        run(&mut a, &[&LiteralPass, &ConstantFoldPass, &FunctionReturnPass], 1);
        assert!(values(&a, "(", 3).is_empty());
    }
}
