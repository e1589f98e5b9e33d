//! Loop variable ranges
//!
//! `for (i = A; i < B; i++)` with a body that leaves `i` alone: inside the
//! body `i` may be `A` and may be the last value before `B`.

use crate::features::tokenizer::TokenList;
use crate::features::value_flow::domain::{Value, ValueKind};
use crate::features::value_flow::infrastructure::access::{classify_access, is_variable_changed, Access};
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

pub struct ForLoopPass;

struct LoopRange {
    var_id: u32,
    first: i64,
    last: i64,
    body: TokenId,
    body_end: TokenId,
}

fn is_var(list: &TokenList, t: Option<TokenId>, var_id: u32) -> bool {
    t.is_some_and(|t| list[t].var_id == var_id && var_id != 0)
}

fn loop_range(ctx: &PassContext<'_>, keyword: TokenId) -> Option<LoopRange> {
    let list = &*ctx.list;
    let open = list.next(keyword)?;
    let close = list.link(open)?;
    let s1 = list[open].ast_op2.filter(|&s| list.text(s) == ";")?;
    let s2 = list[s1].ast_op2?;

    let init = list[s1].ast_op1.filter(|&i| list.text(i) == "=")?;
    let var = list[init].ast_op1?;
    let var_id = list[var].var_id;
    let first = list[init].ast_op2.and_then(|v| list[v].known_int())?;

    let cond = list[s2].ast_op1?;
    if !is_var(list, list[cond].ast_op1, var_id) {
        return None;
    }
    let bound = list[cond].ast_op2.and_then(|v| list[v].known_int())?;
    let last = match list.text(cond) {
        "<" | "!=" => bound.checked_sub(1)?,
        "<=" => bound,
        _ => return None,
    };

    let step = list[s2].ast_op2?;
    if list.text(step) != "++" || !is_var(list, list[step].ast_op1, var_id) {
        return None;
    }

    let body = list.next(close).filter(|&b| list.text(b) == "{")?;
    let body_end = list.link(body)?;
    if first > last || is_variable_changed(list, ctx.db, ctx.library, body, body_end, var_id) {
        return None;
    }
    Some(LoopRange {
        var_id,
        first,
        last,
        body,
        body_end,
    })
}

impl ValueFlowPass for ForLoopPass {
    fn name(&self) -> &'static str {
        "for-loop"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let shared: &PassContext<'_> = ctx;
        let loops: Vec<LoopRange> = shared
            .list
            .iter()
            .filter(|&t| shared.list.text(t) == "for")
            .filter_map(|t| loop_range(shared, t))
            .collect();

        let mut added = 0;
        for range in loops {
            let reads: Vec<TokenId> = ctx
                .list
                .range(Some(range.body), Some(range.body_end))
                .filter(|&t| ctx.list[t].var_id == range.var_id)
                .filter(|&t| !matches!(classify_access(ctx.list, t), Access::Unevaluated))
                .collect();
            let mut values = vec![Value::int(range.first).with_kind(ValueKind::Possible)];
            if range.last != range.first {
                values.push(Value::int(range.last).with_kind(ValueKind::Possible));
            }
            for t in reads {
                added += ctx.add_values(t, values.iter().cloned());
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, ints, run};
    use super::super::LiteralPass;
    use super::*;

    #[test]
    fn test_loop_variable_range() {
        let mut a = analyze("void f() { int a[10]; for (int i = 0; i < 10; i++) { a[i] = 0; } }");
        run(&mut a, &[&LiteralPass, &ForLoopPass], 1);
        let mut seen = ints(&a, "i", 3);
        seen.sort();
        assert_eq!(seen, vec![0, 9]);
    }

    #[test]
    fn test_modified_loop_variable_is_skipped() {
        let mut a = analyze("void f() { for (int i = 0; i < 10; i++) { g(i); i = 3; } }");
        run(&mut a, &[&LiteralPass, &ForLoopPass], 1);
        assert!(ints(&a, "i", 3).is_empty());
    }
}
