//! Conditional narrowing
//!
//! A condition comparing a variable with a constant tells what the
//! variable holds inside each branch, after an `if` whose other branch
//! leaves, and (as a possible value) before the condition: code before
//! `if (x == 0)` is assumed to be able to see `x == 0`.

use crate::features::tokenizer::TokenList;
use crate::features::value_flow::domain::{Bound, Value, ValueKind};
use crate::features::value_flow::infrastructure::access::{
    argument_use, block_escapes, classify_access, function_end, is_do_while_tail, is_variable_changed,
    member_call_changes, Access, ArgumentUse,
};
use crate::features::value_flow::infrastructure::forward::forward;
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

pub struct ConditionPass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            _ => return None,
        })
    }

    /// `k < x` is `x > k`
    fn swapped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            other => other,
        }
    }
}

/// What one comparison says about one variable
#[derive(Debug, Clone)]
struct Fact {
    var_id: u32,
    cmp: Cmp,
    k: i64,
}

fn impossible(k: i64, bound: Bound) -> Value {
    Value::int(k).with_kind(ValueKind::Impossible).with_bound(bound)
}

impl Fact {
    fn when_true(&self) -> Value {
        let k = self.k;
        match self.cmp {
            Cmp::Eq => Value::int(k),
            Cmp::Ne => impossible(k, Bound::Point),
            Cmp::Lt => impossible(k, Bound::Lower),
            Cmp::Le => impossible(k.saturating_add(1), Bound::Lower),
            Cmp::Gt => impossible(k, Bound::Upper),
            Cmp::Ge => impossible(k.saturating_sub(1), Bound::Upper),
        }
    }

    fn when_false(&self) -> Value {
        let k = self.k;
        match self.cmp {
            Cmp::Eq => impossible(k, Bound::Point),
            Cmp::Ne => Value::int(k),
            Cmp::Lt => impossible(k.saturating_sub(1), Bound::Upper),
            Cmp::Le => impossible(k, Bound::Upper),
            Cmp::Gt => impossible(k.saturating_add(1), Bound::Lower),
            Cmp::Ge => impossible(k, Bound::Lower),
        }
    }

    /// Value on the boundary that the condition separates out
    fn boundary(&self) -> i64 {
        match self.cmp {
            Cmp::Le | Cmp::Gt => self.k.saturating_add(1),
            _ => self.k,
        }
    }
}

fn is_plain_variable(list: &TokenList, t: TokenId) -> bool {
    let tok = &list[t];
    tok.var_id != 0 && tok.ast_op1.is_none() && tok.ast_op2.is_none()
}

/// Fact expressed by a single comparison
fn parse_fact(list: &TokenList, cond: TokenId) -> Option<Fact> {
    let tok = &list[cond];
    if is_plain_variable(list, cond) {
        return Some(Fact {
            var_id: tok.var_id,
            cmp: Cmp::Ne,
            k: 0,
        });
    }
    if list.is_unary_op(cond, "!") {
        let operand = tok.ast_op1?;
        return is_plain_variable(list, operand).then(|| Fact {
            var_id: list[operand].var_id,
            cmp: Cmp::Eq,
            k: 0,
        });
    }
    let cmp = Cmp::parse(&tok.text)?;
    let (lhs, rhs) = (tok.ast_op1?, tok.ast_op2?);
    if is_plain_variable(list, lhs) && !is_plain_variable(list, rhs) {
        let k = list[rhs].known_int()?;
        return Some(Fact {
            var_id: list[lhs].var_id,
            cmp,
            k,
        });
    }
    if is_plain_variable(list, rhs) && !is_plain_variable(list, lhs) {
        let k = list[lhs].known_int()?;
        return Some(Fact {
            var_id: list[rhs].var_id,
            cmp: cmp.swapped(),
            k,
        });
    }
    None
}

/// Facts holding when the condition is true, and when it is false
fn parse_condition(list: &TokenList, cond: TokenId) -> (Vec<Fact>, Vec<Fact>) {
    match list.text(cond) {
        "&&" | "||" => {
            let parts: Vec<Fact> = [list[cond].ast_op1, list[cond].ast_op2]
                .into_iter()
                .flatten()
                .filter_map(|c| parse_fact(list, c))
                .collect();
            if list.text(cond) == "&&" {
                (parts, Vec::new())
            } else {
                (Vec::new(), parts)
            }
        }
        _ => match parse_fact(list, cond) {
            Some(f) => (vec![f.clone()], vec![f]),
            None => (Vec::new(), Vec::new()),
        },
    }
}

/// One `if`/`while` and the ranges its facts apply to
struct Branching {
    keyword: TokenId,
    condition: TokenId,
    body: TokenId,
    body_end: TokenId,
    else_body: Option<(TokenId, TokenId)>,
    is_if: bool,
}

fn branchings(ctx: &PassContext<'_>) -> Vec<Branching> {
    let list = &*ctx.list;
    list.iter()
        .filter(|&t| matches!(list.text(t), "if" | "while") && list.str_at(t, 1) == "(")
        .filter(|&t| !is_do_while_tail(list, ctx.db, t))
        .filter_map(|keyword| {
            let open = list.next(keyword)?;
            let condition = list[open].ast_op2?;
            let body = list.link(open).and_then(|c| list.next(c)).filter(|&b| list.text(b) == "{")?;
            let body_end = list.link(body)?;
            let is_if = list.text(keyword) == "if";
            let else_body = (is_if && list.str_at(body_end, 1) == "else" && list.str_at(body_end, 2) == "{")
                .then(|| list.tok_at(body_end, 2))
                .flatten()
                .and_then(|open| list.link(open).map(|close| (open, close)));
            Some(Branching {
                keyword,
                condition,
                body,
                body_end,
                else_body,
                is_if,
            })
        })
        .collect()
}

impl ConditionPass {
    fn assume(ctx: &PassContext<'_>, value: Value, condition: TokenId, truth: bool) -> Value {
        let expr = ctx.list.expression_string(condition);
        let what = if truth { "true" } else { "false" };
        value.with_step(condition, format!("Assuming condition '{}' is {}", expr, what))
    }

    /// Reads of `var_id` before `keyword`, up to the start of the block or
    /// the last write
    fn reads_before(ctx: &PassContext<'_>, keyword: TokenId, var_id: u32) -> Vec<TokenId> {
        let (list, db, library) = (&*ctx.list, ctx.db, ctx.library);
        let mut reads = Vec::new();
        let mut cur = list.prev(keyword);
        while let Some(t) = cur {
            match list.text(t) {
                "{" | "case" | "default" => break,
                "}" => {
                    let Some(open) = list.link(t) else { break };
                    if is_variable_changed(list, db, library, open, t, var_id) {
                        break;
                    }
                    cur = list.prev(open);
                    continue;
                }
                _ => {}
            }
            if list[t].var_id == var_id {
                let read = match classify_access(list, t) {
                    Access::Read => true,
                    Access::Unevaluated => false,
                    Access::CallArgument { call, index } => {
                        if argument_use(list, db, library, call, index) != ArgumentUse::ByValue {
                            break;
                        }
                        true
                    }
                    Access::MemberCall(member) => {
                        if member_call_changes(list, db, library, t, member) {
                            break;
                        }
                        true
                    }
                    Access::Write | Access::ReadWrite | Access::AddressOf => break,
                };
                if read {
                    reads.push(t);
                }
            }
            cur = list.prev(t);
        }
        reads
    }

    fn apply(ctx: &mut PassContext<'_>, b: &Branching) -> usize {
        let (when_true, when_false) = parse_condition(ctx.list, b.condition);
        let then_escapes = block_escapes(ctx.list, ctx.db, ctx.library, b.body);
        let else_escapes = b
            .else_body
            .is_some_and(|(open, _)| block_escapes(ctx.list, ctx.db, ctx.library, open));
        let after = ctx.list.next(b.else_body.map_or(b.body_end, |(_, close)| close));
        let end = function_end(ctx.list, ctx.db, b.keyword);
        let mut added = 0;

        for fact in &when_true {
            let value = Self::assume(ctx, fact.when_true(), b.condition, true);
            if let Some(start) = ctx.list.next(b.body) {
                added += forward(ctx, start, b.body_end, fact.var_id, vec![value.clone()]);
            }
            if b.is_if && else_escapes && !then_escapes {
                if let (Some(start), Some(end)) = (after, end) {
                    added += forward(ctx, start, end, fact.var_id, vec![value]);
                }
            }
        }

        for fact in &when_false {
            if !b.is_if {
                continue;
            }
            let value = Self::assume(ctx, fact.when_false(), b.condition, false);
            if let Some((open, close)) = b.else_body {
                if let Some(start) = ctx.list.next(open) {
                    added += forward(ctx, start, close, fact.var_id, vec![value.clone()]);
                }
            }
            if then_escapes && !else_escapes {
                if let (Some(start), Some(end)) = (after, end) {
                    added += forward(ctx, start, end, fact.var_id, vec![value]);
                }
            }
        }

        if b.is_if {
            if let Some(fact) = parse_fact(ctx.list, b.condition) {
                let local = ctx
                    .db
                    .variable_of_var_id(fact.var_id)
                    .is_some_and(|v| (v.is_local() && !v.is_static()) || v.is_argument());
                if local {
                    let expr = ctx.list.expression_string(b.condition);
                    let value = Value::int(fact.boundary())
                        .with_kind(ValueKind::Possible)
                        .with_condition(b.condition)
                        .with_step(b.condition, format!("Assuming that condition '{}' is not redundant", expr));
                    for t in Self::reads_before(ctx, b.keyword, fact.var_id) {
                        if ctx.add_value(t, value.clone()) {
                            added += 1;
                        }
                    }
                }
            }
        }
        added
    }
}

impl ValueFlowPass for ConditionPass {
    fn name(&self) -> &'static str {
        "conditions"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        branchings(ctx).iter().map(|b| Self::apply(ctx, b)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, run, values};
    use super::super::LiteralPass;
    use super::*;

    fn passes() -> [&'static dyn ValueFlowPass; 2] {
        [&LiteralPass, &ConditionPass]
    }

    #[test]
    fn test_branch_facts() {
        let mut a = analyze("void f(int x) { if (x == 3) { g(x); } else { h(x); } }");
        run(&mut a, &passes(), 1);
        let then_x = values(&a, "x", 2);
        assert_eq!(then_x[0].int_value(), Some(3));
        assert!(then_x[0].is_known());
        let else_x = values(&a, "x", 3);
        assert!(else_x[0].is_impossible());
        assert_eq!(else_x[0].int_value(), Some(3));
    }

    #[test]
    fn test_null_check_before_use_is_possible() {
        let mut a = analyze("void f(int *p) { *p = 0; if (!p) { return; } }");
        run(&mut a, &passes(), 1);
        let before = values(&a, "p", 1);
        assert_eq!(before.len(), 1);
        assert!(before[0].is_possible());
        assert_eq!(before[0].int_value(), Some(0));
        assert!(before[0].condition.is_some());
    }

    #[test]
    fn test_fact_after_escaping_branch() {
        let mut a = analyze("void f(int *p) { if (p == 0) { return; } g(p); }");
        run(&mut a, &passes(), 1);
        let after = values(&a, "p", 2);
        assert_eq!(after.len(), 1);
        assert!(after[0].is_impossible());
    }

    #[test]
    fn test_reverse_stops_at_write() {
        let mut a = analyze("void h(int v); void f(int x) { g(x); x = 5; h(x); if (x < 10) { } }");
        run(&mut a, &passes(), 1);
        assert!(values(&a, "x", 1).is_empty());
        assert_eq!(values(&a, "x", 3)[0].int_value(), Some(10));
    }
}
