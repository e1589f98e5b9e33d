//! Constant folding over the AST
//!
//! Operator nodes get the values obtained by combining their operands'
//! values. Known with known stays known; anything possible makes the result
//! possible and keeps the operand's condition. Integer results are wrapped
//! to the node's type on the target platform.

use crate::config::Platform;
use crate::features::tokenizer::{TokenList, ValueType};
use crate::features::value_flow::domain::{Bound, Value, ValueData, ValueKind};
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

const MAX_DEPTH: usize = 256;

/// Operand pairs combined per binary node
const MAX_COMBINATIONS: usize = 64;

pub struct ConstantFoldPass;

impl ValueFlowPass for ConstantFoldPass {
    fn name(&self) -> &'static str {
        "constant-fold"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let roots: Vec<TokenId> = ctx
            .list
            .iter()
            .filter(|&t| {
                let tok = &ctx.list[t];
                tok.ast_parent.is_none() && (tok.ast_op1.is_some() || tok.ast_op2.is_some())
            })
            .collect();
        roots.into_iter().map(|r| fold(ctx, r, 0)).sum()
    }
}

fn fold(ctx: &mut PassContext<'_>, t: TokenId, depth: usize) -> usize {
    if depth > MAX_DEPTH {
        return 0;
    }
    let (op1, op2) = (ctx.list[t].ast_op1, ctx.list[t].ast_op2);
    let mut added = 0;
    if let Some(c) = op1 {
        added += fold(ctx, c, depth + 1);
    }
    if let Some(c) = op2 {
        added += fold(ctx, c, depth + 1);
    }
    let values = node_values(ctx.list, ctx.platform, t, op1, op2);
    added + ctx.add_values(t, values)
}

/// Operand values usable for folding
fn usable(list: &TokenList, t: Option<TokenId>) -> Vec<&Value> {
    match t {
        Some(t) => list[t]
            .values
            .iter()
            .filter(|v| {
                !v.is_impossible()
                    && v.bound == Bound::Point
                    && v.indirect == 0
                    && matches!(v.data, ValueData::Int(_) | ValueData::Float(_))
            })
            .collect(),
        None => Vec::new(),
    }
}

fn combined_kind(a: ValueKind, b: ValueKind) -> ValueKind {
    use ValueKind::*;
    match (a, b) {
        (Inconclusive, _) | (_, Inconclusive) => Inconclusive,
        (Known, Known) => Known,
        _ => Possible,
    }
}

fn derived(data: ValueData, from: &[&Value]) -> Value {
    let mut v = Value::new(data);
    v.kind = from.iter().fold(ValueKind::Known, |k, f| combined_kind(k, f.kind));
    v.condition = from.iter().find_map(|f| f.condition);
    for f in from {
        v.error_path.extend(f.error_path.iter().cloned());
    }
    v
}

/// Wrap an integer result to the type of the node, when it has one
fn wrap(n: i64, vt: Option<&ValueType>, platform: &Platform) -> i64 {
    match vt.filter(|vt| vt.is_integral() && vt.pointer == 0) {
        Some(vt) => match vt.bits(platform) {
            Some(bits) => Platform::truncate(n, bits, vt.is_signed(platform)),
            None => n,
        },
        None => n,
    }
}

fn node_values(list: &TokenList, platform: &Platform, t: TokenId, op1: Option<TokenId>, op2: Option<TokenId>) -> Vec<Value> {
    let tok = &list[t];
    let text = tok.text.as_str();
    let vt = tok.value_type.as_ref();

    if tok.is_cast() {
        return usable(list, op1)
            .into_iter()
            .filter_map(|v| {
                let data = match (vt, &v.data) {
                    (Some(vt), ValueData::Int(n)) if vt.is_float() && vt.pointer == 0 => ValueData::Float(*n as f64),
                    (Some(vt), ValueData::Float(f)) if vt.is_integral() && vt.pointer == 0 => {
                        ValueData::Int(wrap(f.trunc() as i64, Some(vt), platform))
                    }
                    (_, ValueData::Int(n)) => ValueData::Int(wrap(*n, vt, platform)),
                    (_, ValueData::Float(f)) => ValueData::Float(*f),
                    _ => return None,
                };
                Some(derived(data, &[v]))
            })
            .collect();
    }

    match (op1.is_some(), op2.is_some()) {
        (true, false) => unary(list, platform, text, vt, op1),
        (true, true) => match text {
            "?" => ternary(list, op1, op2),
            "&&" | "||" => logical(list, text, op1, op2),
            "+" | "-" | "*" | "/" | "%" | "<<" | ">>" | "&" | "|" | "^" | "==" | "!=" | "<" | "<=" | ">" | ">=" => {
                binary(list, platform, text, vt, op1, op2)
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn unary(list: &TokenList, platform: &Platform, op: &str, vt: Option<&ValueType>, op1: Option<TokenId>) -> Vec<Value> {
    if !matches!(op, "-" | "+" | "!" | "~") {
        return Vec::new();
    }
    usable(list, op1)
        .into_iter()
        .filter_map(|v| {
            let data = match (op, &v.data) {
                ("-", ValueData::Int(n)) => ValueData::Int(wrap(n.wrapping_neg(), vt, platform)),
                ("-", ValueData::Float(f)) => ValueData::Float(-f),
                ("+", d) => d.clone(),
                ("!", ValueData::Int(n)) => ValueData::Int(i64::from(*n == 0)),
                ("!", ValueData::Float(f)) => ValueData::Int(i64::from(*f == 0.0)),
                ("~", ValueData::Int(n)) => ValueData::Int(wrap(!n, vt, platform)),
                _ => return None,
            };
            Some(derived(data, &[v]))
        })
        .collect()
}

fn ternary(list: &TokenList, op1: Option<TokenId>, op2: Option<TokenId>) -> Vec<Value> {
    let Some(colon) = op2.filter(|&c| list.text(c) == ":") else {
        return Vec::new();
    };
    let Some(cond) = op1.and_then(|c| list[c].known_int()) else {
        return Vec::new();
    };
    let branch = if cond != 0 {
        list[colon].ast_op1
    } else {
        list[colon].ast_op2
    };
    usable(list, branch).into_iter().cloned().collect()
}

fn logical(list: &TokenList, op: &str, op1: Option<TokenId>, op2: Option<TokenId>) -> Vec<Value> {
    let lhs = op1.and_then(|t| list[t].known_int());
    let rhs = op2.and_then(|t| list[t].known_int());
    let result = match (op, lhs, rhs) {
        ("&&", Some(0), _) | ("&&", _, Some(0)) => Some(0),
        ("&&", Some(_), Some(_)) => Some(1),
        ("||", Some(a), _) if a != 0 => Some(1),
        ("||", _, Some(b)) if b != 0 => Some(1),
        ("||", Some(_), Some(_)) => Some(0),
        _ => None,
    };
    result.map(Value::int).into_iter().collect()
}

fn binary(
    list: &TokenList,
    platform: &Platform,
    op: &str,
    vt: Option<&ValueType>,
    op1: Option<TokenId>,
    op2: Option<TokenId>,
) -> Vec<Value> {
    let lhs = usable(list, op1);
    let rhs = usable(list, op2);
    let mut out = Vec::new();
    for a in &lhs {
        for b in &rhs {
            if out.len() >= MAX_COMBINATIONS {
                return out;
            }
            let data = match (&a.data, &b.data) {
                (ValueData::Int(x), ValueData::Int(y)) => int_op(op, *x, *y, op1.and_then(|t| list[t].value_type.as_ref()), platform)
                    .map(|n| if is_comparison(op) { n } else { wrap(n, vt, platform) })
                    .map(ValueData::Int),
                _ => match (a.float_value(), b.float_value()) {
                    (Some(x), Some(y)) => float_op(op, x, y),
                    _ => None,
                },
            };
            if let Some(data) = data {
                out.push(derived(data, &[*a, *b]));
            }
        }
    }
    if out.is_empty() && matches!(op, "==" | "!=") {
        if let Some(n) = excluded_equality(list, op1, op2).or_else(|| excluded_equality(list, op2, op1)) {
            out.push(Value::int(i64::from(op == "!=") * n));
        }
    }
    out
}

/// `x == k` where `x` can not be `k`: returns 1
fn excluded_equality(list: &TokenList, var: Option<TokenId>, other: Option<TokenId>) -> Option<i64> {
    let k = list[other?].known_int()?;
    list[var?]
        .values
        .iter()
        .any(|v| v.is_impossible() && v.bound == Bound::Point && v.int_value() == Some(k))
        .then_some(1)
}

fn is_comparison(op: &str) -> bool {
    matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=")
}

fn int_op(op: &str, x: i64, y: i64, lhs_type: Option<&ValueType>, platform: &Platform) -> Option<i64> {
    Some(match op {
        "+" => x.wrapping_add(y),
        "-" => x.wrapping_sub(y),
        "*" => x.wrapping_mul(y),
        "/" if y == 0 => return None,
        "/" => x.checked_div(y)?,
        "%" if y == 0 => return None,
        "%" => x.checked_rem(y)?,
        "<<" | ">>" => {
            let bits = lhs_type
                .map(|vt| vt.promoted())
                .and_then(|vt| vt.bits(platform))
                .unwrap_or(platform.sizeof_int * platform.char_bit);
            if y < 0 || y >= i64::from(bits) || (op == "<<" && x < 0) {
                return None;
            }
            if op == "<<" {
                x.checked_shl(y as u32)?
            } else {
                x >> y
            }
        }
        "&" => x & y,
        "|" => x | y,
        "^" => x ^ y,
        "==" => i64::from(x == y),
        "!=" => i64::from(x != y),
        "<" => i64::from(x < y),
        "<=" => i64::from(x <= y),
        ">" => i64::from(x > y),
        ">=" => i64::from(x >= y),
        _ => return None,
    })
}

fn float_op(op: &str, x: f64, y: f64) -> Option<ValueData> {
    Some(match op {
        "+" => ValueData::Float(x + y),
        "-" => ValueData::Float(x - y),
        "*" => ValueData::Float(x * y),
        "/" if y == 0.0 => return None,
        "/" => ValueData::Float(x / y),
        "==" => ValueData::Int(i64::from(x == y)),
        "!=" => ValueData::Int(i64::from(x != y)),
        "<" => ValueData::Int(i64::from(x < y)),
        "<=" => ValueData::Int(i64::from(x <= y)),
        ">" => ValueData::Int(i64::from(x > y)),
        ">=" => ValueData::Int(i64::from(x >= y)),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, ints, run, values};
    use super::super::LiteralPass;
    use super::*;

    #[test]
    fn test_fold_arithmetic() {
        let mut a = analyze("void f() { g(2 + 3 * 4, (7 - 9) / 2, 1 << 4); }");
        run(&mut a, &[&LiteralPass, &ConstantFoldPass], 1);
        assert_eq!(ints(&a, "+", 0), vec![14]);
        assert_eq!(ints(&a, "/", 0), vec![-1]);
        assert_eq!(ints(&a, "<<", 0), vec![16]);
    }

    #[test]
    fn test_division_by_zero_has_no_value() {
        let mut a = analyze("void f() { g(1 / 0, 5 % 0); }");
        run(&mut a, &[&LiteralPass, &ConstantFoldPass], 1);
        assert!(values(&a, "/", 0).is_empty());
        assert!(values(&a, "%", 0).is_empty());
    }

    #[test]
    fn test_comparisons_and_logic() {
        let mut a = analyze("void f() { g(3 == 3, 2 > 5, 0 && h(), !0); }");
        run(&mut a, &[&LiteralPass, &ConstantFoldPass], 1);
        assert_eq!(ints(&a, "==", 0), vec![1]);
        assert_eq!(ints(&a, ">", 0), vec![0]);
        assert_eq!(ints(&a, "&&", 0), vec![0]);
        assert_eq!(ints(&a, "!", 0), vec![1]);
    }

    #[test]
    fn test_unsigned_char_cast_wraps() {
        let mut a = analyze("void f() { g((unsigned char)300, -(1)); }");
        run(&mut a, &[&LiteralPass, &ConstantFoldPass], 1);
        let cast = a.list.iter().find(|&t| a.list[t].is_cast()).unwrap();
        assert_eq!(a.list[cast].known_int(), Some(44));
    }

    #[test]
    fn test_folding_is_idempotent() {
        let mut a = analyze("void f() { g(1 + 2 + 3); }");
        run(&mut a, &[&LiteralPass, &ConstantFoldPass], 3);
        assert_eq!(values(&a, "+", 1).len(), 1);
        assert_eq!(ints(&a, "+", 1), vec![6]);
    }
}
