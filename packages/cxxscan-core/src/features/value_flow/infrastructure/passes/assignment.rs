//! Forward propagation of assigned values
//!
//! For a statement `x = expr;` the values of `expr` (converted to the type
//! of `x`) are pushed forward from the end of the statement.

use super::value_text;
use crate::config::Platform;
use crate::features::tokenizer::{BaseType, ValueType};
use crate::features::value_flow::domain::{Value, ValueData};
use crate::features::value_flow::infrastructure::access::{function_end, statement_semicolon};
use crate::features::value_flow::infrastructure::forward::forward;
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

pub struct AssignmentPass;

struct Assignment {
    eq: TokenId,
    var_id: u32,
    start: TokenId,
    end: TokenId,
    values: Vec<Value>,
}

/// Convert an assigned value to the variable's type
fn convert(value: &Value, vt: Option<&ValueType>, platform: &Platform) -> Option<Value> {
    let Some(vt) = vt.filter(|vt| vt.pointer == 0) else {
        return Some(value.clone());
    };
    let mut v = value.clone();
    match (&value.data, vt.base) {
        (ValueData::Int(n), BaseType::Bool) => v.data = ValueData::Int(i64::from(*n != 0)),
        (ValueData::Int(n), _) if vt.is_integral() => {
            let bits = vt.bits(platform)?;
            v.data = ValueData::Int(Platform::truncate(*n, bits, vt.is_signed(platform)));
        }
        (ValueData::Int(n), _) if vt.is_float() => v.data = ValueData::Float(*n as f64),
        (ValueData::Float(f), _) if vt.is_integral() => {
            let bits = vt.bits(platform)?;
            v.data = ValueData::Int(Platform::truncate(f.trunc() as i64, bits, vt.is_signed(platform)));
        }
        (ValueData::Float(_), _) if vt.is_float() => {}
        (ValueData::Tok(_), _) | (ValueData::Lifetime { .. }, _) => return None,
        (ValueData::ContainerSize(_), BaseType::Container) => {}
        (ValueData::ContainerSize(_), _) => return None,
        _ => {}
    }
    Some(v)
}

impl AssignmentPass {
    fn collect(ctx: &PassContext<'_>) -> Vec<Assignment> {
        let list = &*ctx.list;
        let mut out = Vec::new();
        for eq in list.iter() {
            let tok = &list[eq];
            if tok.text != "=" || tok.ast_parent.is_some() {
                continue;
            }
            let (Some(lhs), Some(rhs)) = (tok.ast_op1, tok.ast_op2) else {
                continue;
            };
            let Some(var) = ctx.db.variable_of(list, lhs) else {
                continue;
            };
            if var.is_reference() || var.is_array() || list[lhs].var_id == 0 {
                continue;
            }
            let Some(semi) = statement_semicolon(list, eq) else {
                continue;
            };
            let (Some(start), Some(end)) = (list.next(semi), function_end(list, ctx.db, eq)) else {
                continue;
            };
            let expr = list.expression_string(eq);
            let values: Vec<Value> = list[rhs]
                .values
                .iter()
                .filter(|v| (v.is_known() || v.is_possible()) && !v.is_uninit())
                .filter(|v| !matches!(v.data, ValueData::Symbolic { .. }))
                .filter_map(|v| convert(v, var.value_type.as_ref(), ctx.platform))
                .map(|mut v| {
                    v.error_path.push((eq, format!("Assignment '{}', assigned value is {}", expr, value_text(&v))));
                    v
                })
                .collect();
            if values.is_empty() {
                continue;
            }
            out.push(Assignment {
                eq,
                var_id: list[lhs].var_id,
                start,
                end,
                values,
            });
        }
        out
    }
}

impl ValueFlowPass for AssignmentPass {
    fn name(&self) -> &'static str {
        "assignment"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let assignments = Self::collect(ctx);
        let mut added = 0;
        for a in assignments {
            // the assignment expression itself has the assigned value
            added += ctx.add_values(a.eq, a.values.iter().cloned());
            added += forward(ctx, a.start, a.end, a.var_id, a.values);
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, ints, run, values};
    use super::super::{ConstantFoldPass, LiteralPass};
    use super::*;

    #[test]
    fn test_folded_assignment_reaches_condition() {
        let mut a = analyze("void f() { int x = 2+3; if (x==5) { g(); } }");
        run(&mut a, &[&LiteralPass, &ConstantFoldPass, &AssignmentPass], 1);
        let x = values(&a, "x", 2);
        assert_eq!(x.len(), 1);
        assert!(x[0].is_known());
        assert_eq!(x[0].int_value(), Some(5));
        assert_eq!(x[0].error_path.last().unwrap().1, "Assignment 'x=2+3', assigned value is 5");
    }

    #[test]
    fn test_value_is_truncated_to_variable_type() {
        let mut a = analyze("void f() { unsigned char c; c = 257; g(c); }");
        run(&mut a, &[&LiteralPass, &AssignmentPass], 1);
        assert_eq!(ints(&a, "c", 2), vec![1]);
    }

    #[test]
    fn test_pointer_null_assignment() {
        let mut a = analyze("void f() { int *p; p = 0; *p = 1; }");
        run(&mut a, &[&LiteralPass, &AssignmentPass], 1);
        assert_eq!(ints(&a, "p", 2), vec![0]);
    }
}
