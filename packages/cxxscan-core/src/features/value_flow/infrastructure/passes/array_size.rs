//! `sizeof` of arrays and typed expressions
//!
//! The tokenizer already replaced `sizeof` of spelled types; what remains
//! are expressions, whose size comes from the declared variable or the
//! expression's value type.

use crate::features::tokenizer::ValueType;
use crate::features::value_flow::domain::Value;
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

pub struct SizeofPass;

impl SizeofPass {
    fn size_of(ctx: &PassContext<'_>, operand: TokenId) -> Option<i64> {
        let list = &*ctx.list;
        if let Some(var) = ctx.db.variable_of(list, operand) {
            if var.is_array() {
                let mut element: ValueType = var.value_type.clone()?;
                element.pointer = var.pointer_depth;
                let mut size = i64::from(element.size_of(ctx.platform)?);
                for dim in &var.dimensions {
                    size = size.checked_mul(dim.size?)?;
                }
                return Some(size);
            }
        }
        let vt = list[operand].value_type.as_ref()?;
        vt.size_of(ctx.platform).map(i64::from)
    }
}

impl ValueFlowPass for SizeofPass {
    fn name(&self) -> &'static str {
        "sizeof"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let sizes: Vec<(TokenId, i64)> = ctx
            .list
            .iter()
            .filter(|&t| ctx.list.text(t) == "sizeof")
            .filter_map(|t| {
                let operand = ctx.list[t].ast_op1?;
                Self::size_of(ctx, operand).map(|n| (t, n))
            })
            .collect();
        sizes
            .into_iter()
            .filter(|&(t, n)| ctx.add_value(t, Value::int(n)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, ints, run};
    use super::*;

    #[test]
    fn test_sizeof_array_variable() {
        let mut a = analyze("void f() { int buf[10]; char s[4][2]; g(sizeof(buf), sizeof(s)); }");
        run(&mut a, &[&SizeofPass], 1);
        assert_eq!(ints(&a, "sizeof", 0), vec![40]);
        assert_eq!(ints(&a, "sizeof", 1), vec![8]);
    }

    #[test]
    fn test_sizeof_typed_variable() {
        let mut a = analyze("void f(long x, char *p) { g(sizeof(x), sizeof(p)); }");
        run(&mut a, &[&SizeofPass], 1);
        assert_eq!(ints(&a, "sizeof", 0), vec![8]);
        assert_eq!(ints(&a, "sizeof", 1), vec![8]);
    }
}
