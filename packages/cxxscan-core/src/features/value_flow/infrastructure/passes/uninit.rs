//! Uninitialized automatic variables
//!
//! A scalar local declared without initializer holds an uninit value from
//! the end of its declaration until the first write.

use crate::features::symbol_db::Variable;
use crate::features::tokenizer::{BaseType, TokenList};
use crate::features::value_flow::domain::Value;
use crate::features::value_flow::infrastructure::access::function_end;
use crate::features::value_flow::infrastructure::forward::forward;
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

pub struct UninitPass;

fn is_candidate(var: &Variable) -> bool {
    if !var.is_auto_local() || var.is_class() || var.is_array() || var.is_reference() || var.has_initializer() {
        return false;
    }
    var.value_type
        .as_ref()
        .is_some_and(|vt| vt.pointer > 0 || vt.is_arithmetic() || vt.base == BaseType::Bool)
}

/// `;` ending the declaration statement of `name`
fn declaration_end(list: &TokenList, name: TokenId) -> Option<TokenId> {
    let mut cur = list.next(name);
    while let Some(t) = cur {
        match list.text(t) {
            ";" => return list[t].ast_parent.is_none().then_some(t),
            "[" | "(" => cur = list.link(t).and_then(|l| list.next(l)),
            "{" | "}" | "=" | "," => return None,
            _ => cur = list.next(t),
        }
    }
    None
}

impl ValueFlowPass for UninitPass {
    fn name(&self) -> &'static str {
        "uninit"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let seeds: Vec<(u32, TokenId, TokenId)> = ctx
            .db
            .variables
            .iter()
            .filter(|v| is_candidate(v))
            .filter_map(|v| {
                let name = v.name_token?;
                let semi = declaration_end(ctx.list, name)?;
                let start = ctx.list.next(semi)?;
                let end = function_end(ctx.list, ctx.db, name)?;
                Some((v.decl_id, start, end))
            })
            .collect();

        seeds
            .into_iter()
            .map(|(var_id, start, end)| forward(ctx, start, end, var_id, vec![Value::uninit()]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, run, values};
    use super::*;

    #[test]
    fn test_uninit_reaches_first_use() {
        let mut a = analyze("void f(){ int a; a++; }");
        run(&mut a, &[&UninitPass], 1);
        let v = values(&a, "a", 1);
        assert_eq!(v.len(), 1);
        assert!(v[0].is_uninit());
        assert!(v[0].is_known());
    }

    #[test]
    fn test_initialized_and_class_variables_are_skipped() {
        let mut a = analyze("struct S { int m; }; void f(){ int a = 0; S s; g(a, s); }");
        run(&mut a, &[&UninitPass], 1);
        assert!(values(&a, "a", 2).is_empty());
        assert!(values(&a, "s", 1).is_empty());
    }

    #[test]
    fn test_conditional_initialization_is_possible() {
        let mut a = analyze("void f(int c){ int a; if (c) { a = 1; } return a; }");
        run(&mut a, &[&UninitPass], 1);
        let v = values(&a, "a", 2);
        assert_eq!(v.len(), 1);
        assert!(v[0].is_possible());
    }
}
