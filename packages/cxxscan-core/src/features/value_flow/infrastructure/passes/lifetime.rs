//! Lifetimes: pointers to local storage
//!
//! `&local`, `&arr[i]` and a local array decaying to a pointer carry a
//! lifetime value naming the object they point into.

use crate::features::symbol_db::Variable;
use crate::features::tokenizer::TokenList;
use crate::features::value_flow::domain::{LifetimeKind, LifetimeScope, Value, ValueData};
use crate::features::value_flow::infrastructure::access::{classify_access, Access};
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

pub struct LifetimePass;

/// Storage that ends with the function
fn local_storage(var: &Variable) -> Option<LifetimeScope> {
    if var.is_reference() || var.is_static() {
        return None;
    }
    if var.is_local() {
        Some(LifetimeScope::Local)
    } else if var.is_argument() && !var.is_array() {
        Some(LifetimeScope::Argument)
    } else {
        None
    }
}

fn lifetime(var: &Variable, var_token: TokenId, kind: LifetimeKind, scope: LifetimeScope, at: TokenId, info: String) -> Value {
    Value::new(ValueData::Lifetime {
        var_id: var.decl_id,
        var_token,
        kind,
        scope,
    })
    .with_step(at, info)
}

/// Array token used as a pointer rather than indexed or measured
fn decays(list: &TokenList, t: TokenId) -> bool {
    match list[t].ast_parent {
        Some(p) if list.text(p) == "[" && list[p].ast_op1 == Some(t) => false,
        Some(p) if list.is_unary_op(p, "&") => false,
        Some(p) if list.text(p) == "." => false,
        _ => classify_access(list, t) != Access::Unevaluated,
    }
}

impl ValueFlowPass for LifetimePass {
    fn name(&self) -> &'static str {
        "lifetime"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let list = &*ctx.list;
        let db = ctx.db;
        let mut found: Vec<(TokenId, Value)> = Vec::new();
        for t in list.iter() {
            let tok = &list[t];
            if list.is_unary_op(t, "&") {
                let Some(operand) = tok.ast_op1 else { continue };
                if let Some(var) = db.variable_of(list, operand) {
                    if let Some(scope) = local_storage(var) {
                        let info = "Address of variable taken here.".to_string();
                        found.push((t, lifetime(var, operand, LifetimeKind::Address, scope, t, info)));
                    }
                } else if list.text(operand) == "[" {
                    // &arr[i]
                    let Some(base) = list[operand].ast_op1 else { continue };
                    let Some(var) = db.variable_of(list, base).filter(|v| v.is_array()) else {
                        continue;
                    };
                    if let Some(scope) = local_storage(var) {
                        let info = "Address of array element taken here.".to_string();
                        found.push((t, lifetime(var, base, LifetimeKind::Object, scope, t, info)));
                    }
                }
            } else if tok.var_id != 0 && Some(t) != db.variable_of(list, t).and_then(|v| v.name_token) {
                let Some(var) = db.variable_of(list, t).filter(|v| v.is_array() && v.is_local()) else {
                    continue;
                };
                if local_storage(var).is_some() && decays(list, t) {
                    let info = "Array decays to pointer here.".to_string();
                    found.push((t, lifetime(var, t, LifetimeKind::Object, LifetimeScope::Local, t, info)));
                }
            }
        }
        found
            .into_iter()
            .filter(|(t, v)| ctx.add_value(*t, v.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, run, values};
    use super::*;

    #[test]
    fn test_address_of_local() {
        let mut a = analyze("int *f() { int x; return &x; }");
        run(&mut a, &[&LifetimePass], 1);
        let v = values(&a, "&", 0);
        assert_eq!(v.len(), 1);
        assert!(matches!(
            v[0].data,
            ValueData::Lifetime { kind: LifetimeKind::Address, scope: LifetimeScope::Local, .. }
        ));
    }

    #[test]
    fn test_array_decay_and_element_address() {
        let mut a = analyze("char *f() { char buf[8]; g(buf[0]); h(&buf[1]); return buf; }");
        run(&mut a, &[&LifetimePass], 1);
        assert!(values(&a, "buf", 1).is_empty());
        assert!(values(&a, "&", 0)[0].is_lifetime());
        assert!(values(&a, "buf", 3)[0].is_lifetime());
    }

    #[test]
    fn test_static_local_has_no_lifetime() {
        let mut a = analyze("int *f() { static int x; return &x; }");
        run(&mut a, &[&LifetimePass], 1);
        assert!(values(&a, "&", 0).is_empty());
    }
}
