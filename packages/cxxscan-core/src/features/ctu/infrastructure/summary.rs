//! Extracting CTU records from one analyzed file

use crate::features::ctu::domain::{CallSite, CtuValue, NestedCall};
use crate::features::library::Library;
use crate::features::symbol_db::{call_arguments, callee_name, Function, SymbolDatabase};
use crate::features::tokenizer::TokenList;
use crate::features::value_flow::infrastructure::{
    classify_access, dereference_of, is_assigned_through, is_variable_changed, ordinal, Access,
};
use crate::shared::models::{FileLocation, TokenId};

/// First use of a pointer parameter inside its function, when that use
/// dereferences it
#[derive(Debug, Clone)]
pub struct ParameterUse {
    pub function_key: String,
    /// 1-based
    pub arg_index: usize,
    pub param: String,
    pub token: TokenId,
    /// Whether the dereference is the target of an assignment
    pub written: bool,
}

fn enclosing_function<'d>(list: &TokenList, db: &'d SymbolDatabase, tok: TokenId) -> Option<&'d Function> {
    let scope = db.enclosing_function_scope(list[tok].scope?)?;
    db.scope(scope).function.map(|f| db.function(f))
}

/// Pointer parameters whose first use dereferences them
pub fn first_parameter_uses(list: &TokenList, db: &SymbolDatabase) -> Vec<ParameterUse> {
    let mut out = Vec::new();
    for function in db.functions.iter().filter(|f| f.has_body()) {
        let Some(body) = function.body_scope.map(|s| db.scope(s)) else { continue };
        let (Some(start), Some(end)) = (body.body_start, body.body_end) else { continue };
        for (index, &param) in function.arg_list.iter().enumerate() {
            let param = db.variable(param);
            if !param.is_pointer() || param.is_reference() || param.decl_id == 0 {
                continue;
            }
            let first = list
                .range(Some(start), Some(end))
                .filter(|&t| list[t].var_id == param.decl_id)
                .find(|&t| classify_access(list, t) != Access::Unevaluated);
            let Some(tok) = first else { continue };
            let Some(deref) = dereference_of(list, tok) else { continue };
            out.push(ParameterUse {
                function_key: function.ctu_key(),
                arg_index: index + 1,
                param: param.name.clone(),
                token: tok,
                written: is_assigned_through(list, deref),
            });
        }
    }
    out
}

/// `&x` of a local that has not been written since its declaration
fn is_uninit_address(list: &TokenList, db: &SymbolDatabase, library: &Library, arg: TokenId) -> bool {
    if !list.is_unary_op(arg, "&") {
        return false;
    }
    let Some(operand) = list[arg].ast_op1 else { return false };
    let Some(var) = db.variable_of(list, operand) else { return false };
    if !var.is_auto_local() || var.has_initializer() || var.is_array() || var.is_reference() {
        return false;
    }
    let (Some(name), Some(before)) = (var.name_token, list.prev(arg)) else {
        return false;
    };
    let Some(after_decl) = list.next(name) else { return false };
    list.position_before(name, arg) && !is_variable_changed(list, db, library, after_decl, before, var.decl_id)
}

/// Call sites with null/uninit arguments, and parameters forwarded to
/// other functions
pub fn summarize_calls(list: &TokenList, db: &SymbolDatabase, library: &Library) -> (Vec<CallSite>, Vec<NestedCall>) {
    let mut calls = Vec::new();
    let mut nested = Vec::new();
    for call in list.iter() {
        let Some(name) = callee_name(list, call) else { continue };
        let Some(callee) = db.function_of(list, name) else { continue };
        let callee_key = callee.ctu_key();
        let caller = enclosing_function(list, db, call);

        for (index, arg) in call_arguments(list, call).into_iter().enumerate() {
            let Some(&param) = callee.arg_list.get(index) else { break };
            if !db.variable(param).is_pointer() {
                continue;
            }
            let arg_expr = list.expression_string(arg);

            let null = list[arg].values.iter().find(|v| v.is_known() && v.is_null());
            let value = match null {
                Some(_) => Some(CtuValue::Null),
                None if is_uninit_address(list, db, library, arg) => Some(CtuValue::Uninit),
                None => None,
            };
            if let Some(value) = value {
                let mut path: Vec<FileLocation> = null
                    .map(|v| {
                        v.error_path
                            .iter()
                            .map(|(t, info)| list.location(*t).with_info(info.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                let what = match value {
                    CtuValue::Null => "null",
                    CtuValue::Uninit => "uninitialized",
                };
                path.push(list.location(arg).with_info(format!(
                    "Calling function '{}', {} argument is {}",
                    callee.name,
                    ordinal(index + 1),
                    what
                )));
                calls.push(CallSite {
                    callee: callee_key.clone(),
                    arg_index: index + 1,
                    arg_expr,
                    value,
                    path,
                });
                continue;
            }

            // parameter handed on unchanged
            let Some(caller) = caller else { continue };
            let Some(var) = db.variable_of(list, arg).filter(|v| v.is_argument()) else {
                continue;
            };
            if caller.arg_list.get(var.index) == Some(&var.id) {
                nested.push(NestedCall {
                    caller: caller.ctu_key(),
                    caller_arg: var.index + 1,
                    callee: callee_key.clone(),
                    callee_arg: index + 1,
                    location: list.location(arg).with_info(format!("Calling function {}", callee.name)),
                });
            }
        }
    }
    (calls, nested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::features::tokenizer::Tokenizer;
    use crate::features::value_flow::ValueFlowEngine;

    fn analyzed(code: &str) -> (TokenList, SymbolDatabase, Library) {
        let settings = Settings::default();
        let mut list = Tokenizer::new(&settings).tokenize_str(code, "a.c").unwrap().list;
        let library = Library::standard().unwrap();
        let db = SymbolDatabase::build(&mut list, &settings, &library);
        ValueFlowEngine::new().run(&mut list, &db, &settings, &library);
        (list, db, library)
    }

    #[test]
    fn test_null_and_uninit_call_sites() {
        let (list, db, library) = analyzed("void use(int *p); void f() { int x; use(0); use(&x); }");
        let (calls, nested) = summarize_calls(&list, &db, &library);
        assert!(nested.is_empty());
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].callee, "use/1");
        assert_eq!(calls[0].value, CtuValue::Null);
        assert_eq!(calls[1].value, CtuValue::Uninit);
        assert_eq!(calls[1].arg_expr, "&x");
    }

    #[test]
    fn test_initialized_address_is_not_uninit() {
        let (list, db, library) = analyzed("void use(int *p); void f() { int x; x = 1; use(&x); }");
        let (calls, _) = summarize_calls(&list, &db, &library);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_forwarded_parameter() {
        let (list, db, library) = analyzed("void use(int *p); void mid(int a, int *q) { use(q); }");
        let (_, nested) = summarize_calls(&list, &db, &library);
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].caller, "mid/2");
        assert_eq!(nested[0].caller_arg, 2);
        assert_eq!(nested[0].callee_arg, 1);
    }

    #[test]
    fn test_first_use_dereferences() {
        let (list, db, _) = analyzed("void a(int *p) { *p = 1; } void b(int *p) { if (p) { *p = 2; } } int c(int *p) { return p[0]; }");
        let uses = first_parameter_uses(&list, &db);
        assert_eq!(uses.len(), 2);
        assert_eq!(uses[0].function_key, "a/1");
        assert!(uses[0].written);
        assert_eq!(uses[1].function_key, "c/1");
        assert!(!uses[1].written);
    }
}
