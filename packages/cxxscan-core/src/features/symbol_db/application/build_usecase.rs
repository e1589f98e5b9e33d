//! Build use case: token list → symbol database

use crate::config::Settings;
use crate::features::library::Library;
use crate::features::symbol_db::domain::SymbolDatabase;
use crate::features::symbol_db::infrastructure::{link_calls, resolve_bases, set_value_types, ScopeBuilder};
use crate::features::tokenizer::TokenList;
use tracing::debug;

impl SymbolDatabase {
    /// Build scopes, variables, functions and types for `list`, stamping
    /// variable ids, scope/function back-references and value types on
    /// its tokens
    pub fn build(list: &mut TokenList, settings: &Settings, library: &Library) -> SymbolDatabase {
        let mut db = ScopeBuilder::new(list, library).build();
        resolve_bases(&mut db);
        let linked = link_calls(list, &db);
        set_value_types(list, &db, &settings.target(), library);
        debug!(
            scopes = db.scopes.len(),
            variables = db.variables.len(),
            functions = db.functions.len(),
            types = db.types.len(),
            linked_calls = linked,
            "Symbol database built"
        );
        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::symbol_db::domain::ScopeKind;
    use crate::features::tokenizer::Tokenizer;
    use rustc_hash::FxHashMap;

    fn build(code: &str) -> (TokenList, SymbolDatabase) {
        let settings = Settings::default();
        let mut list = Tokenizer::new(&settings).tokenize_str(code, "t.cpp").unwrap().list;
        let library = Library::standard().unwrap();
        let db = SymbolDatabase::build(&mut list, &settings, &library);
        (list, db)
    }

    #[test]
    fn test_uninit_scenario_variable() {
        let (list, db) = build("void f(){ int a; a++; }");
        let a_use = list.iter().filter(|&t| list.text(t) == "a").nth(1).unwrap();
        assert_ne!(list[a_use].var_id, 0);
        let var = db.variable_of(&list, a_use).unwrap();
        assert_eq!(db.scope(var.scope).kind, ScopeKind::Function);
        assert!(!var.has_initializer());
    }

    #[test]
    fn test_var_id_consistency() {
        let (list, db) = build(
            "int g; struct S { int m; void f(int m2) { m = m2; } }; int h(int x) { int y; y = x + g; { int x; x = y; } return x; }",
        );
        let mut seen: FxHashMap<u32, _> = FxHashMap::default();
        for t in list.iter() {
            let var_id = list[t].var_id;
            if var_id == 0 {
                continue;
            }
            let var = db.variable_of(&list, t).unwrap();
            assert_eq!(var.decl_id, var_id);
            let entry = seen.entry(var_id).or_insert((var.scope, var.type_name.clone()));
            assert_eq!(*entry, (var.scope, var.type_name.clone()));
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn test_noreturn_from_library() {
        let (_, db) = build("void exit(int code); void f() { exit(1); }");
        assert!(db.functions_named("exit").next().unwrap().is_noreturn());
    }
}
