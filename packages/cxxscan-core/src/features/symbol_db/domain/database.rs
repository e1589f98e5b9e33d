//! Symbol database: arenas of scopes, variables, functions and types

use super::function::{Function, FunctionKind};
use super::scope::{Scope, ScopeKind};
use super::type_info::Type;
use super::variable::Variable;
use crate::features::tokenizer::TokenList;
use crate::shared::models::{FunctionId, ScopeId, TokenId, TypeId, VariableId};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct SymbolDatabase {
    pub scopes: Vec<Scope>,
    pub variables: Vec<Variable>,
    pub functions: Vec<Function>,
    pub types: Vec<Type>,
    pub(crate) by_var_id: FxHashMap<u32, VariableId>,
}

impl SymbolDatabase {
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.index()]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn type_info(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn global_scope(&self) -> Option<&Scope> {
        self.scopes.first()
    }

    /// Variable declared with the given variable id
    pub fn variable_of_var_id(&self, var_id: u32) -> Option<&Variable> {
        self.by_var_id.get(&var_id).map(|&id| self.variable(id))
    }

    /// Variable referenced by a token
    pub fn variable_of(&self, list: &TokenList, tok: TokenId) -> Option<&Variable> {
        list[tok].variable.map(|id| self.variable(id))
    }

    /// Function called or defined at a name token
    pub fn function_of(&self, list: &TokenList, tok: TokenId) -> Option<&Function> {
        list[tok].function.map(|id| self.function(id))
    }

    /// Function and lambda body scopes
    pub fn function_scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes
            .iter()
            .filter(|s| matches!(s.kind, ScopeKind::Function | ScopeKind::Lambda))
    }

    pub fn class_scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter().filter(|s| s.kind.is_class_like())
    }

    /// Innermost function or lambda scope around `scope`
    pub fn enclosing_function_scope(&self, mut scope: ScopeId) -> Option<ScopeId> {
        loop {
            let s = self.scope(scope);
            if matches!(s.kind, ScopeKind::Function | ScopeKind::Lambda) {
                return Some(scope);
            }
            scope = s.nested_in?;
        }
    }

    /// Whether `inner` is `outer` or nested in it
    pub fn is_nested_in(&self, mut inner: ScopeId, outer: ScopeId) -> bool {
        loop {
            if inner == outer {
                return true;
            }
            match self.scope(inner).nested_in {
                Some(parent) => inner = parent,
                None => return false,
            }
        }
    }

    pub fn find_type(&self, name: &str) -> Option<&Type> {
        let short = name.rsplit("::").next().unwrap_or(name);
        self.types.iter().find(|t| t.name == short)
    }

    /// Destructor of a class, if declared
    pub fn destructor_of(&self, ty: TypeId) -> Option<&Function> {
        let scope = self.type_info(ty).class_scope?;
        self.scope(scope)
            .function_list
            .iter()
            .map(|&f| self.function(f))
            .find(|f| f.kind == FunctionKind::Destructor)
    }

    /// Resolved base types, transitively, without repetition
    pub fn all_bases(&self, ty: TypeId) -> Vec<TypeId> {
        let mut out = Vec::new();
        let mut stack = vec![ty];
        while let Some(t) = stack.pop() {
            for base in &self.type_info(t).bases {
                if let Some(b) = base.type_id {
                    if b != ty && !out.contains(&b) {
                        out.push(b);
                        stack.push(b);
                    }
                }
            }
        }
        out
    }

    /// Classes deriving from `ty`, directly or not
    pub fn derived_types(&self, ty: TypeId) -> Vec<TypeId> {
        self.types
            .iter()
            .filter(|t| t.id != ty && self.all_bases(t.id).contains(&ty))
            .map(|t| t.id)
            .collect()
    }

    /// Functions with the given (unqualified) name
    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Function> + 'a {
        self.functions.iter().filter(move |f| f.name == name)
    }
}
