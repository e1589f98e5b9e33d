//! Class-like types and inheritance

use crate::shared::models::{ScopeId, TokenId, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseInfo {
    pub name: String,
    pub access: Access,
    pub is_virtual: bool,
    /// Resolved base; `None` when unknown or when it would close a cycle
    pub type_id: Option<TypeId>,
}

#[derive(Debug, Clone)]
pub struct Type {
    pub id: TypeId,
    pub name: String,
    pub class_def: TokenId,
    pub class_scope: Option<ScopeId>,
    pub enclosing_scope: ScopeId,
    pub bases: Vec<BaseInfo>,
}

impl Type {
    pub fn new(id: TypeId, name: impl Into<String>, class_def: TokenId, enclosing_scope: ScopeId) -> Self {
        Self {
            id,
            name: name.into(),
            class_def,
            class_scope: None,
            enclosing_scope,
            bases: Vec::new(),
        }
    }
}
