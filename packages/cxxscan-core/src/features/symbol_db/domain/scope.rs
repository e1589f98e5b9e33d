//! Lexical scopes

use crate::shared::models::{FunctionId, ScopeId, TokenId, TypeId, VariableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    Function,
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Try,
    Catch,
    Lambda,
    /// Plain `{ }` block inside a function
    Unconditional,
}

impl ScopeKind {
    pub fn is_class_like(self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Union)
    }

    /// Scopes whose statements execute
    pub fn is_executable(self) -> bool {
        !matches!(
            self,
            Self::Global | Self::Namespace | Self::Class | Self::Struct | Self::Union | Self::Enum
        )
    }

    pub fn is_loop(self) -> bool {
        matches!(self, Self::For | Self::While | Self::Do)
    }

    /// Conditionally executed body
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Self::If | Self::Else | Self::For | Self::While | Self::Switch | Self::Catch
        )
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "if" => Self::If,
            "else" => Self::Else,
            "for" => Self::For,
            "while" => Self::While,
            "do" => Self::Do,
            "switch" => Self::Switch,
            "try" => Self::Try,
            "catch" => Self::Catch,
            "class" => Self::Class,
            "struct" => Self::Struct,
            "union" => Self::Union,
            "namespace" => Self::Namespace,
            "enum" => Self::Enum,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Class, namespace or function name; empty for blocks
    pub name: String,
    pub nested_in: Option<ScopeId>,
    pub nested_list: Vec<ScopeId>,
    /// Header token: keyword, class name or function name
    pub class_def: Option<TokenId>,
    pub body_start: Option<TokenId>,
    pub body_end: Option<TokenId>,
    pub var_list: Vec<VariableId>,
    pub function_list: Vec<FunctionId>,
    pub defined_type: Option<TypeId>,
    /// Function owning a function/lambda body scope
    pub function: Option<FunctionId>,
}

impl Scope {
    pub fn new(id: ScopeId, kind: ScopeKind, nested_in: Option<ScopeId>) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            nested_in,
            nested_list: Vec::new(),
            class_def: None,
            body_start: None,
            body_end: None,
            var_list: Vec::new(),
            function_list: Vec::new(),
            defined_type: None,
            function: None,
        }
    }

    pub fn is_executable(&self) -> bool {
        self.kind.is_executable()
    }
}
