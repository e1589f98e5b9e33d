//! Functions, methods and lambdas

use crate::features::tokenizer::ValueType;
use crate::shared::models::{FunctionId, ScopeId, TokenId, VariableId};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u32 {
        const VIRTUAL = 1 << 0;
        /// `= 0`
        const PURE = 1 << 1;
        const STATIC = 1 << 2;
        const CONST = 1 << 3;
        const HAS_BODY = 1 << 4;
        const NORETURN = 1 << 5;
        const OVERRIDE = 1 << 6;
        const FINAL = 1 << 7;
        /// `= default`
        const DEFAULT = 1 << 8;
        /// `= delete`
        const DELETE = 1 << 9;
        const EXPLICIT = 1 << 10;
        const VARIADIC = 1 << 11;
        const NOEXCEPT = 1 << 12;
        const EXTERN = 1 << 13;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Function,
    Constructor,
    CopyConstructor,
    MoveConstructor,
    Destructor,
    Operator,
    Lambda,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    /// `f`, `~Foo`, `operator==`
    pub name: String,
    pub name_token: Option<TokenId>,
    /// `(` of the parameter list
    pub arg_def: Option<TokenId>,
    pub arg_list: Vec<VariableId>,
    /// Arguments without a default value
    pub min_args: usize,
    pub return_type: String,
    pub return_value_type: Option<ValueType>,
    /// Scope the function is declared in
    pub nested_in: ScopeId,
    pub body_scope: Option<ScopeId>,
    pub kind: FunctionKind,
    pub flags: FunctionFlags,
    /// Enclosing class names, outermost first
    pub qualification: Vec<String>,
}

impl Function {
    pub fn has_body(&self) -> bool {
        self.flags.contains(FunctionFlags::HAS_BODY)
    }

    pub fn is_virtual(&self) -> bool {
        self.flags.contains(FunctionFlags::VIRTUAL)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(FunctionFlags::STATIC)
    }

    pub fn is_noreturn(&self) -> bool {
        self.flags.contains(FunctionFlags::NORETURN)
    }

    pub fn is_constructor(&self) -> bool {
        matches!(
            self.kind,
            FunctionKind::Constructor | FunctionKind::CopyConstructor | FunctionKind::MoveConstructor
        )
    }

    pub fn arg_count(&self) -> usize {
        self.arg_list.len()
    }

    /// Whether a call with `n` arguments can bind to this function
    pub fn accepts_arg_count(&self, n: usize) -> bool {
        n >= self.min_args && (n <= self.arg_list.len() || self.flags.contains(FunctionFlags::VARIADIC))
    }

    pub fn qualified_name(&self) -> String {
        let mut parts = self.qualification.clone();
        parts.push(self.name.clone());
        parts.join("::")
    }

    /// Identity of the function across translation units
    pub fn ctu_key(&self) -> String {
        format!("{}/{}", self.qualified_name(), self.arg_list.len())
    }
}
