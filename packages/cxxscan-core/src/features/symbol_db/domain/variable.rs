//! Declared variables

use crate::features::tokenizer::ValueType;
use crate::shared::models::{ScopeId, TokenId, VariableId};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VariableFlags: u32 {
        const STATIC = 1 << 0;
        const CONST = 1 << 1;
        const EXTERN = 1 << 2;
        const POINTER = 1 << 3;
        const REFERENCE = 1 << 4;
        const RVALUE_REFERENCE = 1 << 5;
        const ARRAY = 1 << 6;
        const ARGUMENT = 1 << 7;
        const LOCAL = 1 << 8;
        const MEMBER = 1 << 9;
        const GLOBAL = 1 << 10;
        const HAS_INITIALIZER = 1 << 11;
        /// Class/struct typed (not a pointer to one)
        const CLASS = 1 << 12;
        const VOLATILE = 1 << 13;
    }
}

/// One array dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub size: Option<i64>,
    /// Token of the size expression
    pub size_token: Option<TokenId>,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    /// `None` for unnamed arguments
    pub name_token: Option<TokenId>,
    /// Variable id shared by every token that refers to the variable
    pub decl_id: u32,
    pub type_start: Option<TokenId>,
    pub type_end: Option<TokenId>,
    /// Canonical spelling: `int`, `unsigned char`, `std::vector<int>`
    pub type_name: String,
    /// Typedef names that were expanded into the type, outermost first
    pub typedef_chain: Vec<String>,
    pub scope: ScopeId,
    pub flags: VariableFlags,
    pub pointer_depth: u32,
    pub dimensions: Vec<Dimension>,
    /// Position in the argument list for arguments
    pub index: usize,
    pub value_type: Option<ValueType>,
}

impl Variable {
    pub fn is_argument(&self) -> bool {
        self.flags.contains(VariableFlags::ARGUMENT)
    }

    pub fn is_local(&self) -> bool {
        self.flags.contains(VariableFlags::LOCAL)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(VariableFlags::STATIC)
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains(VariableFlags::GLOBAL)
    }

    pub fn is_member(&self) -> bool {
        self.flags.contains(VariableFlags::MEMBER)
    }

    pub fn is_pointer(&self) -> bool {
        self.flags.contains(VariableFlags::POINTER)
    }

    pub fn is_array(&self) -> bool {
        self.flags.contains(VariableFlags::ARRAY)
    }

    pub fn is_reference(&self) -> bool {
        self.flags
            .intersects(VariableFlags::REFERENCE | VariableFlags::RVALUE_REFERENCE)
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(VariableFlags::CONST)
    }

    pub fn is_class(&self) -> bool {
        self.flags.contains(VariableFlags::CLASS)
    }

    pub fn has_initializer(&self) -> bool {
        self.flags.contains(VariableFlags::HAS_INITIALIZER)
    }

    /// Local with automatic storage
    pub fn is_auto_local(&self) -> bool {
        self.is_local() && !self.is_static() && !self.flags.contains(VariableFlags::EXTERN)
    }

    pub fn is_container(&self) -> bool {
        self.value_type.as_ref().is_some_and(|vt| vt.is_container())
    }

    /// Element count of a one-dimensional array with known size
    pub fn array_size(&self) -> Option<i64> {
        match self.dimensions.as_slice() {
            [dim] => dim.size,
            _ => None,
        }
    }
}
