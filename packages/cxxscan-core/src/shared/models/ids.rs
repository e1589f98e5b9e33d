//! Arena handles
//!
//! Every cross-reference between tokens, scopes, variables, functions and
//! types is an index into the owning arena instead of a pointer. Handles are
//! only meaningful for the `TokenList`/`SymbolDatabase` that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(
    /// Slot of a token inside a `TokenList` arena
    TokenId
);
arena_id!(
    /// Index into `SymbolDatabase::scopes`
    ScopeId
);
arena_id!(
    /// Index into `SymbolDatabase::variables`
    VariableId
);
arena_id!(
    /// Index into `SymbolDatabase::functions`
    FunctionId
);
arena_id!(
    /// Index into `SymbolDatabase::types`
    TypeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        let id = TokenId::from_index(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "TokenId#42");
    }
}
