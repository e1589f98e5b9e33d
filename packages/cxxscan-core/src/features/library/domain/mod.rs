//! Library model: what the analyzer knows about external functions and
//! container types

use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Allocation group of `new` / `delete`
pub const NEW_GROUP: u32 = 1;
/// Allocation group of `new[]` / `delete[]`
pub const NEW_ARRAY_GROUP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocKind {
    Memory,
    /// File handles and similar
    Resource,
}

/// Allocation or deallocation function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocFunc {
    /// Allocations must be released by a function of the same group
    pub group: u32,
    pub kind: AllocKind,
    /// 1-based argument holding the released pointer
    pub arg: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    Printf,
    Scanf,
}

/// Required size of a buffer argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinSize {
    /// At least the value of another argument (1-based)
    ArgValue(usize),
    /// At least `strlen` of another argument plus the terminator
    StrLen(usize),
    /// Fixed number of bytes
    Bytes(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgInfo {
    pub not_null: bool,
    pub not_uninit: bool,
    pub min_size: Option<MinSize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionInfo {
    /// No side effects on arguments or globals
    pub pure: bool,
    pub noreturn: bool,
    /// 1-based argument index → constraints
    pub args: FxHashMap<usize, ArgInfo>,
    pub format: Option<FormatKind>,
    /// 1-based index of the format string argument
    pub format_arg: usize,
}

/// Container member that changes the size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerAction {
    Push,
    Pop,
    Clear,
    Resize,
    Insert,
    Erase,
}

/// Container member that reads state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerYield {
    Size,
    Empty,
    /// Element access by index (`at`, `operator[]`)
    At,
    Front,
    Back,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub actions: FxHashMap<String, ContainerAction>,
    pub yields: FxHashMap<String, ContainerYield>,
    /// `operator[]` takes an index
    pub indexable: bool,
    pub string_like: bool,
}

impl ContainerInfo {
    pub fn action(&self, member: &str) -> Option<ContainerAction> {
        self.actions.get(member).copied()
    }

    pub fn yield_of(&self, member: &str) -> Option<ContainerYield> {
        self.yields.get(member).copied()
    }
}

/// Knowledge about the standard library and user libraries
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub(crate) allocs: FxHashMap<String, AllocFunc>,
    pub(crate) deallocs: FxHashMap<String, AllocFunc>,
    pub(crate) functions: FxHashMap<String, FunctionInfo>,
    /// Keyed by the qualified type name (`std::vector`)
    pub(crate) containers: FxHashMap<String, ContainerInfo>,
    pub(crate) next_group: u32,
}

impl Library {
    /// Library that only knows `new`/`delete`
    pub fn empty() -> Self {
        Self {
            next_group: NEW_ARRAY_GROUP + 1,
            ..Default::default()
        }
    }

    /// Reserve a fresh allocation group id
    pub(crate) fn allocate_group(&mut self) -> u32 {
        let group = self.next_group.max(NEW_ARRAY_GROUP + 1);
        self.next_group = group + 1;
        group
    }

    pub fn alloc(&self, name: &str) -> Option<&AllocFunc> {
        self.allocs.get(name)
    }

    pub fn dealloc(&self, name: &str) -> Option<&AllocFunc> {
        self.deallocs.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    pub fn is_pure(&self, name: &str) -> bool {
        self.function(name).is_some_and(|f| f.pure)
    }

    pub fn is_noreturn(&self, name: &str) -> bool {
        self.function(name).is_some_and(|f| f.noreturn)
    }

    fn arg(&self, name: &str, arg: usize) -> Option<&ArgInfo> {
        self.function(name)?.args.get(&arg)
    }

    pub fn is_not_null_arg(&self, name: &str, arg: usize) -> bool {
        self.arg(name, arg).is_some_and(|a| a.not_null)
    }

    pub fn is_not_uninit_arg(&self, name: &str, arg: usize) -> bool {
        self.arg(name, arg).is_some_and(|a| a.not_uninit)
    }

    pub fn min_size(&self, name: &str, arg: usize) -> Option<MinSize> {
        self.arg(name, arg)?.min_size
    }

    /// Format kind and 1-based format argument index
    pub fn format_string(&self, name: &str) -> Option<(FormatKind, usize)> {
        let f = self.function(name)?;
        f.format.map(|kind| (kind, f.format_arg))
    }

    /// Container definition for a type name, with or without `std::`
    pub fn container(&self, type_name: &str) -> Option<&ContainerInfo> {
        self.containers
            .get(type_name)
            .or_else(|| self.containers.get(&format!("std::{}", type_name)))
    }

    pub fn is_known_function(&self, name: &str) -> bool {
        self.functions.contains_key(name) || self.allocs.contains_key(name) || self.deallocs.contains_key(name)
    }

    /// Add the definitions of `other`; later definitions win. Allocation
    /// groups of `other` are renumbered so they never collide.
    pub fn merge(&mut self, other: Library) {
        let mut renumber: FxHashMap<u32, u32> = FxHashMap::default();
        let mut map_group = |lib: &mut Library, group: u32| -> u32 {
            if group <= NEW_ARRAY_GROUP {
                return group;
            }
            *renumber.entry(group).or_insert_with(|| lib.allocate_group())
        };
        for (name, mut f) in other.allocs {
            f.group = map_group(self, f.group);
            self.allocs.insert(name, f);
        }
        for (name, mut f) in other.deallocs {
            f.group = map_group(self, f.group);
            self.deallocs.insert(name, f);
        }
        self.functions.extend(other.functions);
        self.containers.extend(other.containers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib_with_group(alloc: &str, dealloc: &str) -> Library {
        let mut lib = Library::empty();
        let group = lib.allocate_group();
        let f = AllocFunc {
            group,
            kind: AllocKind::Memory,
            arg: 1,
        };
        lib.allocs.insert(alloc.into(), f.clone());
        lib.deallocs.insert(dealloc.into(), f);
        lib
    }

    #[test]
    fn test_merge_renumbers_groups() {
        let mut a = lib_with_group("malloc", "free");
        let b = lib_with_group("my_alloc", "my_free");
        a.merge(b);
        assert_ne!(a.alloc("malloc").unwrap().group, a.alloc("my_alloc").unwrap().group);
        assert_eq!(a.alloc("my_alloc").unwrap().group, a.dealloc("my_free").unwrap().group);
    }

    #[test]
    fn test_container_lookup_without_namespace() {
        let mut lib = Library::empty();
        lib.containers.insert("std::vector".into(), ContainerInfo::default());
        assert!(lib.container("vector").is_some());
        assert!(lib.container("std::vector").is_some());
        assert!(lib.container("Foo").is_none());
    }
}
