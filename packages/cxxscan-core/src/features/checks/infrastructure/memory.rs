//! Memory and resource leaks, mismatching deallocation, double free
//!
//! Each function body is scanned once in source order. Local pointers
//! assigned from an allocation are tracked until they are freed or escape
//! (returned, stored elsewhere, handed to an unknown function, address
//! taken); anything still owned at the closing brace leaks.

use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::library::{AllocKind, NEW_ARRAY_GROUP, NEW_GROUP};
use crate::features::symbol_db::{call_arguments, callee_name, Scope};
use crate::features::tokenizer::TokenList;
use crate::features::value_flow::infrastructure::{classify_access, Access};
use crate::shared::models::{Severity, TokenId};
use rustc_hash::FxHashMap;

pub struct MemoryCheck;

#[derive(Debug, Clone, Copy)]
struct Allocation {
    token: TokenId,
    group: u32,
    kind: AllocKind,
}

#[derive(Debug)]
struct Owned {
    name: String,
    alloc: Allocation,
    freed: Option<TokenId>,
    escaped: bool,
}

fn leak_message(kind: AllocKind, name: &str) -> (&'static str, String, u16) {
    match kind {
        AllocKind::Memory => ("memleak", format!("$symbol:{}\nMemory leak: $symbol", name), cwe::MEMLEAK),
        AllocKind::Resource => (
            "resourceLeak",
            format!("$symbol:{}\nResource leak: $symbol", name),
            cwe::RESOURCE_LEAK,
        ),
    }
}

fn mismatch_message(name: &str) -> String {
    format!("$symbol:{}\nMismatching allocation and deallocation: $symbol", name)
}

fn double_free_message(name: &str) -> String {
    format!("$symbol:{}\nMemory pointed to by '$symbol' is freed twice.", name)
}

/// Strip C-style casts
fn uncast(list: &TokenList, mut tok: TokenId) -> TokenId {
    while list[tok].is_cast() {
        match list[tok].ast_op1 {
            Some(inner) => tok = inner,
            None => break,
        }
    }
    tok
}

impl MemoryCheck {
    fn allocation(ctx: &CheckContext<'_>, rhs: TokenId) -> Option<Allocation> {
        let list = ctx.list;
        let rhs = uncast(list, rhs);
        if list.text(rhs) == "new" {
            let array = list[rhs].ast_op1.is_some_and(|op| list.text(op) == "[");
            let group = if array { NEW_ARRAY_GROUP } else { NEW_GROUP };
            return Some(Allocation {
                token: rhs,
                group,
                kind: AllocKind::Memory,
            });
        }
        let name = callee_name(list, rhs)?;
        let alloc = ctx.library.alloc(list.text(name))?;
        Some(Allocation {
            token: rhs,
            group: alloc.group,
            kind: alloc.kind,
        })
    }

    /// Deallocations at `tok`: the freed variable token and its group
    fn deallocation(ctx: &CheckContext<'_>, tok: TokenId) -> Option<(TokenId, u32)> {
        let list = ctx.list;
        if list.text(tok) == "delete" {
            let operand = list[tok].ast_op1?;
            let group = if list.str_at(tok, 1) == "[" {
                NEW_ARRAY_GROUP
            } else {
                NEW_GROUP
            };
            return Some((operand, group));
        }
        let name = callee_name(list, tok)?;
        let dealloc = ctx.library.dealloc(list.text(name))?;
        let index = dealloc.arg.saturating_sub(1);
        let arg = call_arguments(list, tok).get(index).copied()?;
        Some((uncast(list, arg), dealloc.group))
    }

    fn is_unknown_call(ctx: &CheckContext<'_>, call: TokenId) -> bool {
        let list = ctx.list;
        !callee_name(list, call).is_some_and(|n| ctx.library.is_known_function(list.text(n)))
    }

    /// Whether the use of a tracked pointer at `tok` lets it escape
    fn escapes(ctx: &CheckContext<'_>, tok: TokenId) -> bool {
        let list = ctx.list;
        if list.text(list.ast_top(tok)) == "return" {
            return true;
        }
        match classify_access(list, tok) {
            Access::AddressOf => true,
            Access::CallArgument { call, .. } => Self::is_unknown_call(ctx, call),
            Access::Read => {
                // stored elsewhere: `q = p`, `q = p + 1`, `take((void *)p)`
                let mut cur = tok;
                while let Some(parent) = list[cur].ast_parent {
                    let p = &list[parent];
                    if p.is_assignment_op() {
                        return p.ast_op2 == Some(cur);
                    }
                    if p.text == "(" && !p.is_cast() {
                        return p.ast_op2 == Some(cur) && Self::is_unknown_call(ctx, parent);
                    }
                    let dereferenced = matches!(p.text.as_str(), "[" | ".") || list.is_unary_op(parent, "*");
                    if dereferenced || p.is_comparison_op() || p.text == "!" {
                        return false;
                    }
                    cur = parent;
                }
                false
            }
            _ => false,
        }
    }

    fn check_scope(&self, ctx: &CheckContext<'_>, scope: &Scope, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        let (Some(start), Some(end)) = (scope.body_start, scope.body_end) else {
            return;
        };
        let mut owned: FxHashMap<u32, Owned> = FxHashMap::default();

        for t in list.range(list.next(start), Some(end)) {
            // deallocation
            if let Some((freed, group)) = Self::deallocation(ctx, t) {
                if let Some(entry) = owned.get_mut(&list[freed].var_id) {
                    if let Some(first) = entry.freed {
                        if list[first].scope == list[t].scope {
                            reporter.report(
                                Diagnostic::new("doubleFree", Severity::Error, double_free_message(&entry.name))
                                    .path(vec![(first, String::new())])
                                    .at(t)
                                    .cwe(cwe::DOUBLE_FREE),
                            );
                        }
                    } else if entry.alloc.group != group {
                        reporter.report(
                            Diagnostic::new("mismatchAllocDealloc", Severity::Error, mismatch_message(&entry.name))
                                .path(vec![(entry.alloc.token, String::new())])
                                .at(t)
                                .cwe(cwe::MISMATCH_ALLOC),
                        );
                    }
                    entry.freed = Some(t);
                }
                continue;
            }

            let var_id = list[t].var_id;
            if var_id == 0 {
                continue;
            }

            // (re)assignment of a local pointer
            if list.is_assignment_lhs(t) {
                let Some(eq) = list[t].ast_parent else { continue };
                if list.text(eq) != "=" {
                    continue;
                }
                let local = ctx
                    .db
                    .variable_of(list, t)
                    .is_some_and(|v| v.is_auto_local() && v.is_pointer() && !v.is_array());
                let alloc = list[eq].ast_op2.and_then(|rhs| Self::allocation(ctx, rhs));
                match alloc {
                    Some(alloc) if local => {
                        let name = list.text(t).to_string();
                        owned.insert(
                            var_id,
                            Owned {
                                name,
                                alloc,
                                freed: None,
                                escaped: false,
                            },
                        );
                    }
                    _ => {
                        owned.remove(&var_id);
                    }
                }
                continue;
            }

            if let Some(entry) = owned.get_mut(&var_id) {
                if Self::is_freeing_argument(ctx, t) {
                    continue;
                }
                if Self::escapes(ctx, t) {
                    entry.escaped = true;
                }
            }
        }

        let mut leaks: Vec<&Owned> = owned.values().filter(|o| o.freed.is_none() && !o.escaped).collect();
        leaks.sort_by_key(|o| (list[o.alloc.token].line, list[o.alloc.token].column));
        for leak in leaks {
            let (id, message, cwe) = leak_message(leak.alloc.kind, &leak.name);
            reporter.report(Diagnostic::new(id, Severity::Error, message).at(end).cwe(cwe));
        }
    }

    /// `tok` is the argument of a deallocation (handled at the call)
    fn is_freeing_argument(ctx: &CheckContext<'_>, tok: TokenId) -> bool {
        let list = ctx.list;
        let mut cur = tok;
        while let Some(parent) = list[cur].ast_parent {
            if Self::deallocation(ctx, parent).is_some_and(|(freed, _)| freed == tok) {
                return true;
            }
            if !(list[parent].is_cast() || list.text(parent) == ",") {
                return list.text(parent) == "delete";
            }
            cur = parent;
        }
        false
    }
}

impl Check for MemoryCheck {
    fn name(&self) -> &'static str {
        "Memory"
    }

    fn class_info(&self) -> &'static str {
        "Memory leaks\n\
         - memory and resource leaks of local pointers\n\
         - mismatching allocation and deallocation\n\
         - deallocating memory twice"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        for scope in ctx.db.function_scopes() {
            self.check_scope(ctx, scope, reporter);
        }
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        for kind in [AllocKind::Memory, AllocKind::Resource] {
            let (id, message, cwe) = leak_message(kind, "varname");
            reporter.report(Diagnostic::new(id, Severity::Error, message).cwe(cwe));
        }
        reporter.report(
            Diagnostic::new("mismatchAllocDealloc", Severity::Error, mismatch_message("varname"))
                .cwe(cwe::MISMATCH_ALLOC),
        );
        reporter.report(Diagnostic::new("doubleFree", Severity::Error, double_free_message("varname")).cwe(cwe::DOUBLE_FREE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::checks::infrastructure::testing::{check_code, messages};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mismatch_new_array_delete() {
        let logger = check_code(&MemoryCheck, "void f() { int *p = new int[10]; delete p; }");
        assert_eq!(
            messages(&logger, "mismatchAllocDealloc"),
            vec!["Mismatching allocation and deallocation: p"]
        );
        let msg = &logger.errors[0];
        assert_eq!(msg.cwe, Some(762));
        assert_eq!(msg.call_stack.len(), 2);
        assert!(logger.with_id("memleak").is_empty());
    }

    #[test]
    fn test_matching_pairs_are_silent() {
        let code = "void f() { int *a = new int[3]; delete [] a; char *b = (char *)malloc(4); free(b); int *c = new int; delete c; }";
        assert!(check_code(&MemoryCheck, code).errors.is_empty());
    }

    #[test]
    fn test_malloc_delete_mismatch() {
        let logger = check_code(&MemoryCheck, "void f() { char *p = malloc(10); delete p; }");
        assert_eq!(logger.ids(), vec!["mismatchAllocDealloc"]);
    }

    #[test]
    fn test_leak_at_end_of_function() {
        let logger = check_code(&MemoryCheck, "void f() {\n char *p = malloc(10);\n p[0] = 1;\n}");
        assert_eq!(messages(&logger, "memleak"), vec!["Memory leak: p"]);
        assert_eq!(logger.errors[0].location().map(|l| l.line), Some(4));
    }

    #[test]
    fn test_resource_leak() {
        let logger = check_code(&MemoryCheck, "void f() { FILE *fp = fopen(\"a\", \"r\"); }");
        assert_eq!(messages(&logger, "resourceLeak"), vec!["Resource leak: fp"]);
    }

    #[test]
    fn test_escapes_are_not_leaks() {
        let code = "char *g; void take(char *q); \
                    char *a() { char *p = malloc(1); return p; } \
                    void b() { char *p = malloc(1); g = p; } \
                    void c() { char *p = malloc(1); take(p); }";
        assert!(check_code(&MemoryCheck, code).errors.is_empty());
    }

    #[test]
    fn test_double_free() {
        let logger = check_code(&MemoryCheck, "void f() { char *p = malloc(1); free(p); free(p); }");
        assert_eq!(messages(&logger, "doubleFree"), vec!["Memory pointed to by 'p' is freed twice."]);
    }

    #[test]
    fn test_free_in_both_branches_is_not_double() {
        let code = "void f(int c) { char *p = malloc(1); if (c) { free(p); } else { free(p); } }";
        assert!(check_code(&MemoryCheck, code).errors.is_empty());
    }
}
