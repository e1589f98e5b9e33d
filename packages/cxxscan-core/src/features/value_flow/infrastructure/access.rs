//! How a variable token is used, and structural questions about blocks

use crate::features::library::Library;
use crate::features::symbol_db::{call_arguments, callee_name, Scope, SymbolDatabase};
use crate::features::tokenizer::TokenList;
use crate::shared::models::TokenId;

/// Use of a variable at one token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    /// Left side of `=`, or stream extraction target
    Write,
    /// `++`, `--`, compound assignment
    ReadWrite,
    AddressOf,
    /// `x.member(...)`; carries the member name token
    MemberCall(TokenId),
    /// Direct argument of a call
    CallArgument { call: TokenId, index: usize },
    /// Inside `sizeof`, `decltype` and friends
    Unevaluated,
}

const UNEVALUATED: [&str; 5] = ["sizeof", "decltype", "typeof", "alignof", "typeid"];

/// Classify the use of the variable token `tok`
pub fn classify_access(list: &TokenList, tok: TokenId) -> Access {
    let mut up = list[tok].ast_parent;
    let mut depth = 0;
    while let Some(p) = up {
        if UNEVALUATED.contains(&list.text(p)) {
            return Access::Unevaluated;
        }
        depth += 1;
        if depth > 64 {
            break;
        }
        up = list[p].ast_parent;
    }

    let Some(parent) = list[tok].ast_parent else {
        return Access::Read;
    };
    let p = &list[parent];
    let is_lhs = p.ast_op1 == Some(tok);
    match p.text.as_str() {
        "=" if is_lhs => return Access::Write,
        _ if p.is_assignment_op() && is_lhs => return Access::ReadWrite,
        "++" | "--" => return Access::ReadWrite,
        "&" if list.is_unary_op(parent, "&") => return Access::AddressOf,
        "." if is_lhs && p.original_name.as_deref() != Some("->") => {
            if let (Some(member), Some(call)) = (p.ast_op2, p.ast_parent) {
                if list.text(call) == "(" && list[call].ast_op1 == Some(parent) && !list[call].is_cast() {
                    return Access::MemberCall(member);
                }
            }
            return Access::Read;
        }
        ">>" if !is_lhs => {
            // `stream >> x`
            let lhs_numeric = p
                .ast_op1
                .and_then(|l| list[l].value_type.as_ref())
                .is_some_and(|vt| vt.is_arithmetic() && vt.pointer == 0);
            if !lhs_numeric {
                return Access::Write;
            }
        }
        _ => {}
    }

    // climb the argument comma chain
    let mut child = tok;
    let mut cur = parent;
    while list.text(cur) == "," {
        child = cur;
        match list[cur].ast_parent {
            Some(up) => cur = up,
            None => return Access::Read,
        }
    }
    if list.text(cur) == "(" && !list[cur].is_cast() && list[cur].ast_op2 == Some(child) {
        if let Some(index) = call_arguments(list, cur).iter().position(|&a| a == tok) {
            return Access::CallArgument { call: cur, index };
        }
    }
    Access::Read
}

/// Operator dereferencing the pointer token `tok`: unary `*`, `p[i]` or
/// `p->m` (stored as `.` with the original `->` spelling)
pub fn dereference_of(list: &TokenList, tok: TokenId) -> Option<TokenId> {
    let parent = list[tok].ast_parent?;
    let p = &list[parent];
    let is_lhs = p.ast_op1 == Some(tok);
    let deref = match p.text.as_str() {
        "*" => list.is_unary_op(parent, "*"),
        "[" => is_lhs,
        "." => is_lhs && p.original_name.as_deref() == Some("->"),
        _ => false,
    };
    deref.then_some(parent)
}

/// The dereference at `deref` is the target of a plain assignment
pub fn is_assigned_through(list: &TokenList, deref: TokenId) -> bool {
    list[deref]
        .ast_parent
        .is_some_and(|eq| list.text(eq) == "=" && list[eq].ast_op1 == Some(deref))
}

/// What a call does with one of its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentUse {
    /// Passed by value or by const reference
    ByValue,
    /// Bound to a non-const reference parameter
    Modified,
    /// Callee unknown; a C++ callee may take a reference
    Unknown,
}

/// How the call at `call` uses its `index`-th argument
pub fn argument_use(list: &TokenList, db: &SymbolDatabase, library: &Library, call: TokenId, index: usize) -> ArgumentUse {
    let Some(name) = callee_name(list, call) else {
        return ArgumentUse::Unknown;
    };
    if let Some(f) = db.function_of(list, name) {
        return match f.arg_list.get(index) {
            Some(&arg) => {
                let param = db.variable(arg);
                if param.is_reference() && !param.is_const() {
                    ArgumentUse::Modified
                } else {
                    ArgumentUse::ByValue
                }
            }
            None => ArgumentUse::ByValue,
        };
    }
    // C library functions take their arguments by value
    if library.is_known_function(list.text(name)) {
        ArgumentUse::ByValue
    } else {
        ArgumentUse::Unknown
    }
}

/// Whether `var_id` may be changed anywhere in `[start, end]`
pub fn is_variable_changed(
    list: &TokenList,
    db: &SymbolDatabase,
    library: &Library,
    start: TokenId,
    end: TokenId,
    var_id: u32,
) -> bool {
    let stop = list.next(end);
    for t in list.range(Some(start), stop) {
        if list[t].var_id != var_id {
            continue;
        }
        match classify_access(list, t) {
            Access::Write | Access::ReadWrite | Access::AddressOf => return true,
            Access::MemberCall(member) if member_call_changes(list, db, library, t, member) => return true,
            Access::CallArgument { call, index } if argument_use(list, db, library, call, index) != ArgumentUse::ByValue => {
                return true
            }
            _ => {}
        }
    }
    false
}

/// Whether `obj.member(...)` may change `obj`; container reads do not
pub fn member_call_changes(list: &TokenList, db: &SymbolDatabase, library: &Library, obj: TokenId, member: TokenId) -> bool {
    let container = db
        .variable_of(list, obj)
        .and_then(|v| v.value_type.as_ref())
        .filter(|vt| vt.is_container())
        .and_then(|vt| library.container(&vt.type_name));
    match container {
        Some(c) => c.yield_of(list.text(member)).is_none(),
        None => true,
    }
}

/// Call to a function that never returns, at its name token
pub fn is_noreturn_call(list: &TokenList, db: &SymbolDatabase, library: &Library, name: TokenId) -> bool {
    if list.str_at(name, 1) != "(" || !list[name].is_identifier() {
        return false;
    }
    match db.function_of(list, name) {
        Some(f) => f.is_noreturn(),
        None => library.is_noreturn(list.text(name)),
    }
}

/// Whether a top-level statement of the block at `open` leaves it for good
/// (`return`, `throw`, `break`, `continue`, `goto`, noreturn call)
pub fn block_escapes(list: &TokenList, db: &SymbolDatabase, library: &Library, open: TokenId) -> bool {
    let Some(close) = list.link(open) else {
        return false;
    };
    let mut at_start = true;
    let mut cur = list.next(open);
    while let Some(t) = cur.filter(|&t| t != close) {
        if at_start
            && (matches!(list.text(t), "return" | "throw" | "break" | "continue" | "goto")
                || is_noreturn_call(list, db, library, t))
        {
            return true;
        }
        match list.text(t) {
            // nested statements are not top-level
            "{" | "(" | "[" => {
                at_start = list.text(t) == "{";
                cur = list.link(t).and_then(|l| list.next(l));
                continue;
            }
            ";" | "}" => at_start = true,
            _ => at_start = false,
        }
        cur = list.next(t);
    }
    false
}

/// Scope whose body opens at `open`
pub fn scope_opened_at<'d>(list: &TokenList, db: &'d SymbolDatabase, open: TokenId) -> Option<&'d Scope> {
    let scope = db.scope(list[open].scope?);
    (scope.body_start == Some(open)).then_some(scope)
}

/// Scope whose body closes at `close`
pub fn scope_closed_at<'d>(list: &TokenList, db: &'d SymbolDatabase, close: TokenId) -> Option<&'d Scope> {
    let scope = db.scope(list[close].scope?);
    (scope.body_end == Some(close)).then_some(scope)
}

/// End of the function body containing `tok`
pub fn function_end(list: &TokenList, db: &SymbolDatabase, tok: TokenId) -> Option<TokenId> {
    let scope = db.enclosing_function_scope(list[tok].scope?)?;
    db.scope(scope).body_end
}

/// `while` of a `do { } while (...)` tail
pub fn is_do_while_tail(list: &TokenList, db: &SymbolDatabase, tok: TokenId) -> bool {
    list.text(tok) == "while"
        && list
            .prev(tok)
            .and_then(|p| scope_closed_at(list, db, p))
            .is_some_and(|s| s.kind == crate::features::symbol_db::ScopeKind::Do)
}

/// The `;` ending the statement whose expression has `root` on top
pub fn statement_semicolon(list: &TokenList, root: TokenId) -> Option<TokenId> {
    let (_, last) = list.expression_range(root);
    list.next(last).filter(|&s| list.text(s) == ";")
}

/// Ordinal for argument positions in messages
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, r) if r != 11 => "st",
        (2, r) if r != 12 => "nd",
        (3, r) if r != 13 => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::features::tokenizer::Tokenizer;

    fn build(code: &str) -> (TokenList, SymbolDatabase) {
        let settings = Settings::default();
        let mut list = Tokenizer::new(&settings).tokenize_str(code, "t.cpp").unwrap().list;
        let library = Library::standard().unwrap();
        let db = SymbolDatabase::build(&mut list, &settings, &library);
        (list, db)
    }

    fn nth(list: &TokenList, text: &str, n: usize) -> TokenId {
        list.iter().filter(|&t| list.text(t) == text).nth(n).unwrap()
    }

    #[test]
    fn test_classify_access() {
        let (list, _) = build("void g(int&); void f() { int a; a = 1; a++; b = a; g(a); s.push(a); &a; sizeof(a); }");
        assert_eq!(classify_access(&list, nth(&list, "a", 1)), Access::Write);
        assert_eq!(classify_access(&list, nth(&list, "a", 2)), Access::ReadWrite);
        assert_eq!(classify_access(&list, nth(&list, "a", 3)), Access::Read);
        assert!(matches!(classify_access(&list, nth(&list, "a", 4)), Access::CallArgument { index: 0, .. }));
        assert!(matches!(classify_access(&list, nth(&list, "a", 5)), Access::CallArgument { index: 0, .. }));
        assert_eq!(classify_access(&list, nth(&list, "a", 6)), Access::AddressOf);
        assert_eq!(classify_access(&list, nth(&list, "a", 7)), Access::Unevaluated);
    }

    #[test]
    fn test_reference_argument_changes_variable() {
        let (list, db) = build("void byref(int &r); void byval(int v); void f() { int a; byval(a); byref(a); }");
        let library = Library::standard().unwrap();
        let a = nth(&list, "a", 1);
        let Access::CallArgument { call, index } = classify_access(&list, a) else {
            panic!("expected call argument");
        };
        assert_eq!(argument_use(&list, &db, &library, call, index), ArgumentUse::ByValue);
        let a2 = nth(&list, "a", 2);
        let Access::CallArgument { call, index } = classify_access(&list, a2) else {
            panic!("expected call argument");
        };
        assert_eq!(argument_use(&list, &db, &library, call, index), ArgumentUse::Modified);
    }

    #[test]
    fn test_block_escapes() {
        let (list, db) = build("void f(int c) { if (c) { g(); return; } if (c) { exit(1); } if (c) { h(); } }");
        let library = Library::standard().unwrap();
        let blocks: Vec<TokenId> = list
            .iter()
            .filter(|&t| list.text(t) == "{")
            .skip(1)
            .collect();
        assert!(block_escapes(&list, &db, &library, blocks[0]));
        assert!(block_escapes(&list, &db, &library, blocks[1]));
        assert!(!block_escapes(&list, &db, &library, blocks[2]));
    }

    #[test]
    fn test_dereference_forms() {
        let (list, _) = build("struct S { int m; }; void f(int *p, S *s) { *p = 1; g(p[2]); g(s->m); g(p); }");
        let first = dereference_of(&list, nth(&list, "p", 1)).unwrap();
        assert!(is_assigned_through(&list, first));
        let index = dereference_of(&list, nth(&list, "p", 2)).unwrap();
        assert!(!is_assigned_through(&list, index));
        assert!(dereference_of(&list, nth(&list, "s", 1)).is_some());
        assert!(dereference_of(&list, nth(&list, "p", 3)).is_none());
    }

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
    }
}
