//! Token list simplification
//!
//! Canonicalizing rewrites applied after bracket linking, in a fixed order.
//! Every pass returns whether it changed the list and is a no-op on its own
//! output, so the driver can repeat the sequence until nothing changes.
//! Bracket links are kept consistent by every pass.

use super::pattern::matches;
use crate::config::{Platform, PrimitiveType};
use crate::features::tokenizer::domain::{string_literal_value, TokenFlags, TokenKind, TokenList};
use crate::shared::models::TokenId;
use rustc_hash::FxHashMap;
use tracing::debug;

const IGNORABLE_KEYWORDS: [&str; 6] = ["register", "inline", "__inline", "__restrict", "restrict", "__forceinline"];

/// Max nesting followed when looking for the end of a statement
const MAX_STATEMENT_DEPTH: usize = 256;

/// Outcome of the simplification driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimplifyReport {
    pub rounds: usize,
    /// Stopped because the round limit was hit while passes still changed
    pub bounded: bool,
}

/// Run all passes until a fixed point or `max_rounds`
pub fn simplify(list: &mut TokenList, platform: &Platform, max_rounds: Option<usize>) -> SimplifyReport {
    let mut report = SimplifyReport::default();
    loop {
        if max_rounds.is_some_and(|max| report.rounds >= max) {
            report.bounded = true;
            debug!(rounds = report.rounds, "simplification round limit reached");
            break;
        }
        report.rounds += 1;
        if !simplify_round(list, platform) {
            break;
        }
    }
    report
}

/// One application of every pass in order
pub fn simplify_round(list: &mut TokenList, platform: &Platform) -> bool {
    let mut changed = false;
    changed |= remove_extern_c_and_ignorable(list);
    changed |= normalize_integer_types(list);
    changed |= expand_typedefs(list);
    changed |= simplify_sizeof(list, platform);
    changed |= rewrite_arrow(list);
    changed |= rewrite_pointer_arithmetic_deref(list);
    changed |= remove_redundant_parentheses(list);
    changed |= insert_braces(list);
    changed |= split_declarations(list);
    changed
}

// ═══════════════════════════════════════════════════════════════════════════
// 1. extern "C" and ignorable keywords
// ═══════════════════════════════════════════════════════════════════════════

pub fn remove_extern_c_and_ignorable(list: &mut TokenList) -> bool {
    let mut changed = false;
    let mut cur = list.front();
    while let Some(t) = cur {
        cur = list.next(t);
        if IGNORABLE_KEYWORDS.contains(&list.text(t)) {
            list.delete(t);
            changed = true;
            continue;
        }
        if list.text(t) != "extern" || list.str_at(t, 1) != "\"C\"" {
            continue;
        }
        let Some(lang) = list.next(t) else { continue };
        let after = list.next(lang);
        if list.str_of(after) == "{" {
            if let Some(open) = after {
                if let Some(close) = list.link(open) {
                    cur = list.next(open);
                    list.delete(close);
                    list.delete(open);
                }
            }
        } else {
            cur = after;
        }
        list.delete(lang);
        list.delete(t);
        changed = true;
    }
    changed
}

// ═══════════════════════════════════════════════════════════════════════════
// 2. Integer type spelling
// ═══════════════════════════════════════════════════════════════════════════

fn is_int_type_word(text: &str) -> bool {
    matches!(text, "char" | "short" | "int" | "long" | "double")
}

pub fn normalize_integer_types(list: &mut TokenList) -> bool {
    let mut changed = false;
    let mut cur = list.front();
    while let Some(t) = cur {
        let next = list.next(t);
        let text = list.text(t).to_string();
        let next_text = list.str_of(next).to_string();

        // `unsigned int` / `signed char` / bare `unsigned`
        if text == "unsigned" || text == "signed" {
            let flag = if text == "unsigned" { TokenFlags::UNSIGNED } else { TokenFlags::SIGNED };
            match next {
                Some(n) if matches!(next_text.as_str(), "char" | "short" | "int" | "long") => {
                    let carried = list[t].flags - TokenFlags::STANDARD_TYPE;
                    list[n].flags |= flag | carried;
                    list.delete(t);
                    cur = Some(n);
                }
                _ => {
                    list.set_text(t, "int");
                    list[t].flags |= flag;
                }
            }
            changed = true;
            continue;
        }

        // `long unsigned`, `int unsigned`
        if is_int_type_word(&text) && (next_text == "unsigned" || next_text == "signed") {
            if let Some(n) = next {
                let flag = if next_text == "unsigned" { TokenFlags::UNSIGNED } else { TokenFlags::SIGNED };
                list[t].flags |= flag;
                list.delete(n);
                changed = true;
                continue;
            }
        }

        match (text.as_str(), next_text.as_str(), next) {
            ("long", "long", Some(n)) => {
                let carried = list[n].flags - TokenFlags::STANDARD_TYPE;
                list[t].flags |= TokenFlags::LONG | carried;
                list.delete(n);
                changed = true;
                continue;
            }
            ("long" | "short", "int", Some(n)) => {
                let carried = list[n].flags - TokenFlags::STANDARD_TYPE;
                list[t].flags |= carried;
                list.delete(n);
                changed = true;
                continue;
            }
            ("long", "double", Some(n)) => {
                let carried = list[t].flags - TokenFlags::STANDARD_TYPE;
                list[n].flags |= TokenFlags::LONG | carried;
                list.delete(t);
                cur = Some(n);
                changed = true;
                continue;
            }
            _ => {}
        }
        cur = next;
    }
    changed
}

// ═══════════════════════════════════════════════════════════════════════════
// 3. Trivial typedefs
// ═══════════════════════════════════════════════════════════════════════════

/// Token copy recorded from a typedef body
#[derive(Debug, Clone)]
struct TypeToken {
    text: String,
    flags: TokenFlags,
}

/// `typedef <type> NAME;` where the type has no brackets
fn parse_trivial_typedef(list: &TokenList, typedef_tok: TokenId) -> Option<(String, Vec<TypeToken>, TokenId)> {
    let mut body = Vec::new();
    let mut cur = list.next(typedef_tok);
    while let Some(t) = cur {
        let tok = &list[t];
        if tok.text == ";" {
            break;
        }
        let allowed = tok.is_name() || matches!(tok.text.as_str(), "*" | "::");
        if !allowed || tok.link.is_some() {
            return None;
        }
        body.push(t);
        cur = list.next(t);
    }
    let semi = cur?;
    let (name_tok, type_toks) = body.split_last()?;
    if type_toks.is_empty() || !list[*name_tok].is_identifier() {
        return None;
    }
    let name = list.text(*name_tok).to_string();
    let type_tokens = type_toks
        .iter()
        .map(|&t| TypeToken {
            text: list.text(t).to_string(),
            flags: list[t].flags,
        })
        .collect::<Vec<_>>();
    Some((name, type_tokens, semi))
}

pub fn expand_typedefs(list: &mut TokenList) -> bool {
    let mut typedefs: FxHashMap<String, Vec<TypeToken>> = FxHashMap::default();
    let mut changed = false;
    let mut cur = list.front();
    while let Some(t) = cur {
        cur = list.next(t);
        if list.text(t) == "typedef" {
            if let Some((name, body, semi)) = parse_trivial_typedef(list, t) {
                cur = list.next(semi);
                list.delete_range(t, semi);
                changed = true;
                // `typedef struct S S;` leaves uses alone
                if !body.iter().any(|b| b.text == name) {
                    typedefs.insert(name, body);
                }
            }
            continue;
        }
        if typedefs.is_empty() || !list[t].is_identifier() {
            continue;
        }
        let Some(body) = typedefs.get(list.text(t)) else { continue };
        let prev_text = list.prev(t).map(|p| list.text(p)).unwrap_or("");
        if matches!(prev_text, "." | "::" | "->") || list.str_at(t, 1) == "::" {
            continue;
        }
        let body = body.clone();
        let name = list.text(t).to_string();
        let Some((first, rest)) = body.split_first() else { continue };
        list.set_text(t, &first.text);
        list[t].flags = first.flags | TokenFlags::EXPANDED_TYPEDEF;
        list[t].original_name = Some(name.clone());
        let mut last = t;
        for tt in rest {
            last = list.insert_after(last, &tt.text);
            list[last].flags = tt.flags | TokenFlags::EXPANDED_TYPEDEF;
            list[last].original_name = Some(name.clone());
        }
        cur = list.next(last);
        changed = true;
    }
    changed
}

// ═══════════════════════════════════════════════════════════════════════════
// 4. sizeof
// ═══════════════════════════════════════════════════════════════════════════

fn primitive_of(list: &TokenList, t: TokenId) -> Option<PrimitiveType> {
    let tok = &list[t];
    Some(match tok.text.as_str() {
        "char" => PrimitiveType::Char,
        "bool" | "_Bool" => PrimitiveType::Bool,
        "short" => PrimitiveType::Short,
        "int" => PrimitiveType::Int,
        "long" if tok.is_long() => PrimitiveType::LongLong,
        "long" => PrimitiveType::Long,
        "float" => PrimitiveType::Float,
        "double" if tok.is_long() => PrimitiveType::LongDouble,
        "double" => PrimitiveType::Double,
        "wchar_t" => PrimitiveType::WChar,
        "size_t" => PrimitiveType::SizeT,
        _ => return None,
    })
}

/// Storage size of a string literal including the terminator
fn string_literal_size(text: &str, platform: &Platform) -> Option<u32> {
    let value = string_literal_value(text)?;
    let quote = text.find('"')?;
    let prefix = text[..quote].trim_end_matches('R');
    let chars = value.chars().count() as u32 + 1;
    Some(match prefix {
        "L" => chars * platform.sizeof_wchar_t,
        "u" => chars * 2,
        "U" => chars * 4,
        _ => value.len() as u32 + 1,
    })
}

/// Size of the `sizeof` operand between `open` and `close`
fn sizeof_operand_size(list: &TokenList, open: TokenId, close: TokenId, platform: &Platform) -> Option<u32> {
    let first = list.next(open)?;
    if first == close {
        return None;
    }
    let inner: Vec<TokenId> = list.range(Some(first), Some(close)).collect();
    match inner.as_slice() {
        [only] if list[*only].kind == TokenKind::String => string_literal_size(list.text(*only), platform),
        [only] => primitive_of(list, *only).map(|p| platform.size_of(p)),
        [ty, stars @ ..]
            if (list[*ty].is_identifier() || list[*ty].is_standard_type())
                && stars.iter().all(|&s| list.text(s) == "*") =>
        {
            Some(platform.sizeof_pointer)
        }
        _ => None,
    }
}

pub fn simplify_sizeof(list: &mut TokenList, platform: &Platform) -> bool {
    let mut changed = false;
    let mut cur = list.front();
    while let Some(t) = cur {
        cur = list.next(t);
        if list.text(t) != "sizeof" {
            continue;
        }
        let Some(next) = list.next(t) else { continue };
        if list[next].kind == TokenKind::String {
            if let Some(size) = string_literal_size(list.text(next), platform) {
                cur = list.next(next);
                list.delete(next);
                list.set_text(t, &size.to_string());
                changed = true;
            }
            continue;
        }
        if list.text(next) != "(" {
            continue;
        }
        let Some(close) = list.link(next) else { continue };
        if let Some(size) = sizeof_operand_size(list, next, close, platform) {
            cur = list.next(close);
            list.delete_range(next, close);
            list.set_text(t, &size.to_string());
            changed = true;
        }
    }
    changed
}

// ═══════════════════════════════════════════════════════════════════════════
// 5. `->` → `.`
// ═══════════════════════════════════════════════════════════════════════════

pub fn rewrite_arrow(list: &mut TokenList) -> bool {
    let arrows: Vec<TokenId> = list.iter().filter(|&t| list.text(t) == "->").collect();
    for &t in &arrows {
        list.set_text(t, ".");
        list[t].original_name = Some("->".to_string());
    }
    !arrows.is_empty()
}

// ═══════════════════════════════════════════════════════════════════════════
// 6. `*(a + i)` → `a[i]`
// ═══════════════════════════════════════════════════════════════════════════

fn is_unary_position(list: &TokenList, t: TokenId) -> bool {
    match list.prev(t) {
        None => true,
        Some(p) => {
            let prev = &list[p];
            !(prev.is_identifier() || prev.is_literal() || matches!(prev.text.as_str(), ")" | "]"))
        }
    }
}

pub fn rewrite_pointer_arithmetic_deref(list: &mut TokenList) -> bool {
    let mut changed = false;
    let mut cur = list.front();
    while let Some(t) = cur {
        cur = list.next(t);
        if list.text(t) != "*" || !is_unary_position(list, t) {
            continue;
        }
        let open = list.next(t);
        if !matches(list, open, "( %name% + %name%|%num% )") {
            continue;
        }
        let Some(open) = open else { continue };
        let (Some(plus), Some(close)) = (list.tok_at(open, 2), list.tok_at(open, 4)) else {
            continue;
        };
        if list.link(open) != Some(close) {
            continue;
        }
        list.delete(t);
        list.delete(open);
        list.set_text(plus, "[");
        list.set_text(close, "]");
        list.create_link(plus, close);
        changed = true;
    }
    changed
}

// ═══════════════════════════════════════════════════════════════════════════
// 7. Redundant parentheses
// ═══════════════════════════════════════════════════════════════════════════

fn has_top_level_comma(list: &TokenList, open: TokenId, close: TokenId) -> bool {
    let mut cur = list.next(open);
    while let Some(t) = cur {
        if t == close {
            return false;
        }
        if list.text(t) == "," {
            return true;
        }
        cur = match list.link(t) {
            Some(l) if list[t].is_opening_bracket() => list.next(l),
            _ => list.next(t),
        };
    }
    false
}

pub fn remove_redundant_parentheses(list: &mut TokenList) -> bool {
    let mut changed = false;
    let mut cur = list.front();
    while let Some(t) = cur {
        cur = list.next(t);
        if list.text(t) != "(" {
            continue;
        }
        let Some(close) = list.link(t) else { continue };
        if list.next(t) == Some(close) || has_top_level_comma(list, t, close) {
            continue;
        }
        let prev = list.prev(t).map(|p| list.text(p).to_string()).unwrap_or_default();
        let after = list.next(close).map(|n| list.text(n).to_string()).unwrap_or_default();

        // `( ( x ) )`: inner pair spans the whole outer pair
        let outer_wraps = prev == "("
            && list.prev(t).and_then(|p| list.link(p)) == list.next(close);
        // `return ( x ) ;` and `= ( x ) ;`
        let statement_wraps = (prev == "return" || prev == "=") && after == ";";

        if outer_wraps || statement_wraps {
            list.delete(t);
            list.delete(close);
            changed = true;
        }
    }
    changed
}

// ═══════════════════════════════════════════════════════════════════════════
// 8. Braces around control statement bodies
// ═══════════════════════════════════════════════════════════════════════════

/// Last token of the statement starting at `start`
pub fn statement_end(list: &TokenList, start: TokenId) -> Option<TokenId> {
    statement_end_depth(list, start, 0)
}

fn statement_end_depth(list: &TokenList, start: TokenId, depth: usize) -> Option<TokenId> {
    if depth > MAX_STATEMENT_DEPTH {
        return None;
    }
    match list.text(start) {
        "{" => list.link(start),
        "if" | "for" | "while" | "switch" => {
            let open = list.next(start).filter(|&o| list.text(o) == "(")?;
            let body = list.next(list.link(open)?)?;
            let end = statement_end_depth(list, body, depth + 1)?;
            if list.text(start) == "if" && list.str_at(end, 1) == "else" {
                let else_tok = list.next(end)?;
                return statement_end_depth(list, list.next(else_tok)?, depth + 1);
            }
            Some(end)
        }
        "do" => {
            let body_end = statement_end_depth(list, list.next(start)?, depth + 1)?;
            let while_tok = list.next(body_end).filter(|&w| list.text(w) == "while")?;
            let open = list.next(while_tok).filter(|&o| list.text(o) == "(")?;
            list.next(list.link(open)?).filter(|&s| list.text(s) == ";")
        }
        _ => {
            let mut cur = Some(start);
            while let Some(t) = cur {
                match list.text(t) {
                    ";" => return Some(t),
                    "}" | ")" | "]" => return None,
                    "(" | "[" | "{" => cur = list.next(list.link(t)?),
                    _ => cur = list.next(t),
                }
            }
            None
        }
    }
}

fn wrap_in_braces(list: &mut TokenList, first: TokenId) -> bool {
    let Some(end) = statement_end(list, first) else {
        return false;
    };
    let open = list.insert_before(first, "{");
    let close = list.insert_after(end, "}");
    list.create_link(open, close);
    true
}

/// `while` closing a `do { } while (...)`
fn is_do_while_tail(list: &TokenList, while_tok: TokenId) -> bool {
    let Some(prev) = list.prev(while_tok) else {
        return false;
    };
    list.text(prev) == "}"
        && list
            .link(prev)
            .and_then(|open| list.prev(open))
            .is_some_and(|p| list.text(p) == "do")
}

pub fn insert_braces(list: &mut TokenList) -> bool {
    let mut changed = false;
    let mut cur = list.front();
    while let Some(t) = cur {
        cur = list.next(t);
        let body = match list.text(t) {
            "if" | "for" | "while" | "switch" => {
                if list.text(t) == "while" && is_do_while_tail(list, t) {
                    continue;
                }
                let Some(open) = list.next(t).filter(|&o| list.text(o) == "(") else {
                    continue;
                };
                list.link(open).and_then(|close| list.next(close))
            }
            "else" | "do" => list.next(t),
            _ => continue,
        };
        let Some(body) = body else { continue };
        if list.text(body) == "{" {
            continue;
        }
        changed |= wrap_in_braces(list, body);
    }
    changed
}

// ═══════════════════════════════════════════════════════════════════════════
// 9. Compound declarations
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Declarator {
    name: TokenId,
    eq: Option<TokenId>,
    is_array: bool,
    /// `,` or `;` ending the declarator
    separator: TokenId,
}

#[derive(Debug)]
struct Declaration {
    type_start: TokenId,
    type_end: TokenId,
    is_auto: bool,
    declarators: Vec<Declarator>,
}

fn is_statement_start(list: &TokenList, t: TokenId) -> bool {
    match list.prev(t) {
        None => true,
        Some(p) => matches!(list.text(p), ";" | "{" | "}"),
    }
}

/// `{` whose body holds statements (not a class body or an initializer)
fn is_code_block(list: &TokenList, open: TokenId) -> bool {
    let Some(prev) = list.prev(open) else {
        return true;
    };
    match list.text(prev) {
        ")" | "{" | "}" | ";" | "else" | "do" | "try" | "const" | "override" | "noexcept" | "final"
        | "mutable" | "namespace" => true,
        _ => {
            list.prev(prev).is_some_and(|pp| list.text(pp) == "namespace")
                && list[prev].is_identifier()
        }
    }
}

fn parse_declaration(list: &TokenList, start: TokenId) -> Option<Declaration> {
    let mut t = start;
    while matches!(list.text(t), "const" | "volatile") {
        t = list.next(t)?;
    }
    let is_auto = list.text(t) == "auto";
    if matches!(list.text(t), "struct" | "class" | "union" | "enum") {
        t = list.next(t)?;
        if !list[t].is_identifier() {
            return None;
        }
        t = list.next(t)?;
    } else if list[t].is_standard_type() || is_auto {
        t = list.next(t)?;
    } else if list[t].is_identifier() {
        t = list.next(t)?;
        loop {
            if list.text(t) == "::" && list.next(t).is_some_and(|n| list[n].is_identifier()) {
                t = list.tok_at(t, 2)?;
            } else if list.text(t) == "<" && list.link(t).is_some() {
                t = list.next(list.link(t)?)?;
            } else {
                break;
            }
        }
    } else {
        return None;
    }
    while list.text(t) == "const" {
        t = list.next(t)?;
    }
    let type_end = list.prev(t)?;

    let mut declarators = Vec::new();
    loop {
        while matches!(list.text(t), "*" | "const") {
            t = list.next(t)?;
        }
        if !list[t].is_identifier() {
            return None;
        }
        let name = t;
        t = list.next(t)?;
        let mut is_array = false;
        while list.text(t) == "[" {
            is_array = true;
            t = list.next(list.link(t)?)?;
        }
        let mut eq = None;
        match list.text(t) {
            "=" => {
                eq = Some(t);
                t = list.next(t)?;
                while !matches!(list.text(t), "," | ";") {
                    match list.text(t) {
                        "(" | "[" | "{" => t = list.next(list.link(t)?)?,
                        ")" | "]" | "}" => return None,
                        _ => t = list.next(t)?,
                    }
                }
            }
            "(" | "{" => t = list.next(list.link(t)?)?,
            _ => {}
        }
        declarators.push(Declarator {
            name,
            eq,
            is_array,
            separator: t,
        });
        match list.text(t) {
            "," => t = list.next(t)?,
            ";" => break,
            _ => return None,
        }
    }
    Some(Declaration {
        type_start: start,
        type_end,
        is_auto,
        declarators,
    })
}

/// Copy `[first, last]` after `after`, relinking copied bracket pairs
fn copy_range_after(list: &mut TokenList, first: TokenId, last: TokenId, after: TokenId) -> TokenId {
    let sources: Vec<TokenId> = list.range(Some(first), list.next(last)).collect();
    let mut opened: Vec<TokenId> = Vec::new();
    let mut at = after;
    for src in sources {
        at = list.insert_copy_after(at, src);
        if list.link(src).is_some() {
            if list[src].is_opening_bracket() {
                opened.push(at);
            } else if let Some(open) = opened.pop() {
                list.create_link(open, at);
            }
        }
    }
    at
}

fn split_declaration(list: &mut TokenList, decl: &Declaration) -> bool {
    let mut changed = false;
    for d in &decl.declarators {
        if let Some(eq) = d.eq {
            let brace_init = list.str_at(eq, 1) == "{";
            if !d.is_array && !decl.is_auto && !brace_init {
                let semi = list.insert_before(eq, ";");
                list.insert_copy_after(semi, d.name);
                list[eq].flags |= TokenFlags::SPLIT_VAR_DECL_EQ;
                changed = true;
            }
        }
        if list.text(d.separator) == "," {
            list.set_text(d.separator, ";");
            copy_range_after(list, decl.type_start, decl.type_end, d.separator);
            changed = true;
        }
    }
    changed
}

pub fn split_declarations(list: &mut TokenList) -> bool {
    let mut changed = false;
    // true for class bodies and initializer braces
    let mut blocks: Vec<bool> = Vec::new();
    let mut cur = list.front();
    while let Some(t) = cur {
        match list.text(t) {
            "{" => blocks.push(!is_code_block(list, t)),
            "}" => {
                blocks.pop();
            }
            _ => {
                let in_class = blocks.last().copied().unwrap_or(false);
                if !in_class && is_statement_start(list, t) {
                    if let Some(decl) = parse_declaration(list, t) {
                        changed |= split_declaration(list, &decl);
                    }
                }
            }
        }
        cur = list.next(t);
    }
    changed
}
