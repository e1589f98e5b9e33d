//! Bracket matching
//!
//! `()[]{}` are linked in one pass with an explicit stack. Template angle
//! brackets are linked heuristically afterwards; a `>>` that closes two
//! template argument lists is split into two `>` tokens.

use super::errors::{TokenizeError, TokenizeResult};
use crate::features::tokenizer::domain::{TokenFlags, TokenList};
use crate::shared::models::TokenId;

/// Link `()`, `[]` and `{}`; unmatched brackets are syntax errors
pub fn link_brackets(list: &mut TokenList) -> TokenizeResult<()> {
    let mut stack: Vec<TokenId> = Vec::new();
    let mut cur = list.front();
    while let Some(t) = cur {
        cur = list.next(t);
        let text = list.text(t);
        match text {
            "(" | "[" | "{" => stack.push(t),
            ")" | "]" | "}" => {
                let expected = match text {
                    ")" => "(",
                    "]" => "[",
                    _ => "{",
                };
                match stack.pop() {
                    Some(open) if list.text(open) == expected => list.create_link(open, t),
                    Some(open) => {
                        return Err(TokenizeError::syntax(
                            format!(
                                "Unmatched '{}'. Configuration does not match the '{}' at line {}.",
                                text,
                                list.text(open),
                                list[open].line
                            ),
                            list.location(t),
                        ))
                    }
                    None => {
                        return Err(TokenizeError::syntax(
                            format!("Unmatched '{}'. Configuration: ''.", text),
                            list.location(t),
                        ))
                    }
                }
            }
            _ => {}
        }
    }
    match stack.pop() {
        Some(open) => Err(TokenizeError::syntax(
            format!("Unmatched '{}'.", list.text(open)),
            list.location(open),
        )),
        None => Ok(()),
    }
}

/// Link `<` `>` pairs that look like template argument lists
pub fn link_templates(list: &mut TokenList) {
    let mut cur = list.front();
    while let Some(t) = cur {
        cur = list.next(t);
        if list.text(t) != "<" || list[t].link.is_some() {
            continue;
        }
        let Some(prev) = list.prev(t) else {
            continue;
        };
        let prev_tok = &list[prev];
        if !(prev_tok.is_identifier() || matches!(prev_tok.text.as_str(), "template" | "static_cast" | "const_cast" | "dynamic_cast" | "reinterpret_cast")) {
            continue;
        }
        link_template_at(list, t);
    }
}

/// Try to close the template argument list opened at `open`.
///
/// Inner pairs and `>>` splits are only committed once the outer list
/// closes; an abandoned attempt leaves the tokens as it found them.
fn link_template_at(list: &mut TokenList, open: TokenId) {
    // stack of unmatched `<` inside this list
    let mut opens = vec![open];
    let mut pairs: Vec<(TokenId, TokenId)> = Vec::new();
    // first half of every `>>` split so far
    let mut splits: Vec<TokenId> = Vec::new();
    let mut cur = list.next(open);
    while let Some(t) = cur {
        let text = list.text(t).to_string();
        match text.as_str() {
            "<" => {
                opens.push(t);
            }
            ">" => {
                let Some(o) = opens.pop() else { break };
                pairs.push((o, t));
                if opens.is_empty() {
                    commit_template(list, open, t, &pairs);
                    return;
                }
            }
            ">>" => {
                // `a<b>>c` with one open list is a shift
                if opens.len() < 2 {
                    break;
                }
                list.set_text(t, ">");
                let second = list.insert_after(t, ">");
                splits.push(t);
                if let (Some(inner), Some(outer)) = (opens.pop(), opens.pop()) {
                    pairs.push((inner, t));
                    pairs.push((outer, second));
                }
                if opens.is_empty() {
                    commit_template(list, open, second, &pairs);
                    return;
                }
                cur = list.next(second);
                continue;
            }
            "(" | "[" => {
                // skip nested brackets (already linked)
                cur = list.link(t).and_then(|l| list.next(l));
                continue;
            }
            ";" | "{" | "}" | ")" | "]" | "=" | "&&" | "||" | "?" | "!" | "==" | "!=" | "<=" | ">=" | "+=" | "-=" | "return" => break,
            _ => {
                let tok = &list[t];
                let allowed = tok.is_name()
                    || tok.is_number()
                    || matches!(text.as_str(), "," | "::" | "*" | "&" | "&&" | "..." | "-" | "+" | ".");
                if !allowed {
                    break;
                }
            }
        }
        cur = list.next(t);
    }

    // not a template: merge the split shifts back
    for first in splits {
        if let Some(second) = list.next(first) {
            list.delete(second);
        }
        list.set_text(first, ">>");
    }
}

fn commit_template(list: &mut TokenList, open: TokenId, close: TokenId, pairs: &[(TokenId, TokenId)]) {
    for &(o, c) in pairs {
        list.create_link(o, c);
    }
    mark_template_args(list, open, close);
}

fn mark_template_args(list: &mut TokenList, open: TokenId, close: TokenId) {
    let mut cur = list.next(open);
    while let Some(t) = cur {
        if t == close {
            break;
        }
        list[t].flags |= TokenFlags::TEMPLATE_ARG;
        cur = list.next(t);
    }
}

/// Every opening bracket is linked to a closing bracket that links back
pub fn links_are_consistent(list: &TokenList) -> bool {
    list.iter().all(|t| {
        let text = list.text(t);
        let Some(link) = list.link(t) else {
            return !matches!(text, "(" | "[" | "{" | ")" | "]" | "}");
        };
        if list.is_deleted(link) || list.link(link) != Some(t) {
            return false;
        }
        let partner = list.text(link);
        match text {
            "(" => partner == ")",
            "[" => partner == "]",
            "{" => partner == "}",
            "<" => partner == ">",
            ")" => partner == "(",
            "]" => partner == "[",
            "}" => partner == "{",
            ">" => partner == "<",
            _ => false,
        }
    })
}
