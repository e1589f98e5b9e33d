//! Token pattern matching
//!
//! A pattern is a space separated sequence of elements matched against
//! consecutive tokens. An element is a literal text, a `|` separated list
//! of alternatives (an empty alternative makes the element optional), a
//! `!!text` negation (also matches past the end of the list) or a class:
//!
//! | class      | matches                                  |
//! |------------|------------------------------------------|
//! | `%any%`    | any token                                |
//! | `%name%`   | identifier, keyword or boolean           |
//! | `%type%`   | identifier or standard type              |
//! | `%var%`    | token with a variable id                 |
//! | `%varid%`  | token with the given variable id         |
//! | `%num%`    | number literal                           |
//! | `%str%`    | string literal                           |
//! | `%char%`   | character literal                        |
//! | `%bool%`   | `true` / `false`                         |
//! | `%op%`     | operator                                 |
//! | `%cop%`    | side-effect free operator                |
//! | `%assign%` | assignment operator                      |
//! | `%comp%`   | comparison operator                      |

use crate::features::tokenizer::domain::{TokenKind, TokenList};
use crate::shared::models::TokenId;

/// Match `pattern` starting at `tok`
pub fn matches(list: &TokenList, tok: Option<TokenId>, pattern: &str) -> bool {
    matches_varid(list, tok, pattern, 0)
}

/// Match `pattern` starting at `tok`, `%varid%` compares against `varid`
pub fn matches_varid(list: &TokenList, tok: Option<TokenId>, pattern: &str, varid: u32) -> bool {
    let mut cur = tok;
    for element in pattern.split_whitespace() {
        if let Some(negated) = element.strip_prefix("!!") {
            if let Some(t) = cur {
                if list.text(t) == negated {
                    return false;
                }
                cur = list.next(t);
            }
            continue;
        }

        let Some(t) = cur else {
            // only optional elements may remain
            if is_optional(element) {
                continue;
            }
            return false;
        };

        if element_matches(list, t, element, varid) {
            cur = list.next(t);
        } else if !is_optional(element) {
            return false;
        }
    }
    true
}

/// First token in `[start, end)` where `pattern` matches
pub fn find_match(
    list: &TokenList,
    start: Option<TokenId>,
    pattern: &str,
    end: Option<TokenId>,
) -> Option<TokenId> {
    list.range(start, end).find(|&t| matches(list, Some(t), pattern))
}

/// `find_match` with a `%varid%` value
pub fn find_match_varid(
    list: &TokenList,
    start: Option<TokenId>,
    pattern: &str,
    varid: u32,
    end: Option<TokenId>,
) -> Option<TokenId> {
    list.range(start, end)
        .find(|&t| matches_varid(list, Some(t), pattern, varid))
}

fn is_literal_bar(element: &str) -> bool {
    matches!(element, "|" | "||" | "|=")
}

fn is_optional(element: &str) -> bool {
    !is_literal_bar(element)
        && element.contains('|')
        && element.split('|').any(|alt| alt.is_empty())
}

fn element_matches(list: &TokenList, t: TokenId, element: &str, varid: u32) -> bool {
    if is_literal_bar(element) {
        return list.text(t) == element;
    }
    if !element.contains('|') {
        return single_matches(list, t, element, varid);
    }
    element
        .split('|')
        .filter(|alt| !alt.is_empty())
        .any(|alt| single_matches(list, t, alt, varid))
}

fn single_matches(list: &TokenList, t: TokenId, element: &str, varid: u32) -> bool {
    let tok = &list[t];
    match element {
        "%any%" => true,
        "%name%" => tok.is_name(),
        "%type%" => tok.kind == TokenKind::Name || tok.is_standard_type(),
        "%var%" => tok.var_id > 0,
        "%varid%" => varid > 0 && tok.var_id == varid,
        "%num%" => tok.is_number(),
        "%str%" => tok.kind == TokenKind::String,
        "%char%" => tok.kind == TokenKind::Char,
        "%bool%" => tok.kind == TokenKind::Boolean,
        "%op%" => tok.is_op(),
        "%cop%" => tok.is_constant_op(),
        "%assign%" => tok.is_assignment_op(),
        "%comp%" => tok.is_comparison_op(),
        "%or%" => tok.text == "|",
        "%oror%" => tok.text == "||",
        literal => tok.text == literal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tokenizer::domain::Token;

    fn list_of(src: &str) -> TokenList {
        let mut list = TokenList::new(vec!["t.c".into()]);
        for (i, t) in src.split_whitespace().enumerate() {
            list.push_back(Token::new(t, 0, 1, i as u32 + 1));
        }
        list
    }

    #[test]
    fn test_literal_and_classes() {
        let list = list_of("x = 5 ;");
        let x = list.front();
        assert!(matches(&list, x, "%name% = %num% ;"));
        assert!(matches(&list, x, "x %assign% %any%"));
        assert!(!matches(&list, x, "%name% == %num%"));
    }

    #[test]
    fn test_alternatives_and_optional() {
        let list = list_of("const int * p ;");
        let first = list.front();
        assert!(matches(&list, first, "const| int|char * %name% ;"));
        let int = list.next(first.unwrap());
        assert!(matches(&list, int, "const| int * %name%"));
    }

    #[test]
    fn test_negation() {
        let list = list_of("if ( x ) { }");
        let close = list.tok_at(list.front().unwrap(), 3);
        assert!(matches(&list, close, ") !!else"));
        let brace = list.back();
        assert!(matches(&list, brace, "} !!else"));
    }

    #[test]
    fn test_bar_literals() {
        let list = list_of("a || b | c");
        let oror = list.tok_at(list.front().unwrap(), 1);
        assert!(matches(&list, oror, "|| %name% |"));
    }

    #[test]
    fn test_varid() {
        let mut list = list_of("a = b ;");
        let a = list.front().unwrap();
        list[a].var_id = 3;
        assert!(matches_varid(&list, Some(a), "%varid% =", 3));
        assert!(!matches_varid(&list, Some(a), "%varid% =", 4));
        assert!(matches(&list, Some(a), "%var% = %name%"));
    }
}
