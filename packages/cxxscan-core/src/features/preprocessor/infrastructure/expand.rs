//! Macro expansion
//!
//! Expansion rescans the replacement list with the macro itself disabled,
//! which stops direct and indirect recursion. Expanded tokens take the
//! location of the macro use and carry `EXPANDED_MACRO`.

use crate::features::preprocessor::domain::MacroDef;
use crate::features::tokenizer::{RawToken, TokenFlags};
use rustc_hash::FxHashMap;

pub type MacroTable = FxHashMap<String, MacroDef>;

/// Nesting bound for rescanning
const MAX_EXPANSION_DEPTH: usize = 256;

pub fn expand(tokens: &[RawToken], macros: &MacroTable) -> Vec<RawToken> {
    let mut disabled = Vec::new();
    expand_with(tokens, macros, &mut disabled, 0)
}

fn expand_with(tokens: &[RawToken], macros: &MacroTable, disabled: &mut Vec<String>, depth: usize) -> Vec<RawToken> {
    let mut out = Vec::with_capacity(tokens.len());
    if depth > MAX_EXPANSION_DEPTH {
        out.extend_from_slice(tokens);
        return out;
    }
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        let Some(def) = macros.get(&tok.text).filter(|_| !disabled.contains(&tok.text)) else {
            if let Some(builtin) = builtin(tok) {
                out.push(builtin);
            } else {
                out.push(tok.clone());
            }
            i += 1;
            continue;
        };

        if !def.is_function_like() {
            let body = relocate(&def.body, tok);
            disabled.push(def.name.clone());
            out.extend(expand_with(&body, macros, disabled, depth + 1));
            disabled.pop();
            i += 1;
            continue;
        }

        // function-like macro without arguments is a plain name
        if tokens.get(i + 1).map(|t| t.text.as_str()) != Some("(") {
            out.push(tok.clone());
            i += 1;
            continue;
        }
        let Some((args, close)) = collect_args(tokens, i + 1) else {
            out.push(tok.clone());
            i += 1;
            continue;
        };
        let args = group_variadic(def, args);
        let substituted = substitute(def, &args, tok, macros, disabled, depth);
        disabled.push(def.name.clone());
        out.extend(expand_with(&substituted, macros, disabled, depth + 1));
        disabled.pop();
        i = close + 1;
    }
    out
}

fn builtin(tok: &RawToken) -> Option<RawToken> {
    let text = match tok.text.as_str() {
        "__LINE__" => tok.line.to_string(),
        _ => return None,
    };
    let mut t = tok.clone();
    t.text = text;
    t.flags |= TokenFlags::EXPANDED_MACRO;
    Some(t)
}

/// Copy a replacement list to the use site
fn relocate(body: &[RawToken], at: &RawToken) -> Vec<RawToken> {
    body.iter()
        .map(|b| {
            let mut t = at.clone();
            t.text = b.text.clone();
            t.flags = at.flags | b.flags | TokenFlags::EXPANDED_MACRO;
            t
        })
        .collect()
}

/// Arguments of the invocation whose `(` is at `open`; returns the index
/// of the closing `)`
fn collect_args(tokens: &[RawToken], open: usize) -> Option<(Vec<Vec<RawToken>>, usize)> {
    let mut args = vec![Vec::new()];
    let mut depth = 0usize;
    for (offset, tok) in tokens[open + 1..].iter().enumerate() {
        match tok.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" if depth == 0 => {
                if args.len() == 1 && args[0].is_empty() {
                    args.clear();
                }
                return Some((args, open + 1 + offset));
            }
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            "," if depth == 0 => {
                args.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(last) = args.last_mut() {
            last.push(tok.clone());
        }
    }
    None
}

/// Fold surplus arguments into the variadic parameter
fn group_variadic(def: &MacroDef, mut args: Vec<Vec<RawToken>>) -> Vec<Vec<RawToken>> {
    let count = def.params.as_ref().map_or(0, Vec::len);
    if !def.variadic || count == 0 || args.len() <= count {
        return args;
    }
    let rest = args.split_off(count - 1);
    let mut joined = Vec::new();
    for (i, arg) in rest.into_iter().enumerate() {
        if i > 0 {
            let mut comma = joined
                .last()
                .cloned()
                .unwrap_or_else(|| RawToken::new(",", 0, 0, 0));
            comma.text = ",".to_string();
            joined.push(comma);
        }
        joined.extend(arg);
    }
    args.push(joined);
    args
}

fn stringify(arg: &[RawToken]) -> String {
    let text = arg.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn substitute(
    def: &MacroDef,
    args: &[Vec<RawToken>],
    at: &RawToken,
    macros: &MacroTable,
    disabled: &mut Vec<String>,
    depth: usize,
) -> Vec<RawToken> {
    let body = relocate(&def.body, at);
    let mut out: Vec<RawToken> = Vec::new();
    let mut i = 0;
    while i < body.len() {
        let tok = &body[i];
        // `# param`
        if tok.text == "#" {
            if let Some(index) = body.get(i + 1).and_then(|n| def.param_index(&n.text)) {
                let mut s = tok.clone();
                s.text = stringify(args.get(index).map(Vec::as_slice).unwrap_or(&[]));
                out.push(s);
                i += 2;
                continue;
            }
        }
        // `a ## b`
        if tok.text == "##" {
            if let (Some(left), Some(right)) = (out.pop(), body.get(i + 1)) {
                let right_text = match def.param_index(&right.text) {
                    Some(index) => args
                        .get(index)
                        .map(|a| a.iter().map(|t| t.text.as_str()).collect::<String>())
                        .unwrap_or_default(),
                    None => right.text.clone(),
                };
                let mut pasted = left;
                pasted.text.push_str(&right_text);
                out.push(pasted);
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }
        match def.param_index(&tok.text) {
            Some(index) => {
                let arg = args.get(index).map(Vec::as_slice).unwrap_or(&[]);
                let arg = relocate(arg, at);
                let pasted_next = body.get(i + 1).is_some_and(|n| n.text == "##");
                if pasted_next {
                    out.extend(arg);
                } else {
                    out.extend(expand_with(&arg, macros, disabled, depth + 1));
                }
            }
            None => out.push(tok.clone()),
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tokenizer::lex;

    fn define(src: &str) -> MacroDef {
        let toks = lex(src, 0, "t.c").unwrap();
        let name = toks[0].text.clone();
        if toks.get(1).map(|t| t.text.as_str()) == Some("(") {
            let close = toks.iter().position(|t| t.text == ")").unwrap();
            let mut params: Vec<String> = toks[2..close]
                .iter()
                .filter(|t| t.text != ",")
                .map(|t| t.text.clone())
                .collect();
            let variadic = params.last().map(|p| p == "...").unwrap_or(false);
            if variadic {
                params.pop();
                params.push("__VA_ARGS__".into());
            }
            MacroDef {
                name,
                params: Some(params),
                variadic,
                body: toks[close + 1..].to_vec(),
            }
        } else {
            MacroDef::object(name, toks[1..].to_vec())
        }
    }

    fn run(defs: &[&str], src: &str) -> String {
        let mut table = MacroTable::default();
        for d in defs {
            let m = define(d);
            table.insert(m.name.clone(), m);
        }
        expand(&lex(src, 0, "t.c").unwrap(), &table)
            .into_iter()
            .map(|t| t.text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_object_like() {
        assert_eq!(run(&["N 10"], "int a[N];"), "int a [ 10 ] ;");
    }

    #[test]
    fn test_function_like() {
        assert_eq!(run(&["MAX(a,b) ((a)>(b)?(a):(b))"], "x = MAX(1, y);"), "x = ( ( 1 ) > ( y ) ? ( 1 ) : ( y ) ) ;");
    }

    #[test]
    fn test_stringify_and_paste() {
        assert_eq!(run(&["S(x) #x"], "s = S(a + b);"), "s = \"a + b\" ;");
        assert_eq!(run(&["CAT(a,b) a##b"], "int CAT(foo, 1);"), "int foo1 ;");
    }

    #[test]
    fn test_recursion_guard() {
        assert_eq!(run(&["A B", "B A"], "A;"), "A ;");
        assert_eq!(run(&["F(x) F(x+1)"], "F(0);"), "F ( 0 + 1 ) ;");
    }

    #[test]
    fn test_variadic() {
        assert_eq!(run(&["P(fmt, ...) printf(fmt, __VA_ARGS__)"], "P(\"%d %d\", 1, 2);"), "printf ( \"%d %d\" , 1 , 2 ) ;");
    }

    #[test]
    fn test_expanded_flag_and_location() {
        let mut table = MacroTable::default();
        let m = define("N 10");
        table.insert(m.name.clone(), m);
        let out = expand(&lex("x = N;", 0, "t.c").unwrap(), &table);
        assert!(out[2].flags.contains(TokenFlags::EXPANDED_MACRO));
        assert_eq!(out[2].column, 5);
        assert!(!out[0].flags.contains(TokenFlags::EXPANDED_MACRO));
    }
}
