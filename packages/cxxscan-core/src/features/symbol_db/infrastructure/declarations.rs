//! Declaration parsing: declarators, parameter lists and type spelling

use crate::features::library::Library;
use crate::features::tokenizer::infrastructure::ast::declaration_name;
use crate::features::tokenizer::{BaseType, Sign, TokenFlags, TokenList, ValueType};
use crate::features::symbol_db::domain::VariableFlags;
use crate::shared::models::TokenId;

const STORAGE_WORDS: [&str; 11] = [
    "static", "extern", "const", "volatile", "constexpr", "mutable", "thread_local", "typename",
    "struct", "class", "union",
];

/// One declared name with its type
#[derive(Debug, Clone)]
pub struct Declarator {
    /// First token of the declaration (storage keywords included)
    pub decl_start: TokenId,
    /// First and last token of the base type
    pub type_start: TokenId,
    pub type_end: TokenId,
    pub name: Option<TokenId>,
    pub pointer_depth: u32,
    pub flags: VariableFlags,
    /// `[` tokens of the array dimensions
    pub dims: Vec<TokenId>,
    /// First token of an initializer (`=`, `(` or `{`)
    pub initializer: Option<TokenId>,
}

/// Skip `<...>` and bracket pairs; otherwise step once
pub(crate) fn step_over(list: &TokenList, t: TokenId) -> Option<TokenId> {
    let tok = &list[t];
    if tok.is_opening_bracket() {
        if let Some(link) = tok.link {
            return list.next(link);
        }
    }
    list.next(t)
}

/// Base type range of a declaration starting at `start`:
/// `(type_start, type_end)`, storage keywords excluded
fn base_type_range(list: &TokenList, start: TokenId) -> Option<(TokenId, TokenId)> {
    let mut cur = start;
    while STORAGE_WORDS.contains(&list.text(cur)) || list.text(cur) == "enum" {
        cur = list.next(cur)?;
    }
    let type_start = cur;
    let mut type_end = cur;
    if list.text(cur) == "auto" {
        return Some((cur, cur));
    }
    if list[cur].is_standard_type() {
        while let Some(n) = list.next(type_end).filter(|&n| list[n].is_standard_type()) {
            type_end = n;
        }
        return Some((type_start, type_end));
    }
    if list.text(cur) == "::" {
        cur = list.next(cur)?;
    }
    if !list[cur].is_identifier() {
        return None;
    }
    type_end = cur;
    loop {
        let next = list.next(type_end)?;
        match list.text(next) {
            "::" => {
                let after = list.next(next)?;
                if !list[after].is_identifier() {
                    return None;
                }
                type_end = after;
            }
            "<" if list.link(next).is_some() => type_end = list.link(next)?,
            _ => break,
        }
    }
    Some((type_start, type_end))
}

/// Declarators of the declaration statement at `start`; `None` when the
/// statement is not a declaration
pub fn parse_declaration(list: &TokenList, start: TokenId) -> Option<Vec<Declarator>> {
    let first_name = declaration_name(list, start)?;
    let (type_start, type_end) = base_type_range(list, start)?;

    let mut base_flags = VariableFlags::empty();
    for t in list.range(Some(start), list.next(type_end)) {
        match list.text(t) {
            "static" => base_flags |= VariableFlags::STATIC,
            "extern" => base_flags |= VariableFlags::EXTERN,
            "const" | "constexpr" => base_flags |= VariableFlags::CONST,
            "volatile" => base_flags |= VariableFlags::VOLATILE,
            _ => {}
        }
    }
    let mut cur = list.next(type_end)?;

    let mut out = Vec::new();
    let mut expected_name = Some(first_name);
    loop {
        let mut decl = Declarator {
            decl_start: start,
            type_start,
            type_end,
            name: None,
            pointer_depth: 0,
            flags: base_flags,
            dims: Vec::new(),
            initializer: None,
        };
        let mut const_after_star = false;
        while matches!(list.text(cur), "*" | "&" | "&&" | "const" | "volatile") {
            match list.text(cur) {
                "*" => {
                    decl.pointer_depth += 1;
                    const_after_star = false;
                }
                "&" => decl.flags |= VariableFlags::REFERENCE,
                "&&" => decl.flags |= VariableFlags::RVALUE_REFERENCE,
                "const" => {
                    if decl.pointer_depth > 0 {
                        const_after_star = true;
                    } else {
                        decl.flags |= VariableFlags::CONST;
                    }
                }
                _ => {}
            }
            cur = list.next(cur)?;
        }
        if decl.pointer_depth > 0 {
            decl.flags |= VariableFlags::POINTER;
            // `const int *p`: the pointer itself is writable
            decl.flags.set(VariableFlags::CONST, const_after_star);
        }
        if !list[cur].is_identifier() || expected_name.is_some_and(|n| n != cur) {
            break;
        }
        expected_name = None;
        decl.name = Some(cur);
        cur = list.next(cur)?;
        while list.text(cur) == "[" {
            decl.dims.push(cur);
            cur = list.next(list.link(cur)?)?;
        }
        if !decl.dims.is_empty() {
            decl.flags |= VariableFlags::ARRAY;
        }
        match list.text(cur) {
            "=" | "(" | "{" => {
                decl.initializer = Some(cur);
                decl.flags |= VariableFlags::HAS_INITIALIZER;
                while !matches!(list.text(cur), "," | ";" | ")" | "}") {
                    cur = step_over(list, cur)?;
                }
            }
            ":" => {
                // bit field or range-for
                if !is_range_for_colon(list, cur) {
                    while !matches!(list.text(cur), "," | ";") {
                        cur = step_over(list, cur)?;
                    }
                }
            }
            _ => {}
        }
        out.push(decl);
        if list.text(cur) != "," {
            break;
        }
        cur = list.next(cur)?;
    }
    (!out.is_empty()).then_some(out)
}

fn is_range_for_colon(list: &TokenList, colon: TokenId) -> bool {
    let mut cur = list.prev(colon);
    while let Some(c) = cur {
        match list.text(c) {
            "(" => return list.prev(c).is_some_and(|k| list.text(k) == "for"),
            ";" | "{" | "}" => return false,
            _ => cur = list.prev(c),
        }
    }
    false
}

/// Parameters of the list opened at `open`, and whether it ends in `...`
pub fn parse_parameters(list: &TokenList, open: TokenId) -> (Vec<Declarator>, bool) {
    let mut params = Vec::new();
    let mut variadic = false;
    let Some(close) = list.link(open) else {
        return (params, variadic);
    };
    let mut parts: Vec<(TokenId, TokenId)> = Vec::new();
    let mut part_start = list.next(open);
    let mut cur = part_start;
    while let Some(c) = cur {
        if c == close || list.text(c) == "," {
            if let Some(s) = part_start.filter(|&s| s != c) {
                parts.push((s, c));
            }
            if c == close {
                break;
            }
            part_start = list.next(c);
            cur = part_start;
            continue;
        }
        cur = step_over(list, c);
    }

    for (start, end) in parts {
        let tokens: Vec<TokenId> = list.range(Some(start), Some(end)).collect();
        match tokens.as_slice() {
            [only] if list.text(*only) == "void" => continue,
            [only] if list.text(*only) == "..." => {
                variadic = true;
                continue;
            }
            _ => {}
        }
        if let Some(decl) = parse_parameter(list, &tokens) {
            params.push(decl);
        }
    }
    (params, variadic)
}

fn parse_parameter(list: &TokenList, tokens: &[TokenId]) -> Option<Declarator> {
    let start = *tokens.first()?;
    // default value
    let decl_tokens: &[TokenId] = match tokens.iter().position(|&t| list.text(t) == "=") {
        Some(eq) => &tokens[..eq],
        None => tokens,
    };
    let has_default = decl_tokens.len() < tokens.len();
    let (type_start, type_end) = base_type_range(list, start)?;

    let mut decl = Declarator {
        decl_start: start,
        type_start,
        type_end,
        name: None,
        pointer_depth: 0,
        flags: VariableFlags::ARGUMENT,
        dims: Vec::new(),
        initializer: has_default.then(|| tokens[decl_tokens.len()]),
    };
    if has_default {
        decl.flags |= VariableFlags::HAS_INITIALIZER;
    }
    let rest_start = decl_tokens.iter().position(|&t| t == type_end).map_or(0, |i| i + 1);
    let mut saw_const_before = decl_tokens[..rest_start.min(decl_tokens.len())]
        .iter()
        .any(|&t| list.text(t) == "const");
    let mut i = rest_start;
    while i < decl_tokens.len() {
        let t = decl_tokens[i];
        match list.text(t) {
            "*" => {
                decl.pointer_depth += 1;
                saw_const_before = false;
            }
            "&" => decl.flags |= VariableFlags::REFERENCE,
            "&&" => decl.flags |= VariableFlags::RVALUE_REFERENCE,
            "const" => saw_const_before = true,
            "[" => {
                decl.dims.push(t);
                decl.flags |= VariableFlags::ARRAY;
                if let Some(close) = list.link(t) {
                    while i < decl_tokens.len() && decl_tokens[i] != close {
                        i += 1;
                    }
                }
            }
            "(" => {
                // function pointer `(*name)(...)`
                if list.str_at(t, 1) == "*" {
                    decl.pointer_depth += 1;
                    decl.name = list.tok_at(t, 2).filter(|&n| list[n].is_identifier());
                }
                break;
            }
            _ if list[t].is_identifier() && !list[t].is_standard_type() => decl.name = Some(t),
            _ => {}
        }
        i += 1;
    }
    if saw_const_before {
        decl.flags |= VariableFlags::CONST;
    }
    if decl.pointer_depth > 0 {
        decl.flags |= VariableFlags::POINTER;
    }
    Some(decl)
}

/// Canonical spelling of the type tokens `start..=end`
pub fn canonical_type(list: &TokenList, start: TokenId, end: TokenId) -> String {
    let mut out = String::new();
    let mut prev_word = false;
    for t in list.range(Some(start), list.next(end)) {
        let tok = &list[t];
        if STORAGE_WORDS.contains(&tok.text.as_str()) || tok.text == "enum" {
            continue;
        }
        let is_word = tok.is_name() || tok.is_number();
        if prev_word && is_word {
            out.push(' ');
        }
        if tok.is_unsigned() {
            out.push_str("unsigned ");
        } else if tok.flags.contains(TokenFlags::SIGNED) && tok.text == "char" {
            out.push_str("signed ");
        }
        match tok.text.as_str() {
            "long" if tok.is_long() => out.push_str("long long"),
            "double" if tok.is_long() => out.push_str("long double"),
            text => out.push_str(text),
        }
        prev_word = is_word;
    }
    out
}

/// Type name without template arguments (`std::vector`)
pub fn template_base_name(type_name: &str) -> &str {
    type_name.split('<').next().unwrap_or(type_name)
}

/// Value type of the base type tokens `start..=end`
pub fn base_value_type(list: &TokenList, start: TokenId, end: TokenId, library: &Library) -> ValueType {
    let mut sign = Sign::Unknown;
    let mut base = BaseType::Unknown;
    let mut constness = 0;
    let stop = list.next(end);
    let mut cur = Some(start);
    while let Some(t) = cur.filter(|&t| Some(t) != stop) {
        cur = list.next(t);
        let tok = &list[t];
        // template arguments never decide the base type
        if tok.text == "<" {
            if let Some(close) = tok.link {
                cur = list.next(close);
            }
            continue;
        }
        if tok.is_unsigned() {
            sign = Sign::Unsigned;
        } else if tok.flags.contains(TokenFlags::SIGNED) {
            sign = Sign::Signed;
        }
        let this = match tok.text.as_str() {
            "const" => {
                constness = 1;
                continue;
            }
            "bool" | "_Bool" => BaseType::Bool,
            "char" => BaseType::Char,
            "char16_t" | "char32_t" | "wchar_t" => BaseType::WChar,
            "short" => BaseType::Short,
            "int" => BaseType::Int,
            "long" if tok.is_long() => BaseType::LongLong,
            "long" => BaseType::Long,
            "float" => BaseType::Float,
            "double" if tok.is_long() => BaseType::LongDouble,
            "double" => BaseType::Double,
            "void" => BaseType::Void,
            "size_t" => {
                sign = Sign::Unsigned;
                BaseType::Long
            }
            _ => continue,
        };
        // `short int`, `long int` keep the first word
        if base == BaseType::Unknown || (base == BaseType::Int && this != BaseType::Int) {
            base = this;
        }
    }
    if base != BaseType::Unknown {
        if sign == Sign::Unknown
            && matches!(base, BaseType::Short | BaseType::WChar | BaseType::Int | BaseType::Long | BaseType::LongLong)
        {
            sign = Sign::Signed;
        }
        let mut vt = ValueType::new(sign, base, 0);
        vt.constness = constness;
        return vt;
    }
    if list.text(start) == "auto" {
        return ValueType::default();
    }
    let name = canonical_type(list, start, end);
    let base_name = template_base_name(&name).to_string();
    let mut vt = if library.container(&base_name).is_some() {
        ValueType::named(BaseType::Container, base_name)
    } else {
        ValueType::named(BaseType::Record, base_name)
    };
    vt.constness = constness;
    vt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::features::tokenizer::Tokenizer;

    fn tokens(code: &str) -> TokenList {
        Tokenizer::new(&Settings::default()).tokenize_str(code, "t.cpp").unwrap().list
    }

    #[test]
    fn test_parse_declaration_pointer_and_array() {
        let list = tokens("static const char *p ; int a [ 10 ] ;");
        let first = list.front().unwrap();
        let decls = parse_declaration(&list, first).unwrap();
        assert_eq!(decls.len(), 1);
        let p = &decls[0];
        assert_eq!(p.pointer_depth, 1);
        assert!(p.flags.contains(VariableFlags::STATIC | VariableFlags::POINTER));
        assert!(!p.flags.contains(VariableFlags::CONST));
        assert_eq!(canonical_type(&list, p.type_start, p.type_end), "char");

        let int_tok = list.iter().find(|&t| list.text(t) == "int").unwrap();
        let a = &parse_declaration(&list, int_tok).unwrap()[0];
        assert!(a.flags.contains(VariableFlags::ARRAY));
        assert_eq!(a.dims.len(), 1);
    }

    #[test]
    fn test_parse_parameters() {
        let list = tokens("void f(const std::string& s, int n = 3, char buf[], ...);");
        let open = list.iter().find(|&t| list.text(t) == "(").unwrap();
        let (params, variadic) = parse_parameters(&list, open);
        assert!(variadic);
        assert_eq!(params.len(), 3);
        assert_eq!(list.text(params[0].name.unwrap()), "s");
        assert!(params[0].flags.contains(VariableFlags::REFERENCE | VariableFlags::CONST));
        assert_eq!(canonical_type(&list, params[0].type_start, params[0].type_end), "std::string");
        assert!(params[1].flags.contains(VariableFlags::HAS_INITIALIZER));
        assert!(params[2].flags.contains(VariableFlags::ARRAY));
    }

    #[test]
    fn test_unnamed_and_void_parameters() {
        let list = tokens("void f(int, char*); void g(void);");
        let opens: Vec<_> = list.iter().filter(|&t| list.text(t) == "(").collect();
        let (params, _) = parse_parameters(&list, opens[0]);
        assert_eq!(params.len(), 2);
        assert!(params.iter().all(|p| p.name.is_none()));
        assert_eq!(params[1].pointer_depth, 1);
        assert!(parse_parameters(&list, opens[1]).0.is_empty());
    }

    #[test]
    fn test_canonical_type_spelling() {
        let list = tokens("unsigned long long x ; std::vector<int> v ;");
        let first = list.front().unwrap();
        let d = &parse_declaration(&list, first).unwrap()[0];
        assert_eq!(canonical_type(&list, d.type_start, d.type_end), "unsigned long long");
        let std_tok = list.iter().find(|&t| list.text(t) == "std").unwrap();
        let v = &parse_declaration(&list, std_tok).unwrap()[0];
        assert_eq!(canonical_type(&list, v.type_start, v.type_end), "std::vector<int>");
        assert_eq!(template_base_name("std::vector<int>"), "std::vector");
    }

    #[test]
    fn test_template_arguments_do_not_decide_base_type() {
        let library = Library::standard().unwrap();
        let list = tokens("std::vector<int> v ; std::map<int, long> m ; unsigned int n ;");
        let decl_at = |text: &str| {
            let t = list.iter().find(|&t| list.text(t) == text).unwrap();
            parse_declaration(&list, t).unwrap().remove(0)
        };

        let v = decl_at("std");
        let vt = base_value_type(&list, v.type_start, v.type_end, &library);
        assert_eq!(vt.base, BaseType::Container);
        assert_eq!(vt.type_name, "std::vector");

        let m = list.iter().filter(|&t| list.text(t) == "std").nth(1).unwrap();
        let m = parse_declaration(&list, m).unwrap().remove(0);
        let vt = base_value_type(&list, m.type_start, m.type_end, &library);
        assert_eq!(vt.base, BaseType::Container);
        assert_eq!(vt.type_name, "std::map");

        let n = decl_at("unsigned");
        let vt = base_value_type(&list, n.type_start, n.type_end, &library);
        assert_eq!((vt.sign, vt.base), (Sign::Unsigned, BaseType::Int));
    }
}
