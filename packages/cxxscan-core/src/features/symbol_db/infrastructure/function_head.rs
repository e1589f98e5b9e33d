//! Function head recognition outside function bodies

use crate::features::symbol_db::domain::FunctionFlags;
use crate::features::tokenizer::infrastructure::ast::function_body;
use crate::features::tokenizer::TokenList;
use crate::shared::models::TokenId;

/// Words that may precede the return type
const SPECIFIERS: [&str; 9] = [
    "virtual", "static", "explicit", "extern", "inline", "constexpr", "friend", "_Noreturn", "typename",
];

#[derive(Debug, Clone)]
pub struct FunctionHead {
    /// Name token: the identifier, the one after `~`, or `operator`
    pub name_token: TokenId,
    pub name: String,
    /// Class/namespace qualifiers of an out-of-line definition
    pub qualification: Vec<String>,
    pub open: TokenId,
    pub close: TokenId,
    /// Body `{` of a definition
    pub body: Option<TokenId>,
    /// `;` ending a declaration
    pub end: TokenId,
    pub flags: FunctionFlags,
    /// Return type tokens, when spelled
    pub return_range: Option<(TokenId, TokenId)>,
    pub is_destructor: bool,
    pub is_operator: bool,
}

fn attribute_noreturn(list: &TokenList, open: TokenId, close: TokenId) -> bool {
    list.range(Some(open), Some(close)).any(|t| list.text(t).contains("noreturn"))
}

/// Parse a function declaration or definition starting at `t`. Heads with
/// only a name (`f(...)`) are accepted when `allow_bare` is set, which is
/// the case inside class bodies where they declare constructors.
pub fn function_head(list: &TokenList, t: TokenId, allow_bare: bool) -> Option<FunctionHead> {
    let mut flags = FunctionFlags::empty();
    let mut cur = t;

    // [[attr]] and __attribute__((attr))
    loop {
        if list.text(cur) == "[" && list.str_at(cur, 1) == "[" {
            let close = list.link(cur)?;
            if attribute_noreturn(list, cur, close) {
                flags |= FunctionFlags::NORETURN;
            }
            cur = list.next(close)?;
        } else if list.text(cur) == "__attribute__" && list.str_at(cur, 1) == "(" {
            let open = list.next(cur)?;
            let close = list.link(open)?;
            if attribute_noreturn(list, open, close) {
                flags |= FunctionFlags::NORETURN;
            }
            cur = list.next(close)?;
        } else {
            break;
        }
    }
    let head_start = cur;

    let mut operator_tok = None;
    let mut operator_name = String::new();
    let open = loop {
        let text = list.text(cur);
        match text {
            "(" => break cur,
            "operator" => {
                operator_tok = Some(cur);
                let mut op = list.next(cur)?;
                operator_name.push_str("operator");
                if list.text(op) == "(" && list.str_at(op, 1) == ")" {
                    operator_name.push_str("()");
                    op = list.tok_at(op, 2)?;
                } else if list.text(op) == "[" {
                    operator_name.push_str("[]");
                    op = list.next(list.link(op)?)?;
                } else {
                    while list.text(op) != "(" {
                        if matches!(list.text(op), ";" | "{" | "}") {
                            return None;
                        }
                        if list[op].is_name() && !operator_name.ends_with("operator") {
                            operator_name.push(' ');
                        } else if list[op].is_name() {
                            operator_name.push(' ');
                        }
                        operator_name.push_str(list.text(op));
                        op = list.next(op)?;
                    }
                }
                if list.text(op) != "(" {
                    return None;
                }
                break op;
            }
            "<" if list.link(cur).is_some() => cur = list.next(list.link(cur)?)?,
            "virtual" => {
                flags |= FunctionFlags::VIRTUAL;
                cur = list.next(cur)?;
            }
            "static" => {
                flags |= FunctionFlags::STATIC;
                cur = list.next(cur)?;
            }
            "explicit" => {
                flags |= FunctionFlags::EXPLICIT;
                cur = list.next(cur)?;
            }
            "extern" => {
                flags |= FunctionFlags::EXTERN;
                cur = list.next(cur)?;
            }
            "_Noreturn" => {
                flags |= FunctionFlags::NORETURN;
                cur = list.next(cur)?;
            }
            "inline" | "constexpr" | "friend" | "const" | "volatile" | "struct" | "class" | "enum"
            | "union" | "typename" | "::" | "~" | "*" | "&" | "&&" => cur = list.next(cur)?,
            _ if list[cur].is_identifier() => cur = list.next(cur)?,
            _ => return None,
        }
    };
    let close = list.link(open)?;

    let (name_token, name, is_destructor, is_operator) = match operator_tok {
        Some(op) => (op, operator_name.replace("operator ", "operator "), false, true),
        None => {
            let name_tok = list.prev(open)?;
            if !list[name_tok].is_identifier() || list[name_tok].is_standard_type() || name_tok == head_start && !allow_bare {
                return None;
            }
            let is_dtor = list.prev(name_tok).is_some_and(|p| list.text(p) == "~");
            let name = if is_dtor {
                format!("~{}", list.text(name_tok))
            } else {
                list.text(name_tok).to_string()
            };
            (name_tok, name, is_dtor, false)
        }
    };

    // qualifiers before the name
    let mut qual_start = if is_destructor { list.prev(name_token)? } else { name_token };
    let mut qualification = Vec::new();
    while let Some(colons) = list.prev(qual_start).filter(|&p| list.text(p) == "::") {
        let Some(owner) = list.prev(colons).filter(|&o| list[o].is_identifier()) else {
            break;
        };
        qualification.insert(0, list.text(owner).to_string());
        qual_start = owner;
    }

    let mut ret_start = head_start;
    while SPECIFIERS.contains(&list.text(ret_start)) {
        ret_start = list.next(ret_start)?;
    }
    let return_range = if ret_start == qual_start || list.position_before(qual_start, ret_start) {
        None
    } else {
        list.prev(qual_start).map(|end| (ret_start, end))
    };
    if return_range.is_none() && !allow_bare && qualification.is_empty() && !is_destructor {
        return None;
    }

    let mut after = list.next(close)?;
    loop {
        match list.text(after) {
            "const" => {
                flags |= FunctionFlags::CONST;
                after = list.next(after)?;
            }
            "override" => {
                flags |= FunctionFlags::OVERRIDE;
                after = list.next(after)?;
            }
            "final" => {
                flags |= FunctionFlags::FINAL;
                after = list.next(after)?;
            }
            "volatile" | "&" | "&&" | "mutable" => after = list.next(after)?,
            "noexcept" | "throw" => {
                if list.text(after) == "noexcept" {
                    flags |= FunctionFlags::NOEXCEPT;
                }
                after = list.next(after)?;
                if list.text(after) == "(" {
                    after = list.next(list.link(after)?)?;
                }
            }
            "." if list[after].original_name.as_deref() == Some("->") => {
                while !matches!(list.text(after), "{" | ";" | "=") {
                    after = list.next(after)?;
                }
            }
            "=" => {
                let what = list.next(after)?;
                match list.text(what) {
                    "0" => flags |= FunctionFlags::PURE,
                    "default" => flags |= FunctionFlags::DEFAULT,
                    "delete" => flags |= FunctionFlags::DELETE,
                    _ => return None,
                }
                let semi = list.next(what)?;
                if list.text(semi) != ";" {
                    return None;
                }
                return Some(FunctionHead {
                    name_token,
                    name,
                    qualification,
                    open,
                    close,
                    body: None,
                    end: semi,
                    flags,
                    return_range,
                    is_destructor,
                    is_operator,
                });
            }
            ";" => {
                return Some(FunctionHead {
                    name_token,
                    name,
                    qualification,
                    open,
                    close,
                    body: None,
                    end: after,
                    flags,
                    return_range,
                    is_destructor,
                    is_operator,
                });
            }
            "{" | ":" => {
                let body = function_body(list, head_start)?;
                flags |= FunctionFlags::HAS_BODY;
                return Some(FunctionHead {
                    name_token,
                    name,
                    qualification,
                    open,
                    close,
                    body: Some(body),
                    end: list.link(body)?,
                    flags,
                    return_range,
                    is_destructor,
                    is_operator,
                });
            }
            _ => return None,
        }
    }
}
