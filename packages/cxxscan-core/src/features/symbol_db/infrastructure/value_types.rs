//! Expression value types
//!
//! Leaves take their type from literals and variables; operators combine
//! the types of their operands bottom-up over the AST.

use super::calls::callee_name;
use super::declarations::base_value_type;
use crate::config::Platform;
use crate::features::library::{ContainerYield, Library};
use crate::features::symbol_db::domain::SymbolDatabase;
use crate::features::tokenizer::infrastructure::numbers::{is_float_literal, parse_integer};
use crate::features::tokenizer::{BaseType, Sign, TokenFlags, TokenKind, TokenList, ValueType};
use crate::shared::models::TokenId;

const MAX_DEPTH: usize = 512;

struct TypeSetter<'a> {
    list: &'a mut TokenList,
    db: &'a SymbolDatabase,
    platform: &'a Platform,
    library: &'a Library,
}

/// Attach a `ValueType` to every literal, variable and typed expression
pub fn set_value_types(list: &mut TokenList, db: &SymbolDatabase, platform: &Platform, library: &Library) {
    let tokens: Vec<TokenId> = list.iter().collect();
    let mut setter = TypeSetter {
        list,
        db,
        platform,
        library,
    };
    for &t in &tokens {
        if let Some(vt) = setter.leaf_type(t) {
            setter.list[t].value_type = Some(vt);
        }
    }
    for &t in &tokens {
        let tok = &setter.list[t];
        if tok.ast_parent.is_none() && (tok.ast_op1.is_some() || tok.ast_op2.is_some()) {
            setter.visit(t, 0);
        }
    }
}

/// Type of an integer literal: suffixes first, then the smallest of
/// int/long that holds the value
pub fn integer_literal_type(text: &str) -> Option<ValueType> {
    let (value, suffix) = parse_integer(text)?;
    let sign = if suffix.unsigned { Sign::Unsigned } else { Sign::Signed };
    let base = match suffix.long_count {
        2 => BaseType::LongLong,
        1 => BaseType::Long,
        _ if value > i64::from(i32::MAX) || value < i64::from(i32::MIN) => BaseType::Long,
        _ => BaseType::Int,
    };
    Some(ValueType::new(sign, base, 0))
}

impl TypeSetter<'_> {
    fn leaf_type(&self, t: TokenId) -> Option<ValueType> {
        let tok = &self.list[t];
        match tok.kind {
            TokenKind::Number => {
                if is_float_literal(&tok.text) {
                    let base = if tok.text.ends_with(['f', 'F']) && !tok.text.starts_with("0x") {
                        BaseType::Float
                    } else if tok.text.ends_with(['l', 'L']) {
                        BaseType::LongDouble
                    } else {
                        BaseType::Double
                    };
                    Some(ValueType::new(Sign::Unknown, base, 0))
                } else {
                    integer_literal_type(&tok.text)
                }
            }
            TokenKind::Char => Some(ValueType::new(Sign::Unknown, BaseType::Char, 0)),
            TokenKind::String => {
                let mut vt = ValueType::new(Sign::Unknown, BaseType::Char, 1);
                vt.constness = 0b10;
                Some(vt)
            }
            TokenKind::Boolean => Some(ValueType::bool()),
            _ if tok.text == "nullptr" => Some(ValueType::new(Sign::Unknown, BaseType::Nullptr, 0)),
            _ => {
                let var = self.db.variable(tok.variable?);
                var.value_type.clone()
            }
        }
    }

    fn visit(&mut self, t: TokenId, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        let (op1, op2) = (self.list[t].ast_op1, self.list[t].ast_op2);
        if let Some(c) = op1 {
            self.visit(c, depth + 1);
        }
        if let Some(c) = op2 {
            self.visit(c, depth + 1);
        }
        if self.list[t].value_type.is_none() {
            if let Some(vt) = self.node_type(t, op1, op2) {
                self.list[t].value_type = Some(vt);
            }
        }
    }

    fn type_of(&self, t: Option<TokenId>) -> Option<ValueType> {
        t.and_then(|t| self.list[t].value_type.clone())
    }

    fn node_type(&self, t: TokenId, op1: Option<TokenId>, op2: Option<TokenId>) -> Option<ValueType> {
        let tok = &self.list[t];
        let text = tok.text.as_str();
        let unary = op1.is_some() && op2.is_none();
        match text {
            "(" if tok.flags.contains(TokenFlags::CAST) => self.cast_type(t),
            "(" => self.call_type(t),
            "[" => {
                let base = self.type_of(op1)?;
                if base.pointer > 0 {
                    Some(base.deref())
                } else {
                    None
                }
            }
            "." | "::" => self.type_of(op2),
            "sizeof" | "alignof" => Some(ValueType::size_t()),
            "!" | "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" => Some(ValueType::bool()),
            "*" if unary => self.type_of(op1).filter(|vt| vt.pointer > 0).map(|vt| vt.deref()),
            "&" if unary => self.type_of(op1).map(|vt| vt.address_of()),
            "-" | "+" | "~" if unary => self.type_of(op1).map(|vt| vt.promoted()),
            "++" | "--" => self.type_of(op1),
            "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" => {
                let a = self.type_of(op1)?;
                let b = self.type_of(op2)?;
                if text == "-" && a.pointer > 0 && b.pointer > 0 {
                    // pointer difference
                    return Some(ValueType::new(Sign::Signed, BaseType::Long, 0));
                }
                if a.pointer == 0 && !a.is_arithmetic() || b.pointer == 0 && !b.is_arithmetic() {
                    return None;
                }
                Some(ValueType::arithmetic_result(&a, &b, self.platform))
            }
            "<<" | ">>" => self.type_of(op1).filter(|vt| vt.is_integral()).map(|vt| vt.promoted()),
            "?" => {
                let colon = op2?;
                self.type_of(self.list[colon].ast_op1)
                    .or_else(|| self.type_of(self.list[colon].ast_op2))
            }
            "," => self.type_of(op2),
            _ if tok.is_assignment_op() => self.type_of(op1),
            _ => None,
        }
    }

    fn cast_type(&self, open: TokenId) -> Option<ValueType> {
        let close = self.list.link(open)?;
        let first = self.list.next(open)?;
        let mut pointer = 0;
        let mut base_end = self.list.prev(close)?;
        let mut cur = Some(first);
        let mut saw_star = false;
        while let Some(c) = cur.filter(|&c| c != close) {
            if self.list.text(c) == "*" {
                pointer += 1;
                if !saw_star {
                    saw_star = true;
                    base_end = self.list.prev(c)?;
                }
            }
            cur = self.list.next(c);
        }
        let mut vt = base_value_type(self.list, first, base_end, self.library);
        if vt.base == BaseType::Unknown {
            return None;
        }
        vt.pointer = pointer;
        Some(vt)
    }

    fn call_type(&self, open: TokenId) -> Option<ValueType> {
        let name = callee_name(self.list, open)?;
        if let Some(f) = self.db.function_of(self.list, name) {
            return f.return_value_type.clone();
        }
        // container member call `c.size()`
        let callee = self.list[open].ast_op1?;
        if self.list.text(callee) != "." {
            return None;
        }
        let object = self.type_of(self.list[callee].ast_op1)?;
        if !object.is_container() {
            return None;
        }
        let container = self.library.container(&object.type_name)?;
        match container.yield_of(self.list.text(name))? {
            ContainerYield::Size => Some(ValueType::size_t()),
            ContainerYield::Empty => Some(ValueType::bool()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlatformKind, Settings};
    use crate::features::symbol_db::infrastructure::calls::link_calls;
    use crate::features::symbol_db::infrastructure::scope_builder::ScopeBuilder;
    use crate::features::tokenizer::Tokenizer;

    fn typed(code: &str) -> TokenList {
        let mut list = Tokenizer::new(&Settings::default()).tokenize_str(code, "t.cpp").unwrap().list;
        let library = Library::standard().unwrap();
        let db = ScopeBuilder::new(&mut list, &library).build();
        link_calls(&mut list, &db);
        set_value_types(&mut list, &db, &Platform::from_kind(PlatformKind::Unix64), &library);
        list
    }

    fn type_at(list: &TokenList, text: &str, n: usize) -> String {
        let t = list.iter().filter(|&t| list.text(t) == text).nth(n).unwrap();
        list[t].value_type.as_ref().map(|vt| vt.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(integer_literal_type("1").unwrap().base, BaseType::Int);
        assert_eq!(integer_literal_type("1u").unwrap().sign, Sign::Unsigned);
        assert_eq!(integer_literal_type("3000000000").unwrap().base, BaseType::Long);
        assert_eq!(integer_literal_type("1LL").unwrap().base, BaseType::LongLong);
    }

    #[test]
    fn test_arithmetic_conversions() {
        let list = typed("void f(unsigned int u, char c, double d) { u + 1; c + c; d * 2; c < 1; }");
        assert_eq!(list[list.iter().find(|&t| list.text(t) == "+").unwrap()].value_type.as_ref().unwrap().sign, Sign::Unsigned);
        let plus2 = list.iter().filter(|&t| list.text(t) == "+").nth(1).unwrap();
        assert_eq!(list[plus2].value_type.as_ref().unwrap().base, BaseType::Int);
        let star = list.iter().find(|&t| list.text(t) == "*").unwrap();
        assert_eq!(list[star].value_type.as_ref().unwrap().base, BaseType::Double);
        let lt = list.iter().find(|&t| list.text(t) == "<").unwrap();
        assert_eq!(list[lt].value_type, Some(ValueType::bool()));
    }

    #[test]
    fn test_pointer_deref_and_subscript() {
        let list = typed("void f(int *p, int a[4]) { *p; a[1]; &a[0]; }");
        let star = list.iter().filter(|&t| list.text(t) == "*").nth(1).unwrap();
        let vt = list[star].value_type.clone().unwrap();
        assert_eq!((vt.base, vt.pointer), (BaseType::Int, 0));
        let sub = list.iter().filter(|&t| list.text(t) == "[").nth(1).unwrap();
        assert_eq!(list[sub].value_type.as_ref().unwrap().pointer, 0);
        let amp = list.iter().find(|&t| list.text(t) == "&").unwrap();
        assert_eq!(list[amp].value_type.as_ref().unwrap().pointer, 1);
    }

    #[test]
    fn test_call_and_container_member_types() {
        let list = typed("long g(); void f(std::vector<int> v) { g(); v.size(); v.empty(); }");
        let g_call = list.iter().filter(|&t| list.text(t) == "(").nth(2).unwrap();
        assert_eq!(list[g_call].value_type.as_ref().unwrap().base, BaseType::Long);
        assert_eq!(type_at(&list, "(", 3), ValueType::size_t().to_string());
        assert_eq!(type_at(&list, "(", 4), "bool");
    }
}
