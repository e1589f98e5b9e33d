//! Token model

use super::value_type::ValueType;
use crate::features::value_flow::domain::{Value, ValueData, ValueKind};
use crate::shared::models::{FunctionId, ScopeId, TokenId, VariableId};
use bitflags::bitflags;
use lazy_static::lazy_static;
use rustc_hash::FxHashSet;

bitflags! {
    /// Semantic flags set by the lexer, the preprocessor and simplification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TokenFlags: u32 {
        /// Produced by a macro expansion
        const EXPANDED_MACRO = 1 << 0;
        const UNSIGNED = 1 << 1;
        const SIGNED = 1 << 2;
        /// `long long` / `long double`
        const LONG = 1 << 3;
        /// `=` introduced by splitting `T x = v;`
        const SPLIT_VAR_DECL_EQ = 1 << 4;
        /// `(` of a C-style cast
        const CAST = 1 << 5;
        const TEMPLATE_ARG = 1 << 6;
        const STANDARD_TYPE = 1 << 7;
        /// Inserted by typedef expansion
        const EXPANDED_TYPEDEF = 1 << 8;
        /// Type could not be completed
        const INCOMPLETE = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Keyword,
    Boolean,
    Number,
    Char,
    String,
    Op,
    Bracket,
    Other,
}

lazy_static! {
    static ref KEYWORDS: FxHashSet<&'static str> = [
        "alignas", "alignof", "asm", "auto", "break", "case", "catch", "class", "const",
        "constexpr", "const_cast", "continue", "decltype", "default", "delete", "do",
        "dynamic_cast", "else", "enum", "explicit", "export", "extern", "final", "for",
        "friend", "goto", "if", "inline", "mutable", "namespace", "new", "noexcept",
        "nullptr", "operator", "override", "private", "protected", "public", "register",
        "reinterpret_cast", "restrict", "return", "sizeof", "static", "static_assert",
        "static_cast", "struct", "switch", "template", "this", "throw", "try", "typedef",
        "typeid", "typename", "union", "using", "virtual", "volatile", "while",
        "__restrict", "__inline", "__forceinline",
    ]
    .into_iter()
    .collect();

    static ref STANDARD_TYPES: FxHashSet<&'static str> = [
        "bool", "_Bool", "char", "char16_t", "char32_t", "short", "int", "long", "float",
        "double", "wchar_t", "size_t", "void", "unsigned", "signed",
    ]
    .into_iter()
    .collect();
}

impl TokenKind {
    pub fn classify(text: &str) -> Self {
        let Some(first) = text.chars().next() else {
            return Self::Other;
        };
        match first {
            '"' => Self::String,
            '\'' => Self::Char,
            '0'..='9' => Self::Number,
            '.' if text.len() > 1 && text.as_bytes()[1].is_ascii_digit() => Self::Number,
            '(' | ')' | '[' | ']' | '{' | '}' => Self::Bracket,
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                if let Some(quote) = text.find(|c| c == '"' || c == '\'') {
                    // encoding prefix: L"..", u8"..", R"(..)"
                    return if text.as_bytes()[quote] == b'"' {
                        Self::String
                    } else {
                        Self::Char
                    };
                }
                if text == "true" || text == "false" {
                    Self::Boolean
                } else if KEYWORDS.contains(text) {
                    Self::Keyword
                } else {
                    Self::Name
                }
            }
            _ if text.chars().all(|c| "+-*/%<>=!&|^~?:;,.#".contains(c)) => Self::Op,
            _ => Self::Other,
        }
    }
}

pub fn is_standard_type(text: &str) -> bool {
    STANDARD_TYPES.contains(text)
}

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(text)
}

/// One lexical unit living in a `TokenList` arena
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub flags: TokenFlags,
    pub file_index: u32,
    pub line: u32,
    pub column: u32,

    pub prev: Option<TokenId>,
    pub next: Option<TokenId>,
    /// Matching bracket
    pub link: Option<TokenId>,

    /// Variable id, 0 when unresolved
    pub var_id: u32,
    pub variable: Option<VariableId>,
    pub function: Option<FunctionId>,
    pub scope: Option<ScopeId>,

    pub ast_parent: Option<TokenId>,
    pub ast_op1: Option<TokenId>,
    pub ast_op2: Option<TokenId>,

    /// Text before a rewrite (`->`, typedef name)
    pub original_name: Option<String>,
    pub value_type: Option<ValueType>,
    pub values: Vec<Value>,

    pub(crate) deleted: bool,
}

impl Token {
    pub fn new(text: impl Into<String>, file_index: u32, line: u32, column: u32) -> Self {
        let text = text.into();
        let kind = TokenKind::classify(&text);
        let mut flags = TokenFlags::empty();
        if kind == TokenKind::Name && is_standard_type(&text) {
            flags |= TokenFlags::STANDARD_TYPE;
        }
        Self {
            text,
            kind,
            flags,
            file_index,
            line,
            column,
            prev: None,
            next: None,
            link: None,
            var_id: 0,
            variable: None,
            function: None,
            scope: None,
            ast_parent: None,
            ast_op1: None,
            ast_op2: None,
            original_name: None,
            value_type: None,
            values: Vec::new(),
            deleted: false,
        }
    }

    pub fn str(&self) -> &str {
        &self.text
    }

    /// Replace the text and reclassify
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.kind = TokenKind::classify(&self.text);
        self.flags.set(
            TokenFlags::STANDARD_TYPE,
            self.kind == TokenKind::Name && is_standard_type(&self.text),
        );
    }

    // ------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------

    /// Identifier, keyword or boolean literal
    pub fn is_name(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Name | TokenKind::Keyword | TokenKind::Boolean
        )
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Name
    }

    pub fn is_keyword(&self) -> bool {
        self.kind == TokenKind::Keyword
    }

    pub fn is_number(&self) -> bool {
        self.kind == TokenKind::Number
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number | TokenKind::Char | TokenKind::String | TokenKind::Boolean
        )
    }

    pub fn is_standard_type(&self) -> bool {
        self.flags.contains(TokenFlags::STANDARD_TYPE)
    }

    pub fn is_op(&self) -> bool {
        self.kind == TokenKind::Op && !matches!(self.text.as_str(), ";" | "," | "::" | "?" | ":" | "#" | "##" | "...")
    }

    pub fn is_assignment_op(&self) -> bool {
        matches!(
            self.text.as_str(),
            "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>="
        )
    }

    pub fn is_comparison_op(&self) -> bool {
        matches!(self.text.as_str(), "==" | "!=" | "<" | "<=" | ">" | ">=")
    }

    pub fn is_arithmetical_op(&self) -> bool {
        matches!(self.text.as_str(), "+" | "-" | "*" | "/" | "%" | "<<" | ">>")
    }

    pub fn is_inc_dec(&self) -> bool {
        matches!(self.text.as_str(), "++" | "--")
    }

    /// Operator that computes a value without side effects
    pub fn is_constant_op(&self) -> bool {
        self.is_arithmetical_op()
            || self.is_comparison_op()
            || matches!(self.text.as_str(), "&" | "|" | "^" | "~" | "!" | "&&" | "||")
    }

    pub fn is_opening_bracket(&self) -> bool {
        matches!(self.text.as_str(), "(" | "[" | "{")
            || (self.text == "<" && self.link.is_some())
    }

    pub fn is_closing_bracket(&self) -> bool {
        matches!(self.text.as_str(), ")" | "]" | "}")
            || (self.text == ">" && self.link.is_some())
    }

    pub fn is_expanded_macro(&self) -> bool {
        self.flags.contains(TokenFlags::EXPANDED_MACRO)
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(TokenFlags::UNSIGNED)
    }

    pub fn is_long(&self) -> bool {
        self.flags.contains(TokenFlags::LONG)
    }

    pub fn is_cast(&self) -> bool {
        self.flags.contains(TokenFlags::CAST)
    }

    pub fn is_split_decl_eq(&self) -> bool {
        self.flags.contains(TokenFlags::SPLIT_VAR_DECL_EQ)
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn has_known_value(&self) -> bool {
        self.values.iter().any(|v| v.is_known())
    }

    /// Known integer value
    pub fn known_int(&self) -> Option<i64> {
        self.values.iter().find_map(|v| match (&v.data, v.kind) {
            (ValueData::Int(n), ValueKind::Known) => Some(*n),
            _ => None,
        })
    }

    pub fn has_known_int_value(&self, n: i64) -> bool {
        self.known_int() == Some(n)
    }

    /// Known or possible integer value equal to `n`
    pub fn value_of(&self, n: i64) -> Option<&Value> {
        self.values
            .iter()
            .find(|v| !v.is_impossible() && v.int_value() == Some(n))
    }

    /// Maximum non-impossible integer value
    pub fn max_int_value(&self) -> Option<&Value> {
        self.values
            .iter()
            .filter(|v| !v.is_impossible() && v.int_value().is_some())
            .max_by_key(|v| v.int_value())
    }
}

/// Content of a string literal without prefix, quotes and escapes
pub fn string_literal_value(text: &str) -> Option<String> {
    let quote = text.find('"')?;
    let prefix = &text[..quote];
    let body = &text[quote..];
    if prefix.ends_with('R') {
        // R"delim( ... )delim"
        let open = body.find('(')?;
        let delim = &body[1..open];
        let close = format!("){}\"", delim);
        let end = body.rfind(&close)?;
        return Some(body[open + 1..end].to_string());
    }
    let inner = body.strip_prefix('"')?.strip_suffix('"')?;
    Some(unescape(inner))
}

/// Numeric value of a character literal
pub fn char_literal_value(text: &str) -> Option<i64> {
    let quote = text.find('\'')?;
    let inner = text[quote..].strip_prefix('\'')?.strip_suffix('\'')?;
    let chars: Vec<char> = unescape(inner).chars().collect();
    match chars.as_slice() {
        [c] => Some(*c as i64),
        _ => None,
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('x') => {
                let mut value = 0u32;
                while let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    chars.next();
                }
                out.push(char::from_u32(value & 0xff).unwrap_or('\0'));
            }
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value & 0xff).unwrap_or('\0'));
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
