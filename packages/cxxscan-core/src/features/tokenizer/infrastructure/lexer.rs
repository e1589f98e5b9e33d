//! Character stream → raw tokens
//!
//! Maximal munch for operators, pp-numbers, string/char literals with
//! encoding prefixes and raw strings. Comments are dropped, line splices are
//! folded into the current logical line so the preprocessor can see whole
//! directives.

use super::errors::{TokenizeError, TokenizeResult};
use crate::features::tokenizer::domain::TokenFlags;
use crate::shared::models::FileLocation;

/// Token produced by the lexer and consumed by the preprocessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub text: String,
    pub file_index: u32,
    pub line: u32,
    pub column: u32,
    /// Physical line where the logical (spliced) line starts
    pub logical_line: u32,
    pub flags: TokenFlags,
}

impl RawToken {
    pub fn new(text: impl Into<String>, file_index: u32, line: u32, column: u32) -> Self {
        Self {
            text: text.into(),
            file_index,
            line,
            column,
            logical_line: line,
            flags: TokenFlags::empty(),
        }
    }
}

const OPERATORS_3: [&str; 5] = [">>=", "<<=", "...", "->*", "<=>"];
const OPERATORS_2: [&str; 22] = [
    "::", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", ".*", "##",
];
const ENCODING_PREFIXES: [&str; 9] = ["L", "u", "U", "u8", "R", "LR", "uR", "UR", "u8R"];

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    logical_line: u32,
    file_index: u32,
    file_name: &'a str,
    out: Vec<RawToken>,
}

/// Split `source` into raw tokens
pub fn lex(source: &str, file_index: u32, file_name: &str) -> TokenizeResult<Vec<RawToken>> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        logical_line: 1,
        file_index,
        file_name,
        out: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.out)
}

impl Lexer<'_> {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>, line: u32, column: u32) -> TokenizeError {
        TokenizeError::syntax(message, FileLocation::new(self.file_name, line, column))
    }

    /// Backslash-newline at the current position
    fn splice_len(&self) -> usize {
        match (self.peek(0), self.peek(1), self.peek(2)) {
            (Some('\\'), Some('\n'), _) => 2,
            (Some('\\'), Some('\r'), Some('\n')) => 3,
            _ => 0,
        }
    }

    fn push(&mut self, text: String, line: u32, column: u32) {
        self.out.push(RawToken {
            text,
            file_index: self.file_index,
            line,
            column,
            logical_line: self.logical_line,
            flags: TokenFlags::empty(),
        });
    }

    fn run(&mut self) -> TokenizeResult<()> {
        while let Some(c) = self.peek(0) {
            let splice = self.splice_len();
            if splice > 0 {
                for _ in 0..splice {
                    self.bump();
                }
                continue;
            }
            if c == '\n' {
                self.bump();
                self.logical_line = self.line;
                continue;
            }
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c == '/' && self.peek(1) == Some('/') {
                self.line_comment();
                continue;
            }
            if c == '/' && self.peek(1) == Some('*') {
                self.block_comment()?;
                continue;
            }

            let (line, column) = (self.line, self.column);
            if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
                let text = self.number();
                self.push(text, line, column);
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                let ident = self.identifier();
                let quote = self.peek(0);
                if ENCODING_PREFIXES.contains(&ident.as_str()) && quote == Some('"') {
                    let text = if ident.ends_with('R') {
                        self.raw_string(ident, line, column)?
                    } else {
                        self.quoted(ident, '"', line, column)?
                    };
                    self.push(text, line, column);
                } else if matches!(ident.as_str(), "L" | "u" | "U" | "u8") && quote == Some('\'') {
                    let text = self.quoted(ident, '\'', line, column)?;
                    self.push(text, line, column);
                } else {
                    self.push(ident, line, column);
                }
            } else if c == '"' || c == '\'' {
                let text = self.quoted(String::new(), c, line, column)?;
                self.push(text, line, column);
            } else {
                let text = self.operator();
                self.push(text, line, column);
            }
        }
        Ok(())
    }

    fn line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if self.splice_len() > 0 {
                // spliced comment continues on the next line
                for _ in 0..self.splice_len() {
                    self.bump();
                }
                continue;
            }
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn block_comment(&mut self) -> TokenizeResult<()> {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.bump();
        loop {
            match self.peek(0) {
                Some('*') if self.peek(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(self.error("Unterminated comment", line, column)),
            }
        }
    }

    fn number(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            let prev = text.chars().last();
            let is_hex = text.starts_with("0x") || text.starts_with("0X");
            let exponent_sign = matches!(c, '+' | '-')
                && match prev {
                    Some('e' | 'E') => !is_hex,
                    Some('p' | 'P') => is_hex,
                    _ => false,
                };
            let separator = c == '\''
                && prev.is_some_and(|p| p.is_ascii_hexdigit())
                && self.peek(1).is_some_and(|d| d.is_ascii_hexdigit());
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign || separator {
                if c != '\'' {
                    text.push(c);
                }
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn quoted(&mut self, mut text: String, quote: char, line: u32, column: u32) -> TokenizeResult<String> {
        text.push(quote);
        self.bump();
        loop {
            match self.peek(0) {
                Some('\\') if self.splice_len() > 0 => {
                    for _ in 0..self.splice_len() {
                        self.bump();
                    }
                }
                Some('\\') => {
                    text.push('\\');
                    self.bump();
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                }
                Some(c) if c == quote => {
                    text.push(c);
                    self.bump();
                    return Ok(text);
                }
                Some('\n') | None => {
                    let what = if quote == '"' { "string" } else { "character" };
                    return Err(self.error(format!("Unterminated {} literal", what), line, column));
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn raw_string(&mut self, mut text: String, line: u32, column: u32) -> TokenizeResult<String> {
        text.push('"');
        self.bump();
        let mut delim = String::new();
        while let Some(c) = self.peek(0) {
            if c == '(' {
                break;
            }
            if c == '\n' || delim.len() > 16 {
                return Err(self.error("Invalid raw string delimiter", line, column));
            }
            delim.push(c);
            self.bump();
        }
        let terminator: Vec<char> = format!("){}\"", delim).chars().collect();
        text.push_str(&delim);
        loop {
            if self.pos >= self.chars.len() {
                return Err(self.error("Unterminated raw string literal", line, column));
            }
            if self.chars[self.pos..].starts_with(&terminator) {
                for _ in 0..terminator.len() {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                return Ok(text);
            }
            if let Some(c) = self.bump() {
                text.push(c);
            }
        }
    }

    fn operator(&mut self) -> String {
        let rest: String = self.chars[self.pos..self.chars.len().min(self.pos + 3)]
            .iter()
            .collect();
        let text = OPERATORS_3
            .iter()
            .chain(OPERATORS_2.iter())
            .find(|op| rest.starts_with(**op))
            .map(|op| op.to_string())
            .unwrap_or_else(|| rest.chars().take(1).collect());
        for _ in 0..text.chars().count() {
            self.bump();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(src: &str) -> Vec<String> {
        lex(src, 0, "test.c")
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_maximal_munch() {
        assert_eq!(texts("a>>=b"), vec!["a", ">>=", "b"]);
        assert_eq!(texts("p->*m"), vec!["p", "->*", "m"]);
        assert_eq!(texts("x+++y"), vec!["x", "++", "+", "y"]);
        assert_eq!(texts("f(...)"), vec!["f", "(", "...", ")"]);
        assert_eq!(texts("a::b"), vec!["a", "::", "b"]);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(texts("a /* x */ b // c\nd"), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_literals() {
        assert_eq!(texts(r#"s = L"w" + u8"x";"#), vec!["s", "=", "L\"w\"", "+", "u8\"x\"", ";"]);
        assert_eq!(texts(r#"c = '\'';"#), vec!["c", "=", r"'\''", ";"]);
        assert_eq!(texts(r#"R"d(a)"b)d""#), vec![r#"R"d(a)"b)d""#]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(texts("1e+5 0x1p-3 1'000 .5f 0xE+1"), vec!["1e+5", "0x1p-3", "1000", ".5f", "0xE", "+", "1"]);
    }

    #[test]
    fn test_splice_keeps_logical_line() {
        let toks = lex("#define A \\\n 1\nint", 0, "t.c").unwrap();
        let one = toks.iter().find(|t| t.text == "1").unwrap();
        assert_eq!(one.line, 2);
        assert_eq!(one.logical_line, 1);
        let int = toks.iter().find(|t| t.text == "int").unwrap();
        assert_eq!(int.logical_line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex("x = \"abc\n;", 0, "t.c").unwrap_err();
        assert_eq!(err.location().line, 1);
    }

    #[test]
    fn test_columns() {
        let toks = lex("int  x;", 0, "t.c").unwrap();
        assert_eq!(toks[1].column, 6);
    }
}
