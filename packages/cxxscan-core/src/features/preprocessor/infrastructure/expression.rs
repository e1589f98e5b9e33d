//! `#if` / `#elif` expression evaluation
//!
//! `defined` is resolved before macro expansion; identifiers left after
//! expansion evaluate to 0. Arithmetic is done in `i64` with wrapping.

use super::errors::{PreprocessError, PreprocessResult};
use super::expand::{expand, MacroTable};
use crate::features::tokenizer::domain::char_literal_value;
use crate::features::tokenizer::infrastructure::numbers::parse_integer;
use crate::features::tokenizer::RawToken;
use crate::shared::models::FileLocation;

/// Evaluate the condition tokens of a directive
pub fn evaluate(tokens: &[RawToken], macros: &MacroTable, location: &FileLocation) -> PreprocessResult<bool> {
    let resolved = resolve_defined(tokens, macros);
    let expanded = expand(&resolved, macros);
    let mut parser = ExprParser {
        tokens: &expanded,
        pos: 0,
        location,
    };
    if expanded.is_empty() {
        return Err(parser.error("empty expression"));
    }
    let value = parser.ternary()?;
    if parser.pos < expanded.len() {
        return Err(parser.error(&format!("unexpected token '{}'", expanded[parser.pos].text)));
    }
    Ok(value != 0)
}

/// Names referenced by a condition, `defined` operands included
pub fn condition_names(tokens: &[RawToken]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| t.text != "defined" && t.text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'))
        .filter(|t| !matches!(t.text.as_str(), "true" | "false"))
        .map(|t| t.text.clone())
        .collect()
}

/// Replace `defined X` and `defined ( X )` with `1` / `0`
fn resolve_defined(tokens: &[RawToken], macros: &MacroTable) -> Vec<RawToken> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].text != "defined" {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let (name, consumed) = match tokens.get(i + 1).map(|t| t.text.as_str()) {
            Some("(") => (tokens.get(i + 2), 4),
            _ => (tokens.get(i + 1), 2),
        };
        let mut result = tokens[i].clone();
        result.text = if name.is_some_and(|n| macros.contains_key(&n.text)) { "1" } else { "0" }.to_string();
        out.push(result);
        i += consumed;
    }
    out
}

struct ExprParser<'a> {
    tokens: &'a [RawToken],
    pos: usize,
    location: &'a FileLocation,
}

fn binary_precedence(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

impl ExprParser<'_> {
    fn error(&self, message: &str) -> PreprocessError {
        PreprocessError::InvalidExpression {
            message: message.to_string(),
            location: self.location.clone(),
        }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|t| t.text.as_str())
    }

    fn expect(&mut self, text: &str) -> PreprocessResult<()> {
        if self.peek() == Some(text) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", text)))
        }
    }

    fn ternary(&mut self) -> PreprocessResult<i64> {
        let cond = self.binary(1)?;
        if self.peek() != Some("?") {
            return Ok(cond);
        }
        self.pos += 1;
        let then = self.ternary()?;
        self.expect(":")?;
        let other = self.ternary()?;
        Ok(if cond != 0 { then } else { other })
    }

    fn binary(&mut self, min: u8) -> PreprocessResult<i64> {
        let mut lhs = self.unary()?;
        while let Some(prec) = self.peek().and_then(binary_precedence) {
            if prec < min {
                break;
            }
            let op = self.tokens[self.pos].text.clone();
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = self.apply(&op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn apply(&self, op: &str, a: i64, b: i64) -> PreprocessResult<i64> {
        Ok(match op {
            "||" => ((a != 0) || (b != 0)) as i64,
            "&&" => ((a != 0) && (b != 0)) as i64,
            "|" => a | b,
            "^" => a ^ b,
            "&" => a & b,
            "==" => (a == b) as i64,
            "!=" => (a != b) as i64,
            "<" => (a < b) as i64,
            ">" => (a > b) as i64,
            "<=" => (a <= b) as i64,
            ">=" => (a >= b) as i64,
            "<<" => a.wrapping_shl(b as u32),
            ">>" => a.wrapping_shr(b as u32),
            "+" => a.wrapping_add(b),
            "-" => a.wrapping_sub(b),
            "*" => a.wrapping_mul(b),
            "/" | "%" if b == 0 => return Err(self.error("division by zero")),
            "/" => a.wrapping_div(b),
            "%" => a.wrapping_rem(b),
            _ => return Err(self.error(&format!("unknown operator '{}'", op))),
        })
    }

    fn unary(&mut self) -> PreprocessResult<i64> {
        match self.peek() {
            Some("!") => {
                self.pos += 1;
                Ok((self.unary()? == 0) as i64)
            }
            Some("-") => {
                self.pos += 1;
                Ok(self.unary()?.wrapping_neg())
            }
            Some("+") => {
                self.pos += 1;
                self.unary()
            }
            Some("~") => {
                self.pos += 1;
                Ok(!self.unary()?)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> PreprocessResult<i64> {
        let tokens = self.tokens;
        let Some(tok) = tokens.get(self.pos) else {
            return Err(self.error("unexpected end of expression"));
        };
        self.pos += 1;
        let text = tok.text.as_str();
        if text == "(" {
            let value = self.ternary()?;
            self.expect(")")?;
            return Ok(value);
        }
        if text == "true" {
            return Ok(1);
        }
        if text.starts_with(|c: char| c.is_ascii_digit()) {
            return parse_integer(text)
                .map(|(v, _)| v)
                .ok_or_else(|| self.error(&format!("invalid number '{}'", text)));
        }
        if text.starts_with('\'') || text.ends_with('\'') {
            return char_literal_value(text).ok_or_else(|| self.error(&format!("invalid character literal {}", text)));
        }
        if text.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
            return Ok(0);
        }
        Err(self.error(&format!("unexpected token '{}'", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::preprocessor::domain::MacroDef;
    use crate::features::tokenizer::lex;

    fn eval(src: &str, defined: &[(&str, &str)]) -> PreprocessResult<bool> {
        let mut macros = MacroTable::default();
        for (name, value) in defined {
            let body = lex(value, 0, "t.c").unwrap();
            macros.insert(name.to_string(), MacroDef::object(*name, body));
        }
        evaluate(&lex(src, 0, "t.c").unwrap(), &macros, &FileLocation::new("t.c", 1, 1))
    }

    #[test]
    fn test_defined() {
        assert!(eval("defined(A)", &[("A", "1")]).unwrap());
        assert!(eval("defined A && !defined B", &[("A", "")]).unwrap());
        assert!(!eval("defined(B)", &[]).unwrap());
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert!(eval("1 + 2 * 3 == 7", &[]).unwrap());
        assert!(eval("(1 << 4) > 15 ? 1 : 0", &[]).unwrap());
        assert!(eval("VERSION >= 0x0200", &[("VERSION", "0x0300")]).unwrap());
        assert!(!eval("UNKNOWN", &[]).unwrap());
        assert!(eval("'A' == 65", &[]).unwrap());
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval("1 / 0", &[]).unwrap_err();
        assert!(matches!(err, PreprocessError::InvalidExpression { .. }));
        assert!(!eval("0 && (1 / 1)", &[]).unwrap());
    }

    #[test]
    fn test_malformed() {
        assert!(eval("(1", &[]).is_err());
        assert!(eval("", &[]).is_err());
    }

    #[test]
    fn test_condition_names() {
        let toks = lex("defined(A) || B > 2", 0, "t.c").unwrap();
        assert_eq!(condition_names(&toks), vec!["A".to_string(), "B".to_string()]);
    }
}
