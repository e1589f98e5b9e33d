//! Literal seeds: numbers, booleans, null pointers, characters, strings

use crate::features::tokenizer::domain::char_literal_value;
use crate::features::tokenizer::infrastructure::numbers::{is_float_literal, parse_float, parse_integer};
use crate::features::tokenizer::{TokenKind, TokenList};
use crate::features::value_flow::domain::{Value, ValueData};
use crate::features::value_flow::ports::{PassContext, ValueFlowPass};
use crate::shared::models::TokenId;

pub struct LiteralPass;

pub struct StringLiteralPass;

/// Value of a number, boolean, null pointer or character literal
pub fn literal_value(list: &TokenList, t: TokenId) -> Option<Value> {
    let tok = &list[t];
    match tok.kind {
        TokenKind::Number if is_float_literal(&tok.text) => parse_float(&tok.text).map(Value::float),
        TokenKind::Number => parse_integer(&tok.text).map(|(n, _)| Value::int(n)),
        TokenKind::Boolean => Some(Value::int(i64::from(tok.text == "true"))),
        TokenKind::Char => char_literal_value(&tok.text).map(Value::int),
        _ if tok.text == "nullptr" => Some(Value::int(0)),
        // NULL survives only when no header defined it
        _ if tok.text == "NULL" && tok.var_id == 0 => Some(Value::int(0)),
        _ => None,
    }
}

impl ValueFlowPass for LiteralPass {
    fn name(&self) -> &'static str {
        "literals"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let seeds: Vec<(TokenId, Value)> = ctx
            .list
            .iter()
            .filter_map(|t| literal_value(ctx.list, t).map(|v| (t, v)))
            .collect();
        seeds
            .into_iter()
            .filter(|(t, v)| ctx.add_value(*t, v.clone()))
            .count()
    }
}

impl ValueFlowPass for StringLiteralPass {
    fn name(&self) -> &'static str {
        "string-literals"
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> usize {
        let strings: Vec<TokenId> = ctx
            .list
            .iter()
            .filter(|&t| ctx.list[t].kind == TokenKind::String)
            .collect();
        strings
            .into_iter()
            .filter(|&t| ctx.add_value(t, Value::new(ValueData::Tok(t))))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{analyze, ints, run, values};
    use super::*;

    #[test]
    fn test_literal_values() {
        let mut a = analyze("void f() { g(10, 0x10, true, 'a', nullptr, 1.5); }");
        run(&mut a, &[&LiteralPass], 1);
        assert_eq!(ints(&a, "10", 0), vec![10]);
        assert_eq!(ints(&a, "0x10", 0), vec![16]);
        assert_eq!(ints(&a, "true", 0), vec![1]);
        assert_eq!(ints(&a, "'a'", 0), vec![97]);
        assert_eq!(ints(&a, "nullptr", 0), vec![0]);
        assert_eq!(values(&a, "1.5", 0)[0].float_value(), Some(1.5));
    }

    #[test]
    fn test_second_run_adds_nothing() {
        let mut a = analyze("void f() { g(\"abc\", 3); }");
        run(&mut a, &[&LiteralPass, &StringLiteralPass], 1);
        let before: usize = a.list.iter().map(|t| a.list[t].values.len()).sum();
        run(&mut a, &[&LiteralPass, &StringLiteralPass], 1);
        let after: usize = a.list.iter().map(|t| a.list[t].values.len()).sum();
        assert_eq!(before, 2);
        assert_eq!(before, after);
    }
}
