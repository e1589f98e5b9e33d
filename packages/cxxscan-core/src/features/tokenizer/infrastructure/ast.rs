//! AST construction
//!
//! The AST is stored in the token list itself (`ast_parent`, `ast_op1`,
//! `ast_op2`). A statement walker finds expressions; each expression is
//! parsed by precedence climbing over a bounded token range. Shapes:
//!
//! * binary operator: op1 = lhs, op2 = rhs
//! * unary operator: op1 = operand (prefix/postfix told apart by position)
//! * call `f(a, b)`: `(` with op1 = callee, op2 = argument tree (`,` chain)
//! * subscript `a[i]`: `[` with op1 = a, op2 = i
//! * member access `a.b` / `a::b`: op1 = a, op2 = b
//! * C-style cast: `(` flagged `CAST`, op1 = operand
//! * ternary `c ? a : b`: `?` with op1 = c, op2 = `:` (op1 = a, op2 = b)
//! * control statement: `(` with op1 = keyword, op2 = condition; `for`
//!   uses `;` chains (`;`.op1 = init, `;`.op2 = next `;`), range-for a `:`
//! * `return x`: op1 = x

use super::errors::{TokenizeError, TokenizeResult};
use crate::features::tokenizer::domain::{TokenFlags, TokenKind, TokenList};
use crate::shared::models::TokenId;

const MAX_DEPTH: usize = 512;

const PREC_COMMA: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_TERNARY: u8 = 3;
const PREC_UNARY: u8 = 14;

fn binary_precedence(text: &str) -> Option<u8> {
    Some(match text {
        "," => PREC_COMMA,
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "<<=" | ">>=" => PREC_ASSIGN,
        "?" => PREC_TERNARY,
        "||" => 4,
        "&&" => 5,
        "|" => 6,
        "^" => 7,
        "&" => 8,
        "==" | "!=" => 9,
        "<" | "<=" | ">" | ">=" | "<=>" => 10,
        "<<" | ">>" => 11,
        "+" | "-" => 12,
        "*" | "/" | "%" => 13,
        ".*" | "->*" => PREC_UNARY,
        _ => return None,
    })
}

/// Build ASTs for every statement in the list
pub fn create_ast(list: &mut TokenList) -> TokenizeResult<()> {
    let mut pending = vec![(list.front(), None)];
    while let Some((start, end)) = pending.pop() {
        let mut walker = StatementWalker {
            list: &mut *list,
            lambdas: Vec::new(),
        };
        walker.walk(start, end)?;
        pending.extend(walker.lambdas.into_iter());
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Statement level
// ═══════════════════════════════════════════════════════════════════════════

struct StatementWalker<'a> {
    list: &'a mut TokenList,
    /// Lambda bodies found inside expressions, walked afterwards
    lambdas: Vec<(Option<TokenId>, Option<TokenId>)>,
}

impl StatementWalker<'_> {
    fn walk(&mut self, start: Option<TokenId>, end: Option<TokenId>) -> TokenizeResult<()> {
        let mut cur = start;
        while let Some(t) = cur {
            if Some(t) == end {
                break;
            }
            let next = self.statement(t, end)?;
            // always make progress
            cur = match next {
                Some(n) if n != t => Some(n),
                _ => self.list.next(t),
            };
        }
        Ok(())
    }

    /// Handle the statement at `t`, return where to continue
    fn statement(&mut self, t: TokenId, end: Option<TokenId>) -> TokenizeResult<Option<TokenId>> {
        let list = &*self.list;
        let text = list.text(t).to_string();
        match text.as_str() {
            "{" | "}" | ";" | "do" | "else" | "try" => return Ok(list.next(t)),
            "if" | "while" | "switch" if list.str_at(t, 1) == "(" => return self.control(t),
            "for" if list.str_at(t, 1) == "(" => return self.for_loop(t),
            "catch" | "asm" | "static_assert" | "__attribute__" if list.str_at(t, 1) == "(" => {
                let close = list.next(t).and_then(|o| list.link(o));
                return Ok(close.and_then(|c| list.next(c)));
            }
            "return" | "throw" | "co_return" => {
                let semi = find_statement_end(list, t, end);
                let root = self.expression(self.list.next(t), semi)?;
                self.list.set_ast_op1(t, root);
                return Ok(semi);
            }
            "case" => {
                let mut cur = self.list.next(t);
                while let Some(c) = cur {
                    if self.list.text(c) == ":" || self.list.text(c) == ";" {
                        return Ok(self.list.next(c));
                    }
                    cur = self.list.next(c);
                }
                return Ok(None);
            }
            "default" | "public" | "private" | "protected" if list.str_at(t, 1) == ":" => {
                return Ok(list.tok_at(t, 2));
            }
            "goto" | "break" | "continue" | "using" | "typedef" | "friend" => {
                return Ok(find_statement_end(list, t, end));
            }
            "template" => {
                return Ok(match list.next(t) {
                    Some(lt) if list.text(lt) == "<" && list.link(lt).is_some() => {
                        list.link(lt).and_then(|gt| list.next(gt))
                    }
                    other => other,
                });
            }
            "namespace" => {
                // step into the body; aliases end at `;`
                let mut cur = list.next(t);
                while let Some(c) = cur {
                    match list.text(c) {
                        "{" => return Ok(Some(c)),
                        ";" => return Ok(list.next(c)),
                        _ => cur = list.next(c),
                    }
                }
                return Ok(None);
            }
            "enum" => return Ok(skip_enum(list, t)),
            "class" | "struct" | "union" => {
                if let Some(body) = class_body(list, t) {
                    return Ok(Some(body));
                }
            }
            _ => {}
        }

        // label
        if list[t].is_identifier() && list.str_at(t, 1) == ":" {
            return Ok(list.tok_at(t, 2));
        }
        if let Some(body) = function_body(list, t) {
            return Ok(Some(body));
        }
        if let Some(name) = declaration_name(list, t) {
            let semi = find_statement_end(list, t, end);
            if matches!(list.str_at(name, 1), "=" | "[") {
                self.expression(Some(name), semi)?;
            }
            return Ok(semi);
        }
        let semi = find_statement_end(list, t, end);
        self.expression(Some(t), semi)?;
        Ok(semi)
    }

    /// `if (...)`, `while (...)`, `switch (...)`
    fn control(&mut self, keyword: TokenId) -> TokenizeResult<Option<TokenId>> {
        let Some(open) = self.list.next(keyword) else {
            return Ok(None);
        };
        let Some(close) = self.list.link(open) else {
            return Ok(self.list.next(open));
        };
        let first = self.list.next(open).filter(|&f| f != close);
        let start = match first {
            Some(f) => declaration_name(self.list, f).or(Some(f)),
            None => None,
        };
        let cond = match start {
            Some(_) => self.expression(start, Some(close))?,
            None => None,
        };
        self.list.set_ast_op1(open, Some(keyword));
        self.list.set_ast_op2(open, cond);
        Ok(self.list.next(close))
    }

    fn for_loop(&mut self, keyword: TokenId) -> TokenizeResult<Option<TokenId>> {
        let Some(open) = self.list.next(keyword) else {
            return Ok(None);
        };
        let Some(close) = self.list.link(open) else {
            return Ok(self.list.next(open));
        };
        let mut semicolons = Vec::new();
        let mut colon = None;
        let mut cur = self.list.next(open);
        while let Some(c) = cur {
            if c == close {
                break;
            }
            match self.list.text(c) {
                ";" => semicolons.push(c),
                ":" if colon.is_none() => colon = Some(c),
                _ => {}
            }
            cur = match self.list.link(c) {
                Some(l) if self.list[c].is_opening_bracket() => self.list.next(l),
                _ => self.list.next(c),
            };
        }
        self.list.set_ast_op1(open, Some(keyword));

        if let [s1, s2] = semicolons[..] {
            let init_start = self.list.next(open).filter(|&f| f != s1);
            let init_start = init_start.map(|f| declaration_name(self.list, f).unwrap_or(f));
            let init = self.expression(init_start, Some(s1))?;
            let cond = self.expression(self.list.next(s1), Some(s2))?;
            let step = self.expression(self.list.next(s2), Some(close))?;
            self.list.set_ast_op1(s1, init);
            self.list.set_ast_op2(s1, Some(s2));
            self.list.set_ast_op1(s2, cond);
            self.list.set_ast_op2(s2, step);
            self.list.set_ast_op2(open, Some(s1));
        } else if let Some(colon) = colon {
            let var = self.list.prev(colon).filter(|&v| v != open);
            let range = self.expression(self.list.next(colon), Some(close))?;
            self.list.set_ast_op1(colon, var);
            self.list.set_ast_op2(colon, range);
            self.list.set_ast_op2(open, Some(colon));
        }
        Ok(self.list.next(close))
    }

    fn expression(&mut self, start: Option<TokenId>, end: Option<TokenId>) -> TokenizeResult<Option<TokenId>> {
        if start.is_none() || start == end {
            return Ok(None);
        }
        let mut parser = ExprParser {
            list: &mut *self.list,
            pos: start,
            end,
            depth: 0,
            lambdas: &mut self.lambdas,
        };
        let root = parser.parse(0)?;
        // trailing tokens the grammar did not consume get their own trees
        while !parser.at_end() {
            let before = parser.pos;
            parser.parse(0)?;
            if parser.pos == before {
                parser.advance();
            }
        }
        Ok(root)
    }
}

/// Exclusive end of the statement starting at `t`: its `;`, or the
/// closing bracket that ends the enclosing block
fn find_statement_end(list: &TokenList, t: TokenId, end: Option<TokenId>) -> Option<TokenId> {
    let mut cur = Some(t);
    while let Some(c) = cur {
        if Some(c) == end {
            return end;
        }
        match list.text(c) {
            ";" => return Some(c),
            "}" | ")" | "]" => return Some(c),
            "(" | "[" | "{" => cur = list.link(c).and_then(|l| list.next(l)),
            _ => cur = list.next(c),
        }
    }
    None
}

fn skip_enum(list: &TokenList, t: TokenId) -> Option<TokenId> {
    let mut cur = list.next(t);
    while let Some(c) = cur {
        match list.text(c) {
            ";" => return list.next(c),
            "{" => return list.link(c).and_then(|l| list.next(l)),
            _ => cur = list.next(c),
        }
    }
    None
}

/// `{` of `class NAME [final] [: bases] {`
pub fn class_body(list: &TokenList, t: TokenId) -> Option<TokenId> {
    let mut cur = list.next(t)?;
    if list[cur].is_identifier() {
        cur = list.next(cur)?;
    }
    loop {
        match list.text(cur) {
            "{" => return Some(cur),
            ";" | "=" | "(" | "*" | "&" => return None,
            "<" => cur = list.next(list.link(cur)?)?,
            _ => cur = list.next(cur)?,
        }
    }
}

fn is_head_token(list: &TokenList, t: TokenId) -> bool {
    let tok = &list[t];
    tok.is_identifier()
        || tok.is_standard_type()
        || matches!(
            tok.text.as_str(),
            "::" | "~" | "*" | "&" | "&&" | "static" | "virtual" | "explicit" | "constexpr" | "const"
                | "extern" | "friend" | "auto" | "struct" | "class" | "enum" | "union" | "volatile"
        )
}

/// Body `{` of a function definition head starting at `t`
pub fn function_body(list: &TokenList, t: TokenId) -> Option<TokenId> {
    let mut cur = t;
    let mut saw_name = false;
    // head up to the parameter list
    let open = loop {
        let text = list.text(cur);
        if text == "(" {
            break cur;
        }
        if text == "operator" {
            // `operator==(`, `operator()(`, `operator[](`
            cur = list.next(cur)?;
            if list.text(cur) == "(" && list.str_at(cur, 1) == ")" {
                cur = list.tok_at(cur, 2)?;
            } else if list.text(cur) == "[" {
                cur = list.next(list.link(cur)?)?;
            } else {
                while list.text(cur) != "(" {
                    cur = list.next(cur)?;
                }
            }
            saw_name = true;
            continue;
        }
        if text == "<" {
            cur = list.next(list.link(cur)?)?;
            continue;
        }
        if !is_head_token(list, cur) {
            return None;
        }
        saw_name |= list[cur].is_identifier();
        cur = list.next(cur)?;
    };
    if !saw_name || open == t {
        return None;
    }
    let before = list.prev(open)?;
    if !(list[before].is_identifier() || list[before].is_op() || list.text(before) == ")" || list.text(before) == "]") {
        return None;
    }

    let mut cur = list.next(list.link(open)?)?;
    loop {
        match list.text(cur) {
            "{" => return Some(cur),
            "const" | "override" | "final" | "volatile" | "&" | "&&" | "mutable" => cur = list.next(cur)?,
            "noexcept" | "throw" => {
                cur = list.next(cur)?;
                if list.text(cur) == "(" {
                    cur = list.next(list.link(cur)?)?;
                }
            }
            // trailing return type, rewritten from `->`
            "." if list[cur].original_name.as_deref() == Some("->") => {
                while list.text(cur) != "{" {
                    if matches!(list.text(cur), ";" | "=") {
                        return None;
                    }
                    cur = list.next(cur)?;
                }
            }
            ":" => {
                // constructor initializer list
                cur = list.next(cur)?;
                loop {
                    match list.text(cur) {
                        "(" => cur = list.next(list.link(cur)?)?,
                        "{" => {
                            let prev = list.prev(cur)?;
                            if list[prev].is_identifier() || list.text(prev) == ">" {
                                cur = list.next(list.link(cur)?)?;
                            } else {
                                return Some(cur);
                            }
                        }
                        ";" => return None,
                        _ => cur = list.next(cur)?,
                    }
                }
            }
            _ => return None,
        }
    }
}

/// Name token of a variable declaration starting at `t`
pub fn declaration_name(list: &TokenList, t: TokenId) -> Option<TokenId> {
    let mut cur = t;
    while matches!(
        list.text(cur),
        "static" | "extern" | "const" | "volatile" | "constexpr" | "mutable" | "thread_local" | "typename"
    ) {
        cur = list.next(cur)?;
    }
    match list.text(cur) {
        "struct" | "class" | "union" | "enum" => {
            cur = list.next(cur)?;
            if !list[cur].is_identifier() {
                return None;
            }
            cur = list.next(cur)?;
        }
        "auto" => cur = list.next(cur)?,
        _ if list[cur].is_standard_type() => {
            while list[cur].is_standard_type() {
                cur = list.next(cur)?;
            }
        }
        _ if list[cur].is_identifier() => {
            cur = list.next(cur)?;
            loop {
                if list.text(cur) == "::" && list.next(cur).is_some_and(|n| list[n].is_identifier()) {
                    cur = list.tok_at(cur, 2)?;
                } else if list.text(cur) == "<" && list.link(cur).is_some() {
                    cur = list.next(list.link(cur)?)?;
                } else {
                    break;
                }
            }
        }
        _ => return None,
    }
    while matches!(list.text(cur), "*" | "&" | "&&" | "const" | "volatile") {
        cur = list.next(cur)?;
    }
    if !list[cur].is_identifier() {
        return None;
    }
    let after = list.str_at(cur, 1);
    matches!(after, "=" | ";" | "," | "[" | "(" | "{" | ":").then_some(cur)
}

// ═══════════════════════════════════════════════════════════════════════════
// Expression level
// ═══════════════════════════════════════════════════════════════════════════

struct ExprParser<'a> {
    list: &'a mut TokenList,
    pos: Option<TokenId>,
    /// Exclusive bound
    end: Option<TokenId>,
    depth: usize,
    lambdas: &'a mut Vec<(Option<TokenId>, Option<TokenId>)>,
}

impl ExprParser<'_> {
    fn at_end(&self) -> bool {
        self.pos.is_none() || self.pos == self.end
    }

    fn peek(&self) -> Option<TokenId> {
        if self.at_end() {
            None
        } else {
            self.pos
        }
    }

    fn peek_text(&self) -> &str {
        match self.peek() {
            Some(t) => self.list.text(t),
            None => "",
        }
    }

    fn advance(&mut self) -> Option<TokenId> {
        let t = self.peek()?;
        self.pos = self.list.next(t);
        Some(t)
    }

    fn enter(&mut self, at: TokenId) -> TokenizeResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(TokenizeError::internal("maximum AST depth exceeded", self.list.location(at)));
        }
        Ok(())
    }

    /// Parse the bracket contents `(open, close)` as a separate expression
    fn parse_inside(&mut self, open: TokenId) -> TokenizeResult<Option<TokenId>> {
        let Some(close) = self.list.link(open) else {
            return Ok(None);
        };
        let saved = (self.pos, self.end);
        self.pos = self.list.next(open);
        self.end = Some(close);
        let mut root = None;
        if !self.at_end() {
            root = self.parse(0)?;
            while !self.at_end() {
                let before = self.pos;
                self.parse(0)?;
                if self.pos == before {
                    self.advance();
                }
            }
        }
        self.pos = self.list.next(close);
        self.end = saved.1;
        if saved.1.is_some() && self.pos.is_none() {
            self.pos = saved.1;
        }
        Ok(root)
    }

    fn parse(&mut self, min_prec: u8) -> TokenizeResult<Option<TokenId>> {
        let Some(start) = self.peek() else {
            return Ok(None);
        };
        self.enter(start)?;
        let result = self.parse_binary(min_prec);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min_prec: u8) -> TokenizeResult<Option<TokenId>> {
        let Some(mut lhs) = self.parse_unary()? else {
            return Ok(None);
        };
        loop {
            let Some(op) = self.peek() else { break };
            let text = self.list.text(op).to_string();
            if (text == "<" || text == ">") && self.list.link(op).is_some() {
                break;
            }
            let Some(prec) = binary_precedence(&text) else { break };
            if prec < min_prec {
                break;
            }
            self.advance();
            if text == "?" {
                let then = self.parse(PREC_COMMA)?;
                if self.peek_text() == ":" {
                    if let Some(colon) = self.advance() {
                        let otherwise = self.parse(PREC_TERNARY)?;
                        self.list.set_ast_op1(colon, then);
                        self.list.set_ast_op2(colon, otherwise);
                        self.list.set_ast_op1(op, Some(lhs));
                        self.list.set_ast_op2(op, Some(colon));
                    }
                } else {
                    self.list.set_ast_op1(op, Some(lhs));
                    self.list.set_ast_op2(op, then);
                }
                lhs = op;
                continue;
            }
            // assignment and ternary are right associative
            let next_min = if prec == PREC_ASSIGN { prec } else { prec + 1 };
            let rhs = self.parse(next_min)?;
            self.list.set_ast_op1(op, Some(lhs));
            self.list.set_ast_op2(op, rhs);
            lhs = op;
        }
        Ok(Some(lhs))
    }

    fn parse_unary(&mut self) -> TokenizeResult<Option<TokenId>> {
        let Some(t) = self.peek() else {
            return Ok(None);
        };
        let text = self.list.text(t).to_string();
        match text.as_str() {
            "!" | "~" | "-" | "+" | "*" | "&" | "++" | "--" | "throw" | "co_await" => {
                self.advance();
                self.enter(t)?;
                let operand = self.parse_unary();
                self.depth -= 1;
                let operand = operand?;
                self.list.set_ast_op1(t, operand);
                Ok(Some(t))
            }
            "sizeof" | "alignof" | "typeid" | "decltype" | "noexcept" => {
                self.advance();
                let operand = if self.peek_text() == "(" {
                    let open = self.peek();
                    match open {
                        Some(o) => self.parse_inside(o)?,
                        None => None,
                    }
                } else {
                    self.parse_unary()?
                };
                self.list.set_ast_op1(t, operand);
                Ok(Some(t))
            }
            "new" => self.parse_new(t),
            "delete" => {
                self.advance();
                if self.peek_text() == "[" {
                    self.advance();
                    if self.peek_text() == "]" {
                        self.advance();
                    }
                }
                let operand = self.parse_unary()?;
                self.list.set_ast_op1(t, operand);
                Ok(Some(t))
            }
            "::" => {
                // global qualification
                self.advance();
                let operand = self.parse_postfix_chain()?;
                self.list.set_ast_op1(t, operand);
                Ok(Some(t))
            }
            "(" if self.is_cast(t) => {
                self.list[t].flags |= TokenFlags::CAST;
                self.pos = self.list.link(t).and_then(|c| self.list.next(c));
                self.enter(t)?;
                let operand = self.parse_unary();
                self.depth -= 1;
                let operand = operand?;
                self.list.set_ast_op1(t, operand);
                Ok(Some(t))
            }
            _ => self.parse_postfix_chain(),
        }
    }

    /// `( type )` followed by an operand
    fn is_cast(&self, open: TokenId) -> bool {
        let list = &*self.list;
        let Some(close) = list.link(open) else {
            return false;
        };
        let Some(first) = list.next(open).filter(|&f| f != close) else {
            return false;
        };
        let mut has_type_marker = false;
        let mut cur = Some(first);
        while let Some(c) = cur {
            if c == close {
                break;
            }
            let tok = &list[c];
            if tok.is_standard_type() || matches!(tok.text.as_str(), "*" | "&" | "struct" | "enum" | "union") {
                has_type_marker = true;
            } else if tok.text == "<" && tok.link.is_some() {
                cur = tok.link.and_then(|l| list.next(l));
                continue;
            } else if !(tok.is_identifier() || matches!(tok.text.as_str(), "::" | "const" | "volatile")) {
                return false;
            }
            cur = list.next(c);
        }
        let Some(after) = list.next(close).filter(|&a| Some(a) != self.end) else {
            return false;
        };
        let next = &list[after];
        let operand_follows = next.is_identifier()
            || next.is_literal()
            || matches!(next.text.as_str(), "(" | "this" | "nullptr" | "sizeof");
        // `(type)-x`, `(type)*p`, `(type)&x`, `(type)!x`
        let unary_follows = matches!(next.text.as_str(), "-" | "+" | "*" | "&" | "++" | "--" | "~" | "!");
        let ends_like_type = list.prev(close).is_some_and(|l| {
            list[l].is_identifier() || list[l].is_standard_type() || matches!(list.text(l), "*" | "&" | ">")
        });
        // `(a)` alone is a parenthesized name unless an operand follows
        ends_like_type && (operand_follows || (has_type_marker && unary_follows))
    }

    fn parse_new(&mut self, t: TokenId) -> TokenizeResult<Option<TokenId>> {
        self.advance();
        // placement `new (buf) T`
        if self.peek_text() == "(" {
            if let Some(open) = self.peek() {
                let type_inside = self.list.link(open).and_then(|c| self.list.next(c));
                let is_placement = type_inside.is_some_and(|n| self.list[n].is_name());
                if is_placement {
                    self.pos = type_inside;
                } else {
                    // `new (T)`
                    let inner = self.parse_inside(open)?;
                    self.list.set_ast_op1(t, inner);
                    return Ok(Some(t));
                }
            }
        }
        let Some(type_tok) = self.peek() else {
            return Ok(Some(t));
        };
        // type name: `a::b<c> * *`
        while let Some(c) = self.peek() {
            let tok = &self.list[c];
            if tok.is_name() || tok.text == "::" {
                self.advance();
            } else if tok.text == "<" && tok.link.is_some() {
                self.pos = tok.link.and_then(|l| self.list.next(l));
            } else {
                break;
            }
        }
        while self.peek_text() == "*" {
            self.advance();
        }
        let mut operand = type_tok;
        match self.peek_text() {
            "[" => {
                if let Some(open) = self.peek() {
                    let size = self.parse_inside(open)?;
                    self.list.set_ast_op1(open, Some(type_tok));
                    self.list.set_ast_op2(open, size);
                    operand = open;
                }
            }
            "(" | "{" => {
                if let Some(open) = self.peek() {
                    let args = self.parse_inside(open)?;
                    self.list.set_ast_op1(open, Some(type_tok));
                    self.list.set_ast_op2(open, args);
                    operand = open;
                }
            }
            _ => {}
        }
        self.list.set_ast_op1(t, Some(operand));
        Ok(Some(t))
    }

    fn parse_postfix_chain(&mut self) -> TokenizeResult<Option<TokenId>> {
        let Some(mut node) = self.parse_primary()? else {
            return Ok(None);
        };
        loop {
            let Some(t) = self.peek() else { break };
            match self.list.text(t) {
                "(" => {
                    let args = self.parse_inside(t)?;
                    self.list.set_ast_op1(t, Some(node));
                    self.list.set_ast_op2(t, args);
                    node = t;
                }
                "[" => {
                    let index = self.parse_inside(t)?;
                    self.list.set_ast_op1(t, Some(node));
                    self.list.set_ast_op2(t, index);
                    node = t;
                }
                "{" if self.list[node].is_name() => {
                    let items = self.parse_inside(t)?;
                    self.list.set_ast_op1(t, Some(node));
                    self.list.set_ast_op2(t, items);
                    node = t;
                }
                "." | "::" => {
                    self.advance();
                    if self.peek_text() == "~" || self.peek_text() == "template" {
                        self.advance();
                    }
                    let member = self.peek();
                    if member.is_some() {
                        self.advance();
                        self.skip_template_args();
                    }
                    self.list.set_ast_op1(t, Some(node));
                    self.list.set_ast_op2(t, member);
                    node = t;
                }
                "++" | "--" => {
                    self.advance();
                    self.list.set_ast_op1(t, Some(node));
                    node = t;
                }
                _ => break,
            }
        }
        Ok(Some(node))
    }

    fn skip_template_args(&mut self) {
        if let Some(lt) = self.peek() {
            if self.list.text(lt) == "<" && self.list.link(lt).is_some() {
                let after = self.list.link(lt).and_then(|gt| self.list.next(gt));
                self.pos = after;
            }
        }
    }

    fn parse_primary(&mut self) -> TokenizeResult<Option<TokenId>> {
        let Some(t) = self.peek() else {
            return Ok(None);
        };
        let kind = self.list[t].kind;
        let text = self.list.text(t).to_string();
        match text.as_str() {
            "(" => {
                // parenthesized: the inner tree is the value
                return self.parse_inside(t);
            }
            "{" => {
                let items = self.parse_inside(t)?;
                self.list.set_ast_op1(t, items);
                return Ok(Some(t));
            }
            "[" if self.is_lambda(t) => return Ok(Some(self.skip_lambda(t))),
            ")" | "]" | "}" | ";" | ":" | "," => return Ok(None),
            _ => {}
        }
        match kind {
            TokenKind::Name | TokenKind::Keyword | TokenKind::Boolean => {
                self.advance();
                // `struct S` / `unsigned` spellings in expression position
                if matches!(text.as_str(), "struct" | "class" | "union" | "enum" | "typename" | "const") {
                    return self.parse_postfix_chain_from_here(t);
                }
                self.skip_template_args();
                Ok(Some(t))
            }
            _ => {
                self.advance();
                Ok(Some(t))
            }
        }
    }

    fn parse_postfix_chain_from_here(&mut self, keyword: TokenId) -> TokenizeResult<Option<TokenId>> {
        match self.peek() {
            Some(n) if self.list[n].is_name() => {
                self.advance();
                self.skip_template_args();
                Ok(Some(n))
            }
            _ => Ok(Some(keyword)),
        }
    }

    fn is_lambda(&self, open: TokenId) -> bool {
        let list = &*self.list;
        let Some(close) = list.link(open) else {
            return false;
        };
        matches!(list.str_at(close, 1), "(" | "{" | "mutable")
    }

    /// Skip a lambda expression, queueing its body; returns the `[` token
    fn skip_lambda(&mut self, open: TokenId) -> TokenId {
        let list = &*self.list;
        let mut cur = list.link(open).and_then(|c| list.next(c));
        while let Some(c) = cur {
            match list.text(c) {
                "(" => cur = list.link(c).and_then(|l| list.next(l)),
                "{" => {
                    let close = list.link(c);
                    self.lambdas.push((list.next(c), close));
                    cur = close.and_then(|l| list.next(l));
                    break;
                }
                ";" | ")" | "}" => break,
                _ => cur = list.next(c),
            }
            if cur == self.end {
                break;
            }
        }
        self.pos = cur;
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Platform;
    use crate::features::tokenizer::domain::Token;
    use crate::features::tokenizer::infrastructure::lexer::lex;
    use crate::features::tokenizer::infrastructure::links::{link_brackets, link_templates};
    use crate::features::tokenizer::infrastructure::simplify::simplify;

    fn build(src: &str) -> TokenList {
        let mut list = TokenList::new(vec!["t.c".into()]);
        for raw in lex(src, 0, "t.c").unwrap() {
            list.push_back(Token::new(raw.text, 0, raw.line, raw.column));
        }
        link_brackets(&mut list).unwrap();
        link_templates(&mut list);
        simplify(&mut list, &Platform::default(), None);
        create_ast(&mut list).unwrap();
        list
    }

    fn find(list: &TokenList, text: &str) -> TokenId {
        list.iter().find(|&t| list.text(t) == text).unwrap()
    }

    fn op1_text(list: &TokenList, t: TokenId) -> String {
        list[t].ast_op1.map(|c| list.text(c).to_string()).unwrap_or_default()
    }

    fn op2_text(list: &TokenList, t: TokenId) -> String {
        list[t].ast_op2.map(|c| list.text(c).to_string()).unwrap_or_default()
    }

    #[test]
    fn test_precedence() {
        let list = build("x = a + b * c;");
        let eq = find(&list, "=");
        assert_eq!(op1_text(&list, eq), "x");
        assert_eq!(op2_text(&list, eq), "+");
        let plus = find(&list, "+");
        assert_eq!(op1_text(&list, plus), "a");
        assert_eq!(op2_text(&list, plus), "*");
        assert_eq!(list.ast_top(find(&list, "c")), eq);
    }

    #[test]
    fn test_call_and_subscript() {
        let list = build("void g() { f(a[1], 2); }");
        let call = list.iter().filter(|&t| list.text(t) == "(").nth(1).unwrap();
        assert_eq!(op1_text(&list, call), "f");
        assert_eq!(op2_text(&list, call), ",");
        let sub = find(&list, "[");
        assert_eq!(op1_text(&list, sub), "a");
        assert_eq!(op2_text(&list, sub), "1");
    }

    #[test]
    fn test_control_condition() {
        let list = build("void g() { if (x == 5) { y(); } }");
        let iff = find(&list, "if");
        let open = list.next(iff).unwrap();
        assert_eq!(list[open].ast_op1, Some(iff));
        assert_eq!(op2_text(&list, open), "==");
        assert_eq!(list.expression_string(list[open].ast_op2.unwrap()), "x==5");
    }

    #[test]
    fn test_for_semicolon_chain() {
        let list = build("void g() { for (int i = 0; i < 3; i++) {} }");
        let for_tok = find(&list, "for");
        let open = list.next(for_tok).unwrap();
        let s1 = list[open].ast_op2.unwrap();
        assert_eq!(list.text(s1), ";");
        assert_eq!(op1_text(&list, s1), "=");
        let s2 = list[s1].ast_op2.unwrap();
        assert_eq!(op1_text(&list, s2), "<");
        assert_eq!(op2_text(&list, s2), "++");
    }

    #[test]
    fn test_return_and_split_declaration() {
        let list = build("int g() { int x = 2 + 3; return x; }");
        let eq = find(&list, "=");
        assert!(list[eq].is_split_decl_eq());
        assert_eq!(op2_text(&list, eq), "+");
        let ret = find(&list, "return");
        assert_eq!(op1_text(&list, ret), "x");
    }

    #[test]
    fn test_cast_and_unary() {
        let list = build("void g() { p = (char *)malloc(10); *p = -1; }");
        let cast = list.iter().find(|&t| list[t].is_cast()).unwrap();
        assert_eq!(op1_text(&list, cast), "(");
        let deref = list.iter().find(|&t| list.text(t) == "*" && list.is_unary_op(t, "*")).unwrap();
        assert_eq!(op1_text(&list, deref), "p");
    }

    #[test]
    fn test_new_delete_member() {
        let list = build("void g() { int *p = new int[10]; s.x = 1; delete [] p; }");
        let new_tok = find(&list, "new");
        assert_eq!(op1_text(&list, new_tok), "[");
        let dot = find(&list, ".");
        assert_eq!(op1_text(&list, dot), "s");
        assert_eq!(op2_text(&list, dot), "x");
        let del = find(&list, "delete");
        assert_eq!(op1_text(&list, del), "p");
    }

    #[test]
    fn test_ternary() {
        let list = build("void g() { x = c ? 1 : 2; }");
        let q = find(&list, "?");
        assert_eq!(op1_text(&list, q), "c");
        assert_eq!(op2_text(&list, q), ":");
    }

    #[test]
    fn test_lambda_body_is_walked() {
        let list = build("void g() { auto f = [](int a) { return a + 1; }; }");
        let ret = find(&list, "return");
        assert_eq!(op1_text(&list, ret), "+");
    }

    #[test]
    fn test_function_body_detection() {
        let list = build("int Foo::bar(int a) const { return a; }");
        let ret = find(&list, "return");
        assert_eq!(op1_text(&list, ret), "a");
    }
}
