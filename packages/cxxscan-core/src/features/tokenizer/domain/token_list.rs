//! Arena-backed doubly linked token list
//!
//! Tokens are addressed by `TokenId` slots. Deleting a token unlinks it from
//! the list but keeps the slot, so ids held elsewhere never dangle; the whole
//! arena is dropped as one unit with the list.

use super::token::Token;
use crate::shared::models::{FileLocation, TokenId};
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Default)]
pub struct TokenList {
    tokens: Vec<Token>,
    front: Option<TokenId>,
    back: Option<TokenId>,
    files: Vec<String>,
}

impl TokenList {
    pub fn new(files: Vec<String>) -> Self {
        Self {
            tokens: Vec::new(),
            front: None,
            back: None,
            files,
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn file_name(&self, index: u32) -> &str {
        self.files
            .get(index as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn front(&self) -> Option<TokenId> {
        self.front
    }

    pub fn back(&self) -> Option<TokenId> {
        self.back
    }

    /// Number of arena slots, deleted tokens included
    pub fn arena_len(&self) -> usize {
        self.tokens.len()
    }

    /// Number of live tokens
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.front.is_none()
    }

    pub fn is_deleted(&self, id: TokenId) -> bool {
        self.tokens[id.index()].deleted
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    #[inline]
    pub fn next(&self, id: TokenId) -> Option<TokenId> {
        self[id].next
    }

    #[inline]
    pub fn prev(&self, id: TokenId) -> Option<TokenId> {
        self[id].prev
    }

    #[inline]
    pub fn link(&self, id: TokenId) -> Option<TokenId> {
        self[id].link
    }

    #[inline]
    pub fn text(&self, id: TokenId) -> &str {
        &self[id].text
    }

    /// Token `offset` steps away (negative goes backwards)
    pub fn tok_at(&self, id: TokenId, offset: isize) -> Option<TokenId> {
        let mut cur = Some(id);
        if offset >= 0 {
            for _ in 0..offset {
                cur = self.next(cur?);
            }
        } else {
            for _ in 0..(-offset) {
                cur = self.prev(cur?);
            }
        }
        cur
    }

    /// Text `offset` steps away, empty past either end
    pub fn str_at(&self, id: TokenId, offset: isize) -> &str {
        match self.tok_at(id, offset) {
            Some(t) => self.text(t),
            None => "",
        }
    }

    /// Text of an optional token, empty for `None`
    pub fn str_of(&self, id: Option<TokenId>) -> &str {
        id.map(|t| self.text(t)).unwrap_or("")
    }

    pub fn iter(&self) -> TokenIter<'_> {
        TokenIter {
            list: self,
            cur: self.front,
            end: None,
        }
    }

    /// Tokens from `start` up to but excluding `end`
    pub fn range(&self, start: Option<TokenId>, end: Option<TokenId>) -> TokenIter<'_> {
        TokenIter {
            list: self,
            cur: start,
            end,
        }
    }

    /// Location of a token for diagnostics
    pub fn location(&self, id: TokenId) -> FileLocation {
        let tok = &self[id];
        FileLocation::new(self.file_name(tok.file_index), tok.line, tok.column)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    pub fn push_back(&mut self, token: Token) -> TokenId {
        let id = TokenId::from_index(self.tokens.len());
        self.tokens.push(token);
        match self.back {
            Some(back) => {
                self.tokens[back.index()].next = Some(id);
                self.tokens[id.index()].prev = Some(back);
            }
            None => self.front = Some(id),
        }
        self.back = Some(id);
        id
    }

    /// Insert a token after `after`, inheriting its location
    pub fn insert_after(&mut self, after: TokenId, text: &str) -> TokenId {
        let (file_index, line, column) = {
            let t = &self[after];
            (t.file_index, t.line, t.column)
        };
        let id = TokenId::from_index(self.tokens.len());
        let mut token = Token::new(text, file_index, line, column);
        token.prev = Some(after);
        token.next = self[after].next;
        self.tokens.push(token);
        match self[id].next {
            Some(n) => self[n].prev = Some(id),
            None => self.back = Some(id),
        }
        self[after].next = Some(id);
        id
    }

    /// Insert a token before `before`, inheriting its location
    pub fn insert_before(&mut self, before: TokenId, text: &str) -> TokenId {
        match self.prev(before) {
            Some(p) => self.insert_after(p, text),
            None => {
                let (file_index, line, column) = {
                    let t = &self[before];
                    (t.file_index, t.line, t.column)
                };
                let id = TokenId::from_index(self.tokens.len());
                let mut token = Token::new(text, file_index, line, column);
                token.next = Some(before);
                self.tokens.push(token);
                self[before].prev = Some(id);
                self.front = Some(id);
                id
            }
        }
    }

    /// Copy a token (text, flags, location, original name) after `after`
    pub fn insert_copy_after(&mut self, after: TokenId, source: TokenId) -> TokenId {
        let src = self[source].clone();
        let id = self.insert_after(after, &src.text);
        let tok = &mut self[id];
        tok.flags = src.flags;
        tok.original_name = src.original_name;
        id
    }

    /// Unlink a token; its slot stays in the arena
    pub fn delete(&mut self, id: TokenId) {
        if self[id].deleted {
            return;
        }
        let prev = self[id].prev;
        let next = self[id].next;
        match prev {
            Some(p) => self[p].next = next,
            None => self.front = next,
        }
        match next {
            Some(n) => self[n].prev = prev,
            None => self.back = prev,
        }
        let tok = &mut self[id];
        tok.deleted = true;
        tok.prev = None;
        tok.next = None;
        tok.link = None;
    }

    /// Delete the tokens from `start` through `end` inclusive
    pub fn delete_range(&mut self, start: TokenId, end: TokenId) {
        let mut cur = Some(start);
        while let Some(t) = cur {
            cur = self.next(t);
            self.delete(t);
            if t == end {
                break;
            }
        }
    }

    pub fn create_link(&mut self, open: TokenId, close: TokenId) {
        self[open].link = Some(close);
        self[close].link = Some(open);
    }

    pub fn set_text(&mut self, id: TokenId, text: &str) {
        self[id].set_text(text);
    }

    // ------------------------------------------------------------------
    // AST
    // ------------------------------------------------------------------

    pub fn set_ast_op1(&mut self, parent: TokenId, child: Option<TokenId>) {
        self[parent].ast_op1 = child;
        if let Some(c) = child {
            self[c].ast_parent = Some(parent);
        }
    }

    pub fn set_ast_op2(&mut self, parent: TokenId, child: Option<TokenId>) {
        self[parent].ast_op2 = child;
        if let Some(c) = child {
            self[c].ast_parent = Some(parent);
        }
    }

    /// Root of the AST containing `id`
    pub fn ast_top(&self, id: TokenId) -> TokenId {
        let mut cur = id;
        let mut steps = 0;
        while let Some(parent) = self[cur].ast_parent {
            cur = parent;
            steps += 1;
            if steps > self.tokens.len() {
                break;
            }
        }
        cur
    }

    /// `id` is op1 of an assignment
    pub fn is_assignment_lhs(&self, id: TokenId) -> bool {
        match self[id].ast_parent {
            Some(p) => self[p].is_assignment_op() && self[p].ast_op1 == Some(id),
            None => false,
        }
    }

    /// Unary operator: operator with only one operand
    pub fn is_unary_op(&self, id: TokenId, op: &str) -> bool {
        let t = &self[id];
        t.text == op && t.ast_op1.is_some() && t.ast_op2.is_none()
    }

    /// Leftmost and rightmost tokens of the expression rooted at `root`
    pub fn expression_range(&self, root: TokenId) -> (TokenId, TokenId) {
        let mut first = root;
        let mut last = root;
        let mut stack = vec![root];
        while let Some(t) = stack.pop() {
            if self.position_before(t, first) {
                first = t;
            }
            if self.position_before(last, t) {
                last = t;
            }
            // calls, subscripts and braces end at their closing bracket
            if matches!(self.text(t), "(" | "[" | "{") {
                if let Some(link) = self.link(t) {
                    if self.position_before(last, link) {
                        last = link;
                    }
                }
            }
            stack.extend(self[t].ast_op1);
            stack.extend(self[t].ast_op2);
        }
        // extend over parentheses left unbalanced by the AST range
        let mut depth: i32 = 0;
        for t in self.range(Some(first), self.next(last)) {
            match self.text(t) {
                "(" => depth += 1,
                ")" => depth -= 1,
                _ => {}
            }
        }
        while depth < 0 {
            match self.prev(first) {
                Some(p) => {
                    first = p;
                    if self.text(p) == "(" {
                        depth += 1;
                    }
                }
                None => break,
            }
        }
        while depth > 0 {
            match self.next(last) {
                Some(n) => {
                    last = n;
                    if self.text(n) == ")" {
                        depth -= 1;
                    }
                }
                None => break,
            }
        }
        (first, last)
    }

    /// Expression text without spaces (`x==5`)
    pub fn expression_string(&self, root: TokenId) -> String {
        let (first, last) = self.expression_range(root);
        let mut out = String::new();
        let mut prev_name = false;
        for t in self.range(Some(first), self.next(last)) {
            let tok = &self[t];
            let text = match (&tok.original_name, tok.text.as_str()) {
                (Some(orig), ".") => orig.as_str(),
                _ => tok.text.as_str(),
            };
            let is_word = tok.is_name() || tok.is_number();
            if prev_name && is_word {
                out.push(' ');
            }
            out.push_str(text);
            prev_name = is_word;
        }
        out
    }

    /// Source order comparison (by list position)
    pub fn position_before(&self, a: TokenId, b: TokenId) -> bool {
        if a == b {
            return false;
        }
        let (ta, tb) = (&self[a], &self[b]);
        if (ta.file_index, ta.line, ta.column) != (tb.file_index, tb.line, tb.column) {
            return (ta.file_index, ta.line, ta.column) < (tb.file_index, tb.line, tb.column);
        }
        // same location (inserted tokens): walk forward
        let mut cur = self.next(a);
        while let Some(t) = cur {
            if t == b {
                return true;
            }
            let tt = &self[t];
            if (tt.file_index, tt.line, tt.column) != (ta.file_index, ta.line, ta.column) {
                break;
            }
            cur = self.next(t);
        }
        false
    }

    /// Space separated token texts
    pub fn stringify(&self) -> String {
        self.iter()
            .map(|t| self.text(t))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Index<TokenId> for TokenList {
    type Output = Token;

    #[inline]
    fn index(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }
}

impl IndexMut<TokenId> for TokenList {
    #[inline]
    fn index_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.tokens[id.index()]
    }
}

/// Forward iterator over live token ids
pub struct TokenIter<'a> {
    list: &'a TokenList,
    cur: Option<TokenId>,
    end: Option<TokenId>,
}

impl Iterator for TokenIter<'_> {
    type Item = TokenId;

    fn next(&mut self) -> Option<TokenId> {
        let cur = self.cur?;
        if Some(cur) == self.end {
            return None;
        }
        self.cur = self.list.next(cur);
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(texts: &[&str]) -> TokenList {
        let mut list = TokenList::new(vec!["test.c".to_string()]);
        for (i, t) in texts.iter().enumerate() {
            list.push_back(Token::new(*t, 0, 1, i as u32 + 1));
        }
        list
    }

    #[test]
    fn test_insert_and_delete() {
        let mut list = list_of(&["a", "c"]);
        let a = list.front().unwrap();
        let b = list.insert_after(a, "b");
        assert_eq!(list.stringify(), "a b c");
        list.delete(b);
        assert_eq!(list.stringify(), "a c");
        assert!(list.is_deleted(b));
        assert_eq!(list.arena_len(), 3);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_insert_before_front() {
        let mut list = list_of(&["x"]);
        let x = list.front().unwrap();
        let first = list.insert_before(x, "int");
        assert_eq!(list.front(), Some(first));
        assert_eq!(list.stringify(), "int x");
    }

    #[test]
    fn test_tok_at_and_str_at() {
        let list = list_of(&["a", "=", "1", ";"]);
        let a = list.front().unwrap();
        assert_eq!(list.str_at(a, 2), "1");
        let semi = list.back().unwrap();
        assert_eq!(list.str_at(semi, -3), "a");
        assert_eq!(list.str_at(semi, 1), "");
    }

    #[test]
    fn test_delete_back_updates_back() {
        let mut list = list_of(&["a", "b"]);
        let b = list.back().unwrap();
        list.delete(b);
        assert_eq!(list.back(), list.front());
    }
}
