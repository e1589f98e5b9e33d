//! Scope tree, variables and functions from one pass over the tokens
//!
//! The walk keeps a stack of open frames. A frame owns the names visible
//! in its scope and closes at a known `}`. Declarations get fresh variable
//! ids and every later use resolves to the innermost visible declaration.

use super::declarations::{
    base_value_type, canonical_type, parse_declaration, parse_parameters, step_over, template_base_name,
    Declarator,
};
use super::function_head::{function_head, FunctionHead};
use crate::features::library::Library;
use crate::features::symbol_db::domain::{
    Access, BaseInfo, Dimension, Function, FunctionFlags, FunctionKind, Scope, ScopeKind,
    SymbolDatabase, Type, Variable, VariableFlags,
};
use crate::features::tokenizer::domain::string_literal_value;
use crate::features::tokenizer::infrastructure::ast::class_body;
use crate::features::tokenizer::infrastructure::numbers::parse_integer;
use crate::features::tokenizer::{BaseType, TokenFlags, TokenList, ValueType};
use crate::shared::models::{FunctionId, ScopeId, TokenId, TypeId, VariableId};
use rustc_hash::{FxHashMap, FxHashSet};

struct Frame {
    scope: ScopeId,
    /// `}` closing the frame; `None` for the global frame
    end: Option<TokenId>,
    names: FxHashMap<String, VariableId>,
}

/// Where the walk continues after a statement handler: next token and
/// whether it starts a statement
type Resume = (Option<TokenId>, bool);

pub struct ScopeBuilder<'a> {
    list: &'a mut TokenList,
    library: &'a Library,
    db: SymbolDatabase,
    frames: Vec<Frame>,
    next_var_id: u32,
    /// `{` already attached to a scope opened at its header
    owned_braces: FxHashSet<TokenId>,
    /// `}` of do-bodies; the `while` after them is not a new scope
    do_ends: FxHashSet<TokenId>,
}

impl<'a> ScopeBuilder<'a> {
    pub fn new(list: &'a mut TokenList, library: &'a Library) -> Self {
        Self {
            list,
            library,
            db: SymbolDatabase::default(),
            frames: Vec::new(),
            next_var_id: 0,
            owned_braces: FxHashSet::default(),
            do_ends: FxHashSet::default(),
        }
    }

    pub fn build(mut self) -> SymbolDatabase {
        let global = self.open_scope(ScopeKind::Global, String::new(), None, None, None);
        self.push_frame(global, None);

        let mut at_start = true;
        let mut label_pending = false;
        let mut cur = self.list.front();
        while let Some(t) = cur {
            if self.frames.last().and_then(|f| f.end) == Some(t) {
                self.list[t].scope = Some(self.current());
                while self.frames.len() > 1 && self.frames.last().and_then(|f| f.end) == Some(t) {
                    if let Some(frame) = self.frames.pop() {
                        if self.db.scope(frame.scope).kind == ScopeKind::Do {
                            self.do_ends.insert(t);
                        }
                    }
                }
                at_start = true;
                cur = self.list.next(t);
                continue;
            }

            self.list[t].scope = Some(self.current());
            if self.owned_braces.contains(&t) {
                at_start = true;
                cur = self.list.next(t);
                continue;
            }
            if at_start {
                if let Some((next, start)) = self.statement(t) {
                    cur = next;
                    at_start = start;
                    continue;
                }
            }
            if self.list.text(t) == "[" {
                if let Some(next) = self.lambda(t) {
                    cur = next;
                    at_start = false;
                    continue;
                }
            }
            self.resolve_name(t);

            match self.list.text(t) {
                ";" | "{" | "}" => at_start = true,
                "case" | "default" => {
                    label_pending = true;
                    at_start = false;
                }
                ":" if label_pending => {
                    label_pending = false;
                    at_start = true;
                }
                _ => at_start = false,
            }
            cur = self.list.next(t);
        }

        self.db.by_var_id.shrink_to_fit();
        self.db
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Frames and scopes
    // ═══════════════════════════════════════════════════════════════════════

    fn current(&self) -> ScopeId {
        self.frames.last().map_or(ScopeId::from_index(0), |f| f.scope)
    }

    fn current_kind(&self) -> ScopeKind {
        self.db.scope(self.current()).kind
    }

    fn push_frame(&mut self, scope: ScopeId, end: Option<TokenId>) {
        self.frames.push(Frame {
            scope,
            end,
            names: FxHashMap::default(),
        });
    }

    fn open_scope(
        &mut self,
        kind: ScopeKind,
        name: String,
        class_def: Option<TokenId>,
        body_start: Option<TokenId>,
        body_end: Option<TokenId>,
    ) -> ScopeId {
        let id = ScopeId::from_index(self.db.scopes.len());
        let parent = (!self.frames.is_empty()).then(|| self.current());
        let mut scope = Scope::new(id, kind, parent);
        scope.name = name;
        scope.class_def = class_def;
        scope.body_start = body_start;
        scope.body_end = body_end;
        self.db.scopes.push(scope);
        if let Some(parent) = parent {
            self.db.scopes[parent.index()].nested_list.push(id);
        }
        id
    }

    fn stamp(&mut self, from: TokenId, to: TokenId, scope: ScopeId) {
        let tokens: Vec<TokenId> = self.list.range(Some(from), self.list.next(to)).collect();
        for t in tokens {
            self.list[t].scope = Some(scope);
        }
    }

    fn lookup(&self, name: &str) -> Option<VariableId> {
        self.frames.iter().rev().find_map(|f| f.names.get(name).copied())
    }

    fn class_scope_named(&self, name: &str) -> Option<ScopeId> {
        let short = name.rsplit("::").next().unwrap_or(name);
        self.db
            .scopes
            .iter()
            .find(|s| s.kind.is_class_like() && s.name == short)
            .map(|s| s.id)
    }

    /// `;` ending the statement at `t`, not crossing `limit`
    fn statement_end(&self, t: TokenId, limit: Option<TokenId>) -> Option<TokenId> {
        let mut cur = Some(t);
        while let Some(c) = cur {
            if Some(c) == limit {
                return None;
            }
            if self.list.text(c) == ";" {
                return Some(c);
            }
            cur = step_over(self.list, c);
        }
        None
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════

    fn statement(&mut self, t: TokenId) -> Option<Resume> {
        let kind = self.current_kind();
        let text = self.list.text(t).to_string();
        let next_text = self.list.str_at(t, 1).to_string();
        match text.as_str() {
            "namespace" => return self.namespace(t),
            "class" | "struct" | "union" => {
                if let Some(body) = class_body(self.list, t) {
                    return self.class(t, body);
                }
            }
            "enum" => {
                if let Some(resume) = self.enumeration(t) {
                    return Some(resume);
                }
            }
            "template" if next_text == "<" => {
                let close = self.list.link(self.list.next(t)?)?;
                let scope = self.current();
                self.stamp(t, close, scope);
                return Some((self.list.next(close), true));
            }
            "typedef" | "using" | "friend" | "static_assert" => {
                let end = self.statement_end(t, None)?;
                let scope = self.current();
                self.stamp(t, end, scope);
                return Some((self.list.next(end), true));
            }
            "public" | "private" | "protected" if next_text == ":" => {
                let colon = self.list.next(t)?;
                let scope = self.current();
                self.list[colon].scope = Some(scope);
                return Some((self.list.next(colon), true));
            }
            "if" | "while" | "switch" | "for" | "catch" if kind.is_executable() && next_text == "(" => {
                return self.control(t);
            }
            "else" | "do" | "try" if kind.is_executable() && next_text == "{" => return self.block(t),
            "{" if kind.is_executable() => return self.unconditional(t),
            _ => {}
        }

        if !kind.is_executable() {
            if let Some(head) = function_head(self.list, t, kind.is_class_like()) {
                return Some(self.function(t, head));
            }
        } else if self.list[t].is_identifier()
            && next_text == ":"
            && self.lookup(&text).is_none()
            && !self.list[t].is_standard_type()
        {
            // label
            let colon = self.list.next(t)?;
            let scope = self.current();
            self.list[colon].scope = Some(scope);
            return Some((self.list.next(colon), true));
        }
        self.declaration(t, kind)
    }

    fn namespace(&mut self, t: TokenId) -> Option<Resume> {
        let outer = self.current();
        let mut name = String::new();
        let mut cur = self.list.next(t)?;
        while self.list.text(cur) != "{" {
            if self.list.text(cur) == ";" {
                // namespace alias
                self.stamp(t, cur, outer);
                return Some((self.list.next(cur), true));
            }
            if self.list[cur].is_identifier() {
                name = self.list.text(cur).to_string();
            }
            cur = self.list.next(cur)?;
        }
        let end = self.list.link(cur)?;
        self.stamp(t, cur, outer);
        let scope = self.open_scope(ScopeKind::Namespace, name, Some(t), Some(cur), Some(end));
        self.list[cur].scope = Some(scope);
        self.push_frame(scope, Some(end));
        Some((self.list.next(cur), true))
    }

    fn class(&mut self, t: TokenId, body: TokenId) -> Option<Resume> {
        let outer = self.current();
        let kind = ScopeKind::from_keyword(self.list.text(t))?;
        let name_tok = self.list.next(t).filter(|&n| n != body && self.list[n].is_identifier());
        let name = name_tok.map(|n| self.list.text(n).to_string()).unwrap_or_default();
        let end = self.list.link(body)?;

        self.stamp(t, body, outer);
        let scope = self.open_scope(kind, name.clone(), Some(name_tok.unwrap_or(t)), Some(body), Some(end));
        self.list[body].scope = Some(scope);
        if !name.is_empty() {
            let type_id = TypeId::from_index(self.db.types.len());
            let mut ty = Type::new(type_id, name, name_tok.unwrap_or(t), outer);
            ty.class_scope = Some(scope);
            ty.bases = self.parse_bases(t, body, kind);
            self.db.types.push(ty);
            self.db.scopes[scope.index()].defined_type = Some(type_id);
        }

        self.push_frame(scope, Some(end));
        self.prescan_members(scope, body, end);
        self.add_inherited_names(scope);
        Some((self.list.next(body), true))
    }

    fn parse_bases(&self, t: TokenId, body: TokenId, kind: ScopeKind) -> Vec<BaseInfo> {
        let default_access = if kind == ScopeKind::Class {
            Access::Private
        } else {
            Access::Public
        };
        let fresh = || BaseInfo {
            name: String::new(),
            access: default_access,
            is_virtual: false,
            type_id: None,
        };
        let mut bases = Vec::new();
        let mut cur = self.list.next(t);
        while let Some(c) = cur.filter(|&c| c != body) {
            cur = self.list.next(c);
            if self.list.text(c) == ":" {
                break;
            }
        }
        let mut base = fresh();
        while let Some(c) = cur.filter(|&c| c != body) {
            match self.list.text(c) {
                "public" => base.access = Access::Public,
                "protected" => base.access = Access::Protected,
                "private" => base.access = Access::Private,
                "virtual" => base.is_virtual = true,
                "," => {
                    if !base.name.is_empty() {
                        bases.push(std::mem::replace(&mut base, fresh()));
                    }
                }
                "<" => {
                    if let Some(link) = self.list.link(c) {
                        cur = self.list.next(link);
                        continue;
                    }
                }
                "::" => base.name.push_str("::"),
                text if self.list[c].is_identifier() => base.name.push_str(text),
                _ => {}
            }
            cur = self.list.next(c);
        }
        if !base.name.is_empty() {
            bases.push(base);
        }
        bases
    }

    /// Declare data members up front so member functions defined inside
    /// the class see all of them
    fn prescan_members(&mut self, scope: ScopeId, body: TokenId, end: TokenId) {
        let limit = Some(end);
        let mut cur = self.list.next(body);
        while let Some(t) = cur.filter(|&c| c != end) {
            let text = self.list.text(t);
            cur = match text {
                "public" | "private" | "protected" if self.list.str_at(t, 1) == ":" => self.list.tok_at(t, 2),
                ";" => self.list.next(t),
                "template" if self.list.str_at(t, 1) == "<" => {
                    self.list.next(t).and_then(|open| self.list.link(open)).and_then(|c| self.list.next(c))
                }
                "class" | "struct" | "union" | "enum" => {
                    // nested type, skipped with its body
                    let mut c = Some(t);
                    while let Some(x) = c.filter(|&x| x != end && !matches!(self.list.text(x), "{" | ";")) {
                        c = self.list.next(x);
                    }
                    match c {
                        Some(open) if self.list.text(open) == "{" => self
                            .list
                            .link(open)
                            .and_then(|close| self.statement_end(close, limit))
                            .and_then(|semi| self.list.next(semi)),
                        Some(semi) if semi != end => self.list.next(semi),
                        _ => None,
                    }
                }
                "friend" | "using" | "typedef" | "static_assert" => {
                    self.statement_end(t, limit).and_then(|s| self.list.next(s))
                }
                _ => {
                    if let Some(head) = function_head(self.list, t, true) {
                        self.list.next(head.end)
                    } else {
                        if let Some(decls) = parse_declaration(self.list, t) {
                            for d in &decls {
                                self.declare(d, scope, VariableFlags::MEMBER, true);
                            }
                        }
                        self.statement_end(t, limit).and_then(|s| self.list.next(s))
                    }
                }
            };
        }
    }

    /// Members of base classes are visible inside the derived class
    fn add_inherited_names(&mut self, scope: ScopeId) {
        let Some(ty) = self.db.scope(scope).defined_type else {
            return;
        };
        let mut pending: Vec<String> = self.db.type_info(ty).bases.iter().map(|b| b.name.clone()).collect();
        let mut seen = FxHashSet::default();
        let mut inherited = Vec::new();
        while let Some(base) = pending.pop() {
            let Some(base_scope) = self.class_scope_named(&base) else {
                continue;
            };
            if base_scope == scope || !seen.insert(base_scope) {
                continue;
            }
            for &v in &self.db.scope(base_scope).var_list {
                inherited.push((self.db.variable(v).name.clone(), v));
            }
            if let Some(bt) = self.db.scope(base_scope).defined_type {
                pending.extend(self.db.type_info(bt).bases.iter().map(|b| b.name.clone()));
            }
        }
        if let Some(frame) = self.frames.last_mut() {
            for (name, v) in inherited {
                frame.names.entry(name).or_insert(v);
            }
        }
    }

    fn enumeration(&mut self, t: TokenId) -> Option<Resume> {
        let outer = self.current();
        let mut cur = self.list.next(t)?;
        let mut name = String::new();
        while self.list.text(cur) != "{" {
            if matches!(self.list.text(cur), ";" | "=" | "(" | "*" | "&") {
                return None;
            }
            if self.list[cur].is_identifier() && name.is_empty() && self.list.text(cur) != "class" {
                name = self.list.text(cur).to_string();
            }
            cur = self.list.next(cur)?;
        }
        let end = self.list.link(cur)?;
        let scope = self.open_scope(ScopeKind::Enum, name, Some(t), Some(cur), Some(end));
        self.stamp(t, cur, outer);
        if let Some(first) = self.list.next(cur) {
            self.stamp(first, end, scope);
        }
        Some((self.list.next(end), false))
    }

    fn control(&mut self, t: TokenId) -> Option<Resume> {
        let keyword = self.list.text(t).to_string();
        if keyword == "while" && self.list.prev(t).is_some_and(|p| self.do_ends.contains(&p)) {
            return None;
        }
        let open = self.list.next(t)?;
        let close = self.list.link(open)?;
        let body = self.list.next(close).filter(|&b| self.list.text(b) == "{")?;
        let end = self.list.link(body)?;
        let kind = ScopeKind::from_keyword(&keyword)?;
        let scope = self.open_scope(kind, String::new(), Some(t), Some(body), Some(end));
        self.owned_braces.insert(body);
        self.push_frame(scope, Some(end));
        self.list[open].scope = Some(scope);

        if kind == ScopeKind::Catch {
            let (params, _) = parse_parameters(self.list, open);
            for p in &params {
                self.declare(p, scope, VariableFlags::LOCAL, true);
            }
            return Some((self.list.next(open), false));
        }
        Some((self.list.next(open), true))
    }

    fn block(&mut self, t: TokenId) -> Option<Resume> {
        let kind = ScopeKind::from_keyword(self.list.text(t))?;
        let body = self.list.next(t)?;
        let end = self.list.link(body)?;
        let scope = self.open_scope(kind, String::new(), Some(t), Some(body), Some(end));
        self.list[body].scope = Some(scope);
        self.push_frame(scope, Some(end));
        Some((self.list.next(body), true))
    }

    fn unconditional(&mut self, t: TokenId) -> Option<Resume> {
        let end = self.list.link(t)?;
        let scope = self.open_scope(ScopeKind::Unconditional, String::new(), Some(t), Some(t), Some(end));
        self.list[t].scope = Some(scope);
        self.push_frame(scope, Some(end));
        Some((self.list.next(t), true))
    }

    fn declaration(&mut self, t: TokenId, kind: ScopeKind) -> Option<Resume> {
        // `x * y;` with a known variable `x` is an expression
        if self.list[t].is_identifier() && !self.list[t].is_standard_type() && self.lookup(self.list.text(t)).is_some() {
            return None;
        }
        let decls = parse_declaration(self.list, t)?;
        let scope = self.current();

        if kind.is_executable() {
            // `T f();` / `T f(int);` inside a body declares a function
            let prototype = decls.first().and_then(|d| d.initializer).is_some_and(|init| {
                self.list.text(init) == "("
                    && self.list.next(init).is_some_and(|inner| {
                        Some(inner) == self.list.link(init) || self.list[inner].is_standard_type()
                    })
            });
            if prototype {
                let end = self.statement_end(t, None)?;
                self.stamp(t, end, scope);
                return Some((self.list.next(end), true));
            }
        }

        let flags = if kind.is_executable() {
            VariableFlags::LOCAL
        } else if kind.is_class_like() {
            VariableFlags::MEMBER
        } else {
            VariableFlags::GLOBAL
        };
        for d in &decls {
            if d.name.is_some_and(|n| self.list[n].variable.is_some()) {
                continue;
            }
            self.declare(d, scope, flags, true);
        }
        let first_name = decls.first()?.name?;
        self.stamp(t, first_name, scope);
        Some((self.list.next(first_name), false))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Functions
    // ═══════════════════════════════════════════════════════════════════════

    fn function(&mut self, t: TokenId, head: FunctionHead) -> Resume {
        let outer = self.current();
        let owner_class = if self.current_kind().is_class_like() {
            Some(outer)
        } else {
            head.qualification.last().and_then(|q| self.class_scope_named(q))
        };
        let nested_in = owner_class.unwrap_or(outer);
        let class_name = owner_class.map(|s| self.db.scope(s).name.clone());
        let (params, variadic) = parse_parameters(self.list, head.open);

        let existing = head.body.and_then(|_| {
            self.db
                .scope(nested_in)
                .function_list
                .iter()
                .copied()
                .find(|&f| {
                    let f = self.db.function(f);
                    f.name == head.name && f.arg_list.len() == params.len() && !f.has_body()
                })
        });

        let kind = if head.is_destructor {
            FunctionKind::Destructor
        } else if head.is_operator {
            FunctionKind::Operator
        } else if class_name.as_deref() == Some(head.name.as_str()) {
            self.constructor_kind(&params, &head.name)
        } else {
            FunctionKind::Function
        };

        let mut flags = head.flags;
        if variadic {
            flags |= FunctionFlags::VARIADIC;
        }
        if self.library.is_noreturn(&head.name) {
            flags |= FunctionFlags::NORETURN;
        }
        let qualification = match (&class_name, head.qualification.is_empty()) {
            (_, false) => head.qualification.clone(),
            (Some(class), true) => vec![class.clone()],
            (None, true) => Vec::new(),
        };

        let fid = match existing {
            Some(fid) => {
                let f = &mut self.db.functions[fid.index()];
                f.flags |= flags;
                f.arg_def = Some(head.open);
                fid
            }
            None => {
                let (return_type, return_value_type) = self.return_type(&head);
                let fid = FunctionId::from_index(self.db.functions.len());
                self.db.functions.push(Function {
                    id: fid,
                    name: head.name.clone(),
                    name_token: Some(head.name_token),
                    arg_def: Some(head.open),
                    arg_list: Vec::new(),
                    min_args: 0,
                    return_type,
                    return_value_type,
                    nested_in,
                    body_scope: None,
                    kind,
                    flags,
                    qualification,
                });
                self.db.scopes[nested_in.index()].function_list.push(fid);
                fid
            }
        };
        self.list[head.name_token].function = Some(fid);
        let min_args = params
            .iter()
            .filter(|p| !p.flags.contains(VariableFlags::HAS_INITIALIZER))
            .count();

        let Some(body) = head.body else {
            // declaration: parameters are recorded but not visible anywhere
            let args: Vec<VariableId> = params
                .iter()
                .map(|p| self.declare(p, nested_in, VariableFlags::empty(), false))
                .collect();
            let f = &mut self.db.functions[fid.index()];
            f.arg_list = args;
            f.min_args = min_args;
            self.stamp(t, head.end, outer);
            return (self.list.next(head.end), true);
        };

        let end = head.end;
        if let Some(class) = owner_class.filter(|&c| c != outer) {
            // out-of-line member definition sees the class members
            self.push_frame(class, Some(end));
            let names: Vec<(String, VariableId)> = self
                .db
                .scope(class)
                .var_list
                .iter()
                .map(|&v| (self.db.variable(v).name.clone(), v))
                .collect();
            if let Some(frame) = self.frames.last_mut() {
                frame.names.extend(names);
            }
            self.add_inherited_names(class);
        }
        if let Some(before_open) = self.list.prev(head.open) {
            self.stamp(t, before_open, outer);
        }
        let scope = self.open_scope(
            ScopeKind::Function,
            head.name.clone(),
            Some(head.name_token),
            Some(body),
            Some(end),
        );
        self.db.scopes[scope.index()].function = Some(fid);
        self.owned_braces.insert(body);
        self.push_frame(scope, Some(end));
        self.list[head.open].scope = Some(scope);

        let args: Vec<VariableId> = params
            .iter()
            .map(|p| self.declare(p, scope, VariableFlags::empty(), true))
            .collect();
        let f = &mut self.db.functions[fid.index()];
        f.body_scope = Some(scope);
        f.min_args = if existing.is_some() { f.min_args.min(min_args) } else { min_args };
        f.arg_list = args;
        (self.list.next(head.open), false)
    }

    fn constructor_kind(&self, params: &[Declarator], class: &str) -> FunctionKind {
        let [only] = params else {
            return FunctionKind::Constructor;
        };
        if canonical_type(self.list, only.type_start, only.type_end) != class {
            return FunctionKind::Constructor;
        }
        if only.flags.contains(VariableFlags::RVALUE_REFERENCE) {
            FunctionKind::MoveConstructor
        } else if only.flags.contains(VariableFlags::REFERENCE) {
            FunctionKind::CopyConstructor
        } else {
            FunctionKind::Constructor
        }
    }

    fn return_type(&self, head: &FunctionHead) -> (String, Option<ValueType>) {
        let Some((start, end)) = head.return_range else {
            return (String::new(), None);
        };
        let mut pointer = 0;
        let mut base_end = end;
        let mut found_star = false;
        for t in self.list.range(Some(start), self.list.next(end)) {
            match self.list.text(t) {
                "*" => {
                    pointer += 1;
                    if !found_star {
                        found_star = true;
                        base_end = self.list.prev(t).unwrap_or(start);
                    }
                }
                "&" | "&&" if !found_star => {
                    found_star = true;
                    base_end = self.list.prev(t).unwrap_or(start);
                }
                _ => {}
            }
        }
        let mut spelled = canonical_type(self.list, start, base_end);
        spelled.push_str(&"*".repeat(pointer as usize));
        let mut vt = base_value_type(self.list, start, base_end, self.library);
        vt.pointer = pointer;
        let known = vt.base != BaseType::Unknown;
        (spelled, known.then_some(vt))
    }

    fn lambda(&mut self, t: TokenId) -> Option<Option<TokenId>> {
        if self.list.str_at(t, 1) == "[" {
            return None;
        }
        if let Some(prev) = self.list.prev(t) {
            let p = &self.list[prev];
            if p.is_name() || p.is_literal() || matches!(p.text.as_str(), ")" | "]" | ">") {
                return None;
            }
        }
        let close = self.list.link(t)?;
        let mut cur = self.list.next(close)?;
        let open = if self.list.text(cur) == "(" {
            let o = cur;
            cur = self.list.next(self.list.link(o)?)?;
            Some(o)
        } else {
            None
        };
        while self.list.text(cur) != "{" {
            let text = self.list.text(cur);
            let arrow = text == "." && self.list[cur].original_name.as_deref() == Some("->");
            if !(arrow || matches!(text, "mutable" | "constexpr" | "noexcept") || self.list[cur].is_name() || text == "*" || text == "&") {
                return None;
            }
            cur = self.list.next(cur)?;
        }
        let body = cur;
        let end = self.list.link(body)?;
        let outer = self.current();

        let fid = FunctionId::from_index(self.db.functions.len());
        self.db.functions.push(Function {
            id: fid,
            name: String::new(),
            name_token: Some(t),
            arg_def: open,
            arg_list: Vec::new(),
            min_args: 0,
            return_type: String::new(),
            return_value_type: None,
            nested_in: outer,
            body_scope: None,
            kind: FunctionKind::Lambda,
            flags: FunctionFlags::HAS_BODY,
            qualification: Vec::new(),
        });
        self.db.scopes[outer.index()].function_list.push(fid);
        self.list[t].function = Some(fid);

        let scope = self.open_scope(ScopeKind::Lambda, String::new(), Some(t), Some(body), Some(end));
        self.db.scopes[scope.index()].function = Some(fid);
        self.owned_braces.insert(body);
        self.push_frame(scope, Some(end));
        let mut args = Vec::new();
        if let Some(open) = open {
            let (params, _) = parse_parameters(self.list, open);
            for p in &params {
                args.push(self.declare(p, scope, VariableFlags::empty(), true));
            }
        }
        let f = &mut self.db.functions[fid.index()];
        f.min_args = args.len();
        f.arg_list = args;
        f.body_scope = Some(scope);
        Some(self.list.next(t))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Variables
    // ═══════════════════════════════════════════════════════════════════════

    /// Create the variable of a declarator. Visible variables join the
    /// scope's variable list and the name lookup of its frame.
    fn declare(&mut self, d: &Declarator, scope: ScopeId, extra: VariableFlags, visible: bool) -> VariableId {
        let id = VariableId::from_index(self.db.variables.len());
        let name = d.name.map(|n| self.list.text(n).to_string()).unwrap_or_default();
        let var_id = if d.name.is_some() {
            self.next_var_id += 1;
            self.next_var_id
        } else {
            0
        };

        let mut flags = d.flags | extra;
        if let Some(n) = d.name {
            // `T x; x = v;` produced by declaration splitting
            let split_init = self.list.str_at(n, 1) == ";"
                && self.list.str_at(n, 2) == name
                && self
                    .list
                    .tok_at(n, 3)
                    .is_some_and(|eq| self.list[eq].flags.contains(TokenFlags::SPLIT_VAR_DECL_EQ));
            if split_init {
                flags |= VariableFlags::HAS_INITIALIZER;
            }
        }
        let type_name = canonical_type(self.list, d.type_start, d.type_end);
        let mut vt = base_value_type(self.list, d.type_start, d.type_end, self.library);
        if d.pointer_depth == 0 && vt.base == BaseType::Record {
            flags |= VariableFlags::CLASS;
        }
        vt.pointer = d.pointer_depth + d.dims.len() as u32;
        if flags.contains(VariableFlags::CONST) && d.pointer_depth == 0 {
            vt.constness |= 1;
        }

        let mut dimensions: Vec<Dimension> = d.dims.iter().map(|&open| self.dimension(open)).collect();
        if let ([dim], Some(init)) = (dimensions.as_mut_slice(), d.initializer) {
            if dim.size.is_none() {
                dim.size = self.initializer_count(init);
            }
        }

        let mut typedef_chain = Vec::new();
        for t in self.list.range(Some(d.type_start), self.list.next(d.type_end)) {
            let tok = &self.list[t];
            if tok.flags.contains(TokenFlags::EXPANDED_TYPEDEF) {
                if let Some(original) = &tok.original_name {
                    if !typedef_chain.contains(original) {
                        typedef_chain.push(original.clone());
                    }
                }
            }
        }

        let index = if visible {
            self.db.scope(scope).var_list.len()
        } else {
            0
        };
        self.db.variables.push(Variable {
            id,
            name: name.clone(),
            name_token: d.name,
            decl_id: var_id,
            type_start: Some(d.type_start),
            type_end: Some(d.type_end),
            type_name,
            typedef_chain,
            scope,
            flags,
            pointer_depth: d.pointer_depth,
            dimensions,
            index,
            value_type: (vt.base != BaseType::Unknown).then_some(vt),
        });

        if let Some(n) = d.name {
            self.list[n].var_id = var_id;
            self.list[n].variable = Some(id);
            self.list[n].scope = Some(scope);
            self.db.by_var_id.insert(var_id, id);
        }
        if visible {
            self.db.scopes[scope.index()].var_list.push(id);
            if !name.is_empty() {
                if let Some(frame) = self.frames.iter_mut().rev().find(|f| f.scope == scope) {
                    frame.names.insert(name, id);
                }
            }
        }
        id
    }

    fn dimension(&self, open: TokenId) -> Dimension {
        let close = self.list.link(open);
        let inner = self.list.next(open).filter(|&i| Some(i) != close);
        let size = inner.and_then(|i| {
            let single = self.list.next(i) == close && self.list[i].is_number();
            if single {
                parse_integer(self.list.text(i)).map(|(v, _)| v)
            } else {
                None
            }
        });
        Dimension {
            size,
            size_token: inner,
        }
    }

    /// Element count implied by `= { a, b }` or `= "text"`
    fn initializer_count(&self, init: TokenId) -> Option<i64> {
        let value = if self.list.text(init) == "=" {
            self.list.next(init)?
        } else {
            init
        };
        let tok = &self.list[value];
        if tok.text.starts_with('"') {
            return string_literal_value(&tok.text).map(|s| s.len() as i64 + 1);
        }
        if tok.text != "{" {
            return None;
        }
        let close = self.list.link(value)?;
        let mut count = 0;
        let mut in_item = false;
        let mut cur = self.list.next(value);
        while let Some(c) = cur.filter(|&c| c != close) {
            if self.list.text(c) == "," {
                in_item = false;
            } else if !in_item {
                in_item = true;
                count += 1;
            }
            cur = step_over(self.list, c);
        }
        Some(count)
    }

    fn resolve_name(&mut self, t: TokenId) {
        let tok = &self.list[t];
        if !tok.is_identifier() || tok.is_standard_type() || tok.variable.is_some() {
            return;
        }
        if self.list.str_at(t, 1) == "::" {
            return;
        }
        let prev = self.list.prev(t);
        let id = match prev.map(|p| self.list.text(p)) {
            Some(".") => prev.and_then(|dot| self.member_of(dot, t)),
            Some("::") => {
                let qualified = prev
                    .and_then(|p| self.list.prev(p))
                    .is_some_and(|q| self.list[q].is_name());
                if qualified {
                    None
                } else {
                    self.frames.first().and_then(|f| f.names.get(self.list.text(t)).copied())
                }
            }
            _ => self.lookup(self.list.text(t)),
        };
        if let Some(id) = id {
            let var_id = self.db.variable(id).decl_id;
            self.list[t].variable = Some(id);
            self.list[t].var_id = var_id;
        }
    }

    /// Member `t` accessed through `obj.` / `obj->` / `this->`
    fn member_of(&self, dot: TokenId, t: TokenId) -> Option<VariableId> {
        let obj = self.list.prev(dot)?;
        let name = self.list.text(t);
        if self.list.text(obj) == "this" {
            return self.lookup(name);
        }
        let var = self.db.variable(self.list[obj].variable?);
        let class = self.class_scope_named(template_base_name(&var.type_name))?;
        self.db
            .scope(class)
            .var_list
            .iter()
            .copied()
            .find(|&v| self.db.variable(v).name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::features::tokenizer::Tokenizer;

    fn build(code: &str) -> (TokenList, SymbolDatabase) {
        let mut list = Tokenizer::new(&Settings::default()).tokenize_str(code, "t.cpp").unwrap().list;
        let library = Library::empty();
        let db = ScopeBuilder::new(&mut list, &library).build();
        (list, db)
    }

    fn nth(list: &TokenList, text: &str, n: usize) -> TokenId {
        list.iter().filter(|&t| list.text(t) == text).nth(n).unwrap()
    }

    #[test]
    fn test_locals_args_and_uses() {
        let (list, db) = build("int f(int a) { int x; x = a; return x; }");
        assert_eq!(db.functions.len(), 1);
        let f = &db.functions[0];
        assert_eq!(f.name, "f");
        assert_eq!(f.arg_list.len(), 1);
        assert!(db.variable(f.arg_list[0]).is_argument());

        let decl_x = nth(&list, "x", 0);
        let use_x = nth(&list, "x", 1);
        assert_ne!(list[decl_x].var_id, 0);
        assert_eq!(list[decl_x].var_id, list[use_x].var_id);
        let x = db.variable_of(&list, use_x).unwrap();
        assert!(x.is_local());
        assert!(x.is_auto_local());

        let use_a = nth(&list, "a", 1);
        assert_eq!(list[use_a].variable, Some(f.arg_list[0]));
    }

    #[test]
    fn test_shadowing_in_nested_block() {
        let (list, _) = build("void f() { int x; { int x; x = 1; } x = 2; }");
        let outer = nth(&list, "x", 0);
        let inner = nth(&list, "x", 1);
        assert_ne!(list[outer].var_id, list[inner].var_id);
        assert_eq!(list[nth(&list, "x", 2)].var_id, list[inner].var_id);
        assert_eq!(list[nth(&list, "x", 3)].var_id, list[outer].var_id);
    }

    #[test]
    fn test_scope_kinds() {
        let (_, db) = build("void f(int n) { if (n) { n = 1; } else { n = 2; } while (n) { n--; } do { n++; } while (n < 3); }");
        let kinds: Vec<ScopeKind> = db.scopes.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ScopeKind::Global,
                ScopeKind::Function,
                ScopeKind::If,
                ScopeKind::Else,
                ScopeKind::While,
                ScopeKind::Do,
            ]
        );
        assert!(db.scopes[2..].iter().all(|s| s.nested_in == Some(ScopeId::from_index(1))));
    }

    #[test]
    fn test_class_members_and_out_of_line_method() {
        let (list, db) = build(
            "class A { public: A(); void set(int v); private: int m; }; A::A() { m = 0; } void A::set(int v) { m = v; }",
        );
        let ty = db.find_type("A").unwrap();
        let class = ty.class_scope.unwrap();
        assert_eq!(db.scope(class).var_list.len(), 1);
        let m = db.variable(db.scope(class).var_list[0]);
        assert!(m.is_member());

        let uses: Vec<TokenId> = list.iter().filter(|&t| list.text(t) == "m").collect();
        assert!(uses.iter().all(|&t| list[t].variable == Some(m.id)));

        let set = db.functions_named("set").next().unwrap();
        assert!(set.has_body());
        assert_eq!(set.qualification, vec!["A".to_string()]);
        assert_eq!(set.ctu_key(), "A::set/1");
        let ctor = db.functions_named("A").next().unwrap();
        assert_eq!(ctor.kind, FunctionKind::Constructor);
        assert!(ctor.has_body());
    }

    #[test]
    fn test_bases_and_inherited_members() {
        let (list, db) = build("struct B { int n; }; class D : public B { void f() { n = 1; } };");
        let d = db.find_type("D").unwrap();
        assert_eq!(d.bases.len(), 1);
        assert_eq!(d.bases[0].name, "B");
        assert_eq!(d.bases[0].access, Access::Public);
        let use_n = nth(&list, "n", 1);
        assert!(db.variable_of(&list, use_n).is_some_and(|v| v.is_member()));
    }

    #[test]
    fn test_array_dimensions() {
        let (list, db) = build("void f() { char buf[10]; int a[] = {1, 2, 3}; char s[] = \"abc\"; }");
        let size = |name: &str| db.variable_of(&list, nth(&list, name, 0)).and_then(|v| v.array_size());
        assert_eq!(size("buf"), Some(10));
        assert_eq!(size("a"), Some(3));
        assert_eq!(size("s"), Some(4));
    }

    #[test]
    fn test_member_access_through_object() {
        let (list, db) = build("struct S { int x; }; void f() { S s; s.x = 1; }");
        let member = nth(&list, "x", 1);
        let var = db.variable_of(&list, member).unwrap();
        assert!(var.is_member());
        assert!(db.variable_of(&list, nth(&list, "s", 0)).unwrap().is_class());
    }

    #[test]
    fn test_lambda_scope_and_arguments() {
        let (list, db) = build("void f() { int k; auto g = [&](int y) { return y + k; }; }");
        let lambda = db.functions.iter().find(|f| f.kind == FunctionKind::Lambda).unwrap();
        assert_eq!(lambda.arg_list.len(), 1);
        let k_use = nth(&list, "k", 1);
        assert_eq!(list[k_use].var_id, list[nth(&list, "k", 0)].var_id);
        assert!(db.scopes.iter().any(|s| s.kind == ScopeKind::Lambda));
    }

    #[test]
    fn test_prototype_then_definition_share_function() {
        let (_, db) = build("int g(int a, int b = 2); int g(int a, int b) { return a + b; }");
        assert_eq!(db.functions.len(), 1);
        let g = &db.functions[0];
        assert!(g.has_body());
        assert_eq!(g.min_args, 1);
        assert!(g.accepts_arg_count(1));
        assert!(!g.accepts_arg_count(3));
    }

    #[test]
    fn test_every_token_has_a_scope() {
        let (list, _) = build("namespace n { struct S { int a; }; int f(int x) { for (int i = 0; i < x; i++) { } return 0; } }");
        assert!(list.iter().all(|t| list[t].scope.is_some()));
    }
}
