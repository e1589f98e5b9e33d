//! Forward propagation of a variable's values along the token list
//!
//! The walker follows source order from a start token, attaching the
//! current values to every read of the variable. Branches are walked
//! recursively; after a branch that may not execute (or may change the
//! variable) the values are demoted to possible. A write, an escaping
//! address or an unknown call ends the walk.

use super::access::{
    argument_use, block_escapes, classify_access, is_do_while_tail, is_noreturn_call,
    is_variable_changed, scope_closed_at, scope_opened_at, Access, ArgumentUse,
};
use crate::features::library::ContainerAction;
use crate::features::symbol_db::{callee_name, ScopeKind};
use crate::features::value_flow::domain::{Value, ValueData, ValueKind};
use crate::features::value_flow::ports::PassContext;
use crate::shared::models::{TokenId, VariableId};

/// Nested branch bodies walked recursively
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Reached the end of the walked range with values still valid
    Continue,
    /// The variable changed or became unknown
    Stop,
    /// Control left the range (`return`, `break`, noreturn call)
    Escape,
}

pub struct ForwardWalker<'c, 'a> {
    ctx: &'c mut PassContext<'a>,
    var_id: u32,
    variable: Option<VariableId>,
    branches: usize,
    nesting: usize,
    added: usize,
}

/// Push `values` of `var_id` forward over `[start, end)`; returns the number
/// of values added
pub fn forward(ctx: &mut PassContext<'_>, start: TokenId, end: TokenId, var_id: u32, values: Vec<Value>) -> usize {
    if var_id == 0 || values.is_empty() {
        return 0;
    }
    let variable = ctx.db.variable_of_var_id(var_id).map(|v| v.id);
    let mut walker = ForwardWalker {
        ctx,
        var_id,
        variable,
        branches: 0,
        nesting: 0,
        added: 0,
    };
    let mut values = values;
    walker.walk(start, end, &mut values);
    walker.added
}

/// Values after a point where another path joins: known facts become
/// possible, exclusions no longer hold
fn demote(values: &mut Vec<Value>) {
    values.retain(|v| !v.is_impossible());
    for v in values.iter_mut() {
        *v = v.clone().possible();
    }
}

impl ForwardWalker<'_, '_> {
    fn text(&self, t: TokenId) -> &str {
        self.ctx.list.text(t)
    }

    fn next(&self, t: TokenId) -> Option<TokenId> {
        self.ctx.list.next(t)
    }

    fn link(&self, t: TokenId) -> Option<TokenId> {
        self.ctx.list.link(t)
    }

    fn is_global_like(&self) -> bool {
        match self.variable {
            Some(v) => {
                let var = self.ctx.db.variable(v);
                !var.is_local() && !var.is_argument() || var.is_static()
            }
            None => true,
        }
    }

    fn changed_in(&self, start: TokenId, end: TokenId) -> bool {
        is_variable_changed(self.ctx.list, self.ctx.db, self.ctx.library, start, end, self.var_id)
    }

    fn escapes(&self, open: TokenId) -> bool {
        block_escapes(self.ctx.list, self.ctx.db, self.ctx.library, open)
    }

    fn read(&mut self, t: TokenId, values: &[Value]) {
        self.added += self.ctx.add_values(t, values.iter().cloned());
    }

    fn branch_allowed(&mut self) -> bool {
        self.branches += 1;
        self.ctx.limits.max_forward_branches.map_or(true, |max| self.branches <= max)
    }

    fn walk_nested(&mut self, start: Option<TokenId>, end: TokenId, values: &mut Vec<Value>) -> Flow {
        let Some(start) = start else {
            return Flow::Continue;
        };
        if self.nesting >= MAX_NESTING {
            return Flow::Stop;
        }
        self.nesting += 1;
        let flow = self.walk(start, end, values);
        self.nesting -= 1;
        flow
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Main walk
    // ═══════════════════════════════════════════════════════════════════════

    fn walk(&mut self, start: TokenId, end: TokenId, values: &mut Vec<Value>) -> Flow {
        let mut cur = Some(start);
        while let Some(t) = cur {
            if t == end {
                return Flow::Continue;
            }
            if values.is_empty() {
                return Flow::Stop;
            }
            let text = self.text(t).to_string();
            match text.as_str() {
                "{" => match self.block(t, values) {
                    Ok(next) => {
                        cur = next;
                        continue;
                    }
                    Err(flow) => return flow,
                },
                "}" => match self.leave(t, values) {
                    Ok(next) => {
                        cur = next;
                        continue;
                    }
                    Err(flow) => return flow,
                },
                "return" | "throw" => {
                    // the returned expression is still evaluated
                    let mut r = self.next(t);
                    while let Some(x) = r.filter(|&x| x != end && self.text(x) != ";") {
                        if self.ctx.list[x].var_id == self.var_id
                            && classify_access(self.ctx.list, x) == Access::Read
                        {
                            self.read(x, values);
                        }
                        r = self.next(x);
                    }
                    return Flow::Escape;
                }
                "break" | "continue" => return Flow::Escape,
                "goto" | "case" | "default" => return Flow::Stop,
                "sizeof" | "decltype" | "typeof" | "alignof" | "typeid" if self.ctx.list.str_at(t, 1) == "(" => {
                    cur = self.next(t).and_then(|o| self.link(o)).and_then(|c| self.next(c));
                    continue;
                }
                "[" if self.is_lambda(t) => {
                    match self.skip_lambda(t) {
                        Some(after) => cur = Some(after),
                        None => return Flow::Stop,
                    }
                    continue;
                }
                "for" | "while" if self.ctx.list.str_at(t, 1) == "(" && !is_do_while_tail(self.ctx.list, self.ctx.db, t) => {
                    match self.loop_header(t, values) {
                        Ok(next) => {
                            cur = next;
                            continue;
                        }
                        Err(flow) => return flow,
                    }
                }
                "do" => {
                    match self.do_loop(t, values) {
                        Ok(next) => {
                            cur = next;
                            continue;
                        }
                        Err(flow) => return flow,
                    }
                }
                _ => {}
            }

            if self.ctx.list[t].var_id == self.var_id {
                if let Err(flow) = self.variable_token(t, values) {
                    return flow;
                }
            } else if self.ctx.list.str_at(t, 1) == "(" && self.ctx.list[t].is_identifier() {
                if is_noreturn_call(self.ctx.list, self.ctx.db, self.ctx.library, t) {
                    return Flow::Escape;
                }
                if self.is_global_like() && self.is_unknown_impure_call(t) {
                    return Flow::Stop;
                }
            }
            cur = self.next(t);
        }
        Flow::Continue
    }

    fn is_unknown_impure_call(&self, name: TokenId) -> bool {
        let list = &*self.ctx.list;
        let Some(open) = list.next(name) else {
            return false;
        };
        if callee_name(list, open) != Some(name) {
            return false;
        }
        match self.ctx.db.function_of(list, name) {
            Some(f) => f.has_body() || !self.ctx.library.is_pure(&f.name),
            None => !self.ctx.library.is_pure(list.text(name)),
        }
    }

    fn is_lambda(&self, open: TokenId) -> bool {
        self.link(open)
            .is_some_and(|close| matches!(self.ctx.list.str_at(close, 1), "(" | "{" | "mutable"))
    }

    /// Token after a lambda; None when its body touches the variable
    fn skip_lambda(&self, open: TokenId) -> Option<TokenId> {
        let mut cur = self.link(open)?;
        while self.text(cur) != "{" {
            cur = match self.link(cur) {
                Some(l) if self.text(cur) == "(" => self.next(l)?,
                _ => self.next(cur)?,
            };
        }
        let close = self.link(cur)?;
        let touched = self
            .ctx
            .list
            .range(Some(open), Some(close))
            .any(|t| self.ctx.list[t].var_id == self.var_id);
        if touched {
            return None;
        }
        self.next(close)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Variable uses
    // ═══════════════════════════════════════════════════════════════════════

    fn variable_token(&mut self, t: TokenId, values: &mut Vec<Value>) -> Result<(), Flow> {
        match classify_access(self.ctx.list, t) {
            Access::Unevaluated => Ok(()),
            Access::Read => {
                self.read(t, values);
                Ok(())
            }
            Access::Write => {
                // `x = x + 1`: the right side reads the old value
                if let Some(rhs) = self.ctx.list[t].ast_parent.and_then(|p| self.ctx.list[p].ast_op2) {
                    let (first, last) = self.ctx.list.expression_range(rhs);
                    let reads: Vec<TokenId> = self
                        .ctx
                        .list
                        .range(Some(first), self.next(last))
                        .filter(|&x| {
                            self.ctx.list[x].var_id == self.var_id && classify_access(self.ctx.list, x) == Access::Read
                        })
                        .collect();
                    for x in reads {
                        self.read(x, values);
                    }
                }
                Err(Flow::Stop)
            }
            Access::ReadWrite => {
                self.read(t, values);
                let parent = self.ctx.list[t].ast_parent;
                let delta = match parent.map(|p| self.text(p)) {
                    Some("++") => 1,
                    Some("--") => -1,
                    _ => return Err(Flow::Stop),
                };
                let step_tok = parent.unwrap_or(t);
                let mut adjusted = Vec::with_capacity(values.len());
                for v in values.iter() {
                    let Some(n) = v.int_value().filter(|_| v.indirect == 0) else {
                        return Err(Flow::Stop);
                    };
                    let mut nv = v.clone();
                    nv.data = ValueData::Int(n.wrapping_add(delta));
                    let what = if delta > 0 { "incremented" } else { "decremented" };
                    nv = nv.with_step(step_tok, format!("{} is {}, new value is {}", self.text(t), what, n.wrapping_add(delta)));
                    adjusted.push(nv);
                }
                *values = adjusted;
                Ok(())
            }
            Access::AddressOf => Err(Flow::Stop),
            Access::MemberCall(member) => self.member_call(t, member, values),
            Access::CallArgument { call, index } => {
                match argument_use(self.ctx.list, self.ctx.db, self.ctx.library, call, index) {
                    ArgumentUse::ByValue => {
                        self.read(t, values);
                        Ok(())
                    }
                    ArgumentUse::Modified => Err(Flow::Stop),
                    ArgumentUse::Unknown => {
                        // read as if by value; what follows is no longer certain
                        values.retain(|v| !v.is_uninit());
                        self.read(t, values);
                        for v in values.iter_mut() {
                            if !v.is_impossible() {
                                v.kind = ValueKind::Inconclusive;
                            }
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    fn member_call(&mut self, t: TokenId, member: TokenId, values: &mut Vec<Value>) -> Result<(), Flow> {
        if !values.iter().all(|v| v.container_size_value().is_some()) {
            return Err(Flow::Stop);
        }
        let Some(type_name) = self
            .variable
            .and_then(|v| self.ctx.db.variable(v).value_type.as_ref())
            .filter(|vt| vt.is_container())
            .map(|vt| vt.type_name.clone())
        else {
            return Err(Flow::Stop);
        };
        let library = self.ctx.library;
        let Some(container) = library.container(&type_name) else {
            return Err(Flow::Stop);
        };
        let name = self.text(member).to_string();
        if container.yield_of(&name).is_some() {
            self.read(t, values);
            return Ok(());
        }
        let call = self.ctx.list[member].ast_parent.and_then(|dot| self.ctx.list[dot].ast_parent);
        let new_size = |n: i64| -> Option<i64> {
            match container.action(&name)? {
                ContainerAction::Push => Some(n + 1),
                ContainerAction::Pop => Some((n - 1).max(0)),
                ContainerAction::Clear => Some(0),
                ContainerAction::Resize => {
                    let arg = call.and_then(|c| self.ctx.list[c].ast_op2)?;
                    self.ctx.list[arg].known_int()
                }
                ContainerAction::Insert | ContainerAction::Erase => None,
            }
        };
        let mut adjusted = Vec::with_capacity(values.len());
        for v in values.iter() {
            let Some(n) = v.container_size_value().and_then(&new_size) else {
                return Err(Flow::Stop);
            };
            let mut nv = v.clone();
            nv.data = ValueData::ContainerSize(n);
            adjusted.push(nv.with_step(member, format!("{} size is {} after '{}'", self.text(t), n, name)));
        }
        self.read(t, values);
        *values = adjusted;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Blocks
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle the `{` at `open`; Ok(next token) or Err(final flow)
    fn block(&mut self, open: TokenId, values: &mut Vec<Value>) -> Result<Option<TokenId>, Flow> {
        let close = self.link(open).ok_or(Flow::Stop)?;
        let kind = scope_opened_at(self.ctx.list, self.ctx.db, open).map(|s| s.kind);
        match kind {
            Some(ScopeKind::If) => self.if_block(open, close, values),
            Some(ScopeKind::Else) | Some(ScopeKind::Catch) => {
                // reached without walking the matching branch first
                if self.changed_in(open, close) {
                    demote(values);
                }
                Ok(self.next(close))
            }
            Some(ScopeKind::For) | Some(ScopeKind::While) | Some(ScopeKind::Do) => {
                // entered through `loop_header`/`do_loop` only
                let flow = self.walk_nested(self.next(open), close, values);
                match flow {
                    Flow::Stop => Err(Flow::Stop),
                    _ => Ok(self.next(close)),
                }
            }
            Some(ScopeKind::Switch) => {
                if self.changed_in(open, close) {
                    return Err(Flow::Stop);
                }
                Ok(self.next(close))
            }
            Some(ScopeKind::Function) | Some(ScopeKind::Lambda) | Some(ScopeKind::Class)
            | Some(ScopeKind::Struct) | Some(ScopeKind::Union) | Some(ScopeKind::Enum) => Ok(self.next(close)),
            _ => Ok(self.next(open)),
        }
    }

    fn if_block(&mut self, open: TokenId, close: TokenId, values: &mut Vec<Value>) -> Result<Option<TokenId>, Flow> {
        let list = &*self.ctx.list;
        let condition = list
            .prev(open)
            .filter(|&c| list.text(c) == ")")
            .and_then(|c| list.link(c))
            .and_then(|o| list[o].ast_op2);
        let known = condition.and_then(|c| list[c].known_int());
        let else_open = (list.str_at(close, 1) == "else" && list.str_at(close, 2) == "{")
            .then(|| list.tok_at(close, 2))
            .flatten();
        let else_close = else_open.and_then(|e| list.link(e));
        let after = self.next(else_close.unwrap_or(close));

        match known {
            Some(0) => {
                let (Some(eo), Some(ec)) = (else_open, else_close) else {
                    return Ok(after);
                };
                match self.walk_nested(self.next(eo), ec, values) {
                    Flow::Continue => Ok(after),
                    flow => Err(flow),
                }
            }
            Some(_) => match self.walk_nested(self.next(open), close, values) {
                Flow::Continue => Ok(after),
                flow => Err(flow),
            },
            None => {
                if !self.branch_allowed() {
                    return Err(Flow::Stop);
                }
                let mut then_values = values.clone();
                let then_flow = self.walk_nested(self.next(open), close, &mut then_values);
                let then_escapes = then_flow == Flow::Escape || self.escapes(open);

                let (else_flow, else_escapes) = match (else_open, else_close) {
                    (Some(eo), Some(ec)) => {
                        let mut else_values = values.clone();
                        let flow = self.walk_nested(self.next(eo), ec, &mut else_values);
                        (flow, flow == Flow::Escape || self.escapes(eo))
                    }
                    _ => (Flow::Continue, false),
                };

                if then_escapes && else_escapes {
                    return Err(Flow::Escape);
                }
                let changed = (!then_escapes && (then_flow == Flow::Stop || self.changed_in(open, close)))
                    || (!else_escapes
                        && else_open
                            .zip(else_close)
                            .is_some_and(|(eo, ec)| else_flow == Flow::Stop || self.changed_in(eo, ec)));
                if changed {
                    demote(values);
                }
                Ok(after)
            }
        }
    }

    /// `}` of a scope the walk started inside
    fn leave(&mut self, close: TokenId, values: &mut Vec<Value>) -> Result<Option<TokenId>, Flow> {
        let kind = scope_closed_at(self.ctx.list, self.ctx.db, close).map(|s| s.kind);
        match kind {
            Some(ScopeKind::Function) | Some(ScopeKind::Lambda) => Err(Flow::Stop),
            Some(ScopeKind::If) => {
                demote(values);
                let list = &*self.ctx.list;
                if list.str_at(close, 1) == "else" && list.str_at(close, 2) == "{" {
                    let else_close = list.tok_at(close, 2).and_then(|e| list.link(e));
                    return Ok(else_close.and_then(|e| list.next(e)));
                }
                Ok(self.next(close))
            }
            Some(ScopeKind::For) | Some(ScopeKind::While) | Some(ScopeKind::Do) => {
                // leaving the body: the loop may run again with other values
                demote(values);
                if kind == Some(ScopeKind::Do) {
                    // skip the `while (...) ;` tail
                    let list = &*self.ctx.list;
                    let tail_close = list.tok_at(close, 2).and_then(|o| list.link(o));
                    let semi = tail_close.and_then(|c| list.next(c));
                    return Ok(semi.and_then(|s| list.next(s)));
                }
                Ok(self.next(close))
            }
            Some(ScopeKind::Else) | Some(ScopeKind::Switch) | Some(ScopeKind::Catch) => {
                demote(values);
                Ok(self.next(close))
            }
            _ => Ok(self.next(close)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Loops
    // ═══════════════════════════════════════════════════════════════════════

    fn loop_header(&mut self, keyword: TokenId, values: &mut Vec<Value>) -> Result<Option<TokenId>, Flow> {
        let list = &*self.ctx.list;
        let open = list.next(keyword).ok_or(Flow::Stop)?;
        let close = list.link(open).ok_or(Flow::Stop)?;
        let body = list.next(close).filter(|&b| list.text(b) == "{").ok_or(Flow::Stop)?;
        let body_end = list.link(body).ok_or(Flow::Stop)?;

        if !self.changed_in(open, body_end) {
            // header and body only read the variable
            let flow = self.walk_nested(self.next(keyword), body, values);
            if flow != Flow::Continue {
                return Err(flow);
            }
            let mut body_values = values.clone();
            if self.walk_nested(self.next(body), body_end, &mut body_values) == Flow::Stop {
                return Err(Flow::Stop);
            }
            return Ok(self.next(body_end));
        }

        if self.text(keyword) == "while" && self.branch_allowed() {
            // first evaluation sees the incoming values, later ones may not
            let mut first = values.clone();
            demote(&mut first);
            let _ = self.walk_nested(self.next(keyword), body, &mut first);
            if !first.is_empty() {
                let _ = self.walk_nested(self.next(body), body_end, &mut first);
            }
        }
        Err(Flow::Stop)
    }

    fn do_loop(&mut self, keyword: TokenId, values: &mut Vec<Value>) -> Result<Option<TokenId>, Flow> {
        let list = &*self.ctx.list;
        let body = list.next(keyword).filter(|&b| list.text(b) == "{").ok_or(Flow::Stop)?;
        let body_end = list.link(body).ok_or(Flow::Stop)?;
        let tail_open = list.tok_at(body_end, 2).filter(|&o| list.text(o) == "(");
        let tail_close = tail_open.and_then(|o| list.link(o));
        let semi = tail_close.and_then(|c| list.next(c));
        let changed = self.changed_in(body, tail_close.unwrap_or(body_end));

        // the body runs at least once
        let flow = self.walk_nested(self.next(body), body_end, values);
        if changed || flow == Flow::Stop {
            return Err(Flow::Stop);
        }
        if let (Some(o), Some(c)) = (tail_open, tail_close) {
            if self.walk_nested(self.next(o), c, values) == Flow::Stop {
                return Err(Flow::Stop);
            }
        }
        Ok(semi.and_then(|s| self.next(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisLimits, Settings};
    use crate::features::library::Library;
    use crate::features::symbol_db::SymbolDatabase;
    use crate::features::tokenizer::{TokenList, Tokenizer};
    use crate::features::value_flow::domain::ValueStore;

    struct Fixture {
        list: TokenList,
        db: SymbolDatabase,
        library: Library,
        settings: Settings,
    }

    fn fixture(code: &str) -> Fixture {
        let settings = Settings::default();
        let mut list = Tokenizer::new(&settings).tokenize_str(code, "t.cpp").unwrap().list;
        let library = Library::standard().unwrap();
        let db = SymbolDatabase::build(&mut list, &settings, &library);
        Fixture {
            list,
            db,
            library,
            settings,
        }
    }

    /// Forward `value` of `name` from the token after the first `;` that
    /// follows its declaration
    fn run(fx: &mut Fixture, name: &str, value: Value) {
        let decl = fx.list.iter().find(|&t| fx.list.text(t) == name).unwrap();
        let var_id = fx.list[decl].var_id;
        let semi = fx.list.range(Some(decl), None).find(|&t| fx.list.text(t) == ";").unwrap();
        let start = fx.list.next(semi).unwrap();
        let end = super::super::access::function_end(&fx.list, &fx.db, decl).unwrap();
        let platform = fx.settings.target();
        let limits = AnalysisLimits::default();
        let mut store = ValueStore::new(None);
        let mut ctx = PassContext::new(&mut fx.list, &fx.db, &platform, &fx.library, &limits, &mut store);
        forward(&mut ctx, start, end, var_id, vec![value]);
    }

    fn values_at(fx: &Fixture, name: &str, n: usize) -> Vec<Value> {
        let t = fx.list.iter().filter(|&t| fx.list.text(t) == name).nth(n).unwrap();
        fx.list[t].values.clone()
    }

    #[test]
    fn test_read_then_write_stops() {
        let mut fx = fixture("void f() { int x; g(x + 1); x = 3; g(x); }");
        run(&mut fx, "x", Value::int(7));
        assert_eq!(values_at(&fx, "x", 1)[0].int_value(), Some(7));
        assert!(values_at(&fx, "x", 2).is_empty());
        assert!(values_at(&fx, "x", 3).is_empty());
    }

    #[test]
    fn test_branch_assignment_demotes() {
        let mut fx = fixture("void f(int c) { int x; if (c) { x = 1; } g(x); }");
        run(&mut fx, "x", Value::int(0));
        let after = values_at(&fx, "x", 2);
        assert_eq!(after.len(), 1);
        assert!(after[0].is_possible());
    }

    #[test]
    fn test_escaping_branch_keeps_known() {
        let mut fx = fixture("void f(int c) { int x; if (c) { x = 1; return; } g(x); }");
        run(&mut fx, "x", Value::int(0));
        assert!(values_at(&fx, "x", 2)[0].is_known());
    }

    #[test]
    fn test_increment_adjusts_value() {
        let mut fx = fixture("void f() { int x; x++; g(x); }");
        run(&mut fx, "x", Value::int(4));
        assert_eq!(values_at(&fx, "x", 1)[0].int_value(), Some(4));
        assert_eq!(values_at(&fx, "x", 2)[0].int_value(), Some(5));
    }

    #[test]
    fn test_loop_changing_variable_stops() {
        let mut fx = fixture("void f(int c) { int x; while (c) { x = x + 1; } g(x); }");
        run(&mut fx, "x", Value::int(0));
        let inside = values_at(&fx, "x", 2);
        assert!(inside.iter().all(|v| v.is_possible()));
        assert!(values_at(&fx, "x", 3).is_empty());
    }

    #[test]
    fn test_address_taken_stops() {
        let mut fx = fixture("void f() { int x; h(&x); g(x); }");
        run(&mut fx, "x", Value::uninit());
        assert!(values_at(&fx, "x", 2).is_empty());
    }

    #[test]
    fn test_container_actions() {
        let mut fx = fixture("void f() { std::vector<int> v; v.push_back(1); v.size(); v.clear(); v.size(); }");
        run(&mut fx, "v", Value::container_size(0));
        assert_eq!(values_at(&fx, "v", 2)[0].container_size_value(), Some(1));
        assert_eq!(values_at(&fx, "v", 4)[0].container_size_value(), Some(0));
    }
}
