//! Linking calls to functions and classes to their bases

use crate::features::symbol_db::domain::{FunctionKind, SymbolDatabase};
use crate::features::tokenizer::{TokenFlags, TokenList};
use crate::shared::models::{FunctionId, TokenId, TypeId};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Number of arguments in a call argument tree
pub fn argument_count(list: &TokenList, args: Option<TokenId>) -> usize {
    match args {
        None => 0,
        Some(a) if list.text(a) == "," => {
            argument_count(list, list[a].ast_op1) + argument_count(list, list[a].ast_op2)
        }
        Some(_) => 1,
    }
}

/// Arguments of a call in source order
pub fn call_arguments(list: &TokenList, call: TokenId) -> Vec<TokenId> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    if let Some(args) = list[call].ast_op2 {
        stack.push(args);
    }
    while let Some(t) = stack.pop() {
        if list.text(t) == "," {
            // op2 pushed first so op1 pops first
            if let Some(rhs) = list[t].ast_op2 {
                stack.push(rhs);
            }
            if let Some(lhs) = list[t].ast_op1 {
                stack.push(lhs);
            }
        } else {
            out.push(t);
        }
    }
    out
}

/// Name token of the function called at `(`, if it is a call
pub fn callee_name(list: &TokenList, open: TokenId) -> Option<TokenId> {
    let tok = &list[open];
    if tok.text != "(" || tok.flags.contains(TokenFlags::CAST) {
        return None;
    }
    let callee = tok.ast_op1?;
    let name = match list.text(callee) {
        "." | "::" => list[callee].ast_op2?,
        _ => callee,
    };
    list[name].is_identifier().then_some(name)
}

/// Stamp call-site name tokens with the function they call. Overloads are
/// told apart by argument count only.
pub fn link_calls(list: &mut TokenList, db: &SymbolDatabase) -> usize {
    let calls: Vec<(TokenId, usize)> = list
        .iter()
        .filter_map(|t| {
            let name = callee_name(list, t)?;
            (list[name].function.is_none() && list[name].variable.is_none())
                .then(|| (name, argument_count(list, list[t].ast_op2)))
        })
        .collect();

    let mut linked = 0;
    for (name, argc) in calls {
        let text = list.text(name);
        let candidates: Vec<FunctionId> = db
            .functions_named(text)
            .filter(|f| f.kind != FunctionKind::Lambda && f.accepts_arg_count(argc))
            .map(|f| f.id)
            .collect();
        let chosen = candidates
            .iter()
            .copied()
            .find(|&f| db.function(f).has_body())
            .or_else(|| candidates.first().copied());
        if let Some(f) = chosen {
            list[name].function = Some(f);
            linked += 1;
        }
    }
    linked
}

/// Resolve base class names to types; edges closing an inheritance cycle
/// are dropped
pub fn resolve_bases(db: &mut SymbolDatabase) {
    for ty in 0..db.types.len() {
        for b in 0..db.types[ty].bases.len() {
            let name = db.types[ty].bases[b].name.clone();
            let target = db.find_type(&name).map(|t| t.id);
            db.types[ty].bases[b].type_id = target.filter(|&t| t.index() != ty);
        }
    }

    // depth-first search over base edges; an edge to a type on the current
    // path closes a cycle
    let mut done: FxHashSet<TypeId> = FxHashSet::default();
    for root in 0..db.types.len() {
        let root = TypeId::from_index(root);
        if done.contains(&root) {
            continue;
        }
        let mut path: Vec<(TypeId, usize)> = vec![(root, 0)];
        while let Some(top) = path.last_mut() {
            let (ty, edge) = *top;
            top.1 += 1;
            if edge >= db.type_info(ty).bases.len() {
                done.insert(ty);
                path.pop();
                continue;
            }
            let Some(base) = db.type_info(ty).bases[edge].type_id else {
                continue;
            };
            if path.iter().any(|&(p, _)| p == base) {
                debug!(
                    class = %db.type_info(ty).name,
                    base = %db.type_info(base).name,
                    "Inheritance cycle, dropping base link"
                );
                db.types[ty.index()].bases[edge].type_id = None;
            } else if !done.contains(&base) {
                path.push((base, 0));
            }
        }
    }
}
