//! Value Flow Ports
//!
//! Every analysis that attaches values to tokens implements
//! [`ValueFlowPass`]. The engine runs the registered passes in order, sweep
//! after sweep, until one full sweep adds nothing or the budget runs out.

use crate::config::{AnalysisLimits, Platform};
use crate::features::library::Library;
use crate::features::symbol_db::SymbolDatabase;
use crate::features::tokenizer::TokenList;
use crate::features::value_flow::domain::{Value, ValueStore};
use crate::shared::models::TokenId;

// ═══════════════════════════════════════════════════════════════════════════
// Pass context
// ═══════════════════════════════════════════════════════════════════════════

/// Everything a pass may read, plus the only way to write: `add_value`
pub struct PassContext<'a> {
    pub list: &'a mut TokenList,
    pub db: &'a SymbolDatabase,
    pub platform: &'a Platform,
    pub library: &'a Library,
    pub limits: &'a AnalysisLimits,
    store: &'a mut ValueStore,
}

impl<'a> PassContext<'a> {
    pub fn new(
        list: &'a mut TokenList,
        db: &'a SymbolDatabase,
        platform: &'a Platform,
        library: &'a Library,
        limits: &'a AnalysisLimits,
        store: &'a mut ValueStore,
    ) -> Self {
        Self {
            list,
            db,
            platform,
            library,
            limits,
            store,
        }
    }

    /// Attach `value` to `tok`; false when the token already had it or is full
    pub fn add_value(&mut self, tok: TokenId, value: Value) -> bool {
        self.store.add(self.list, tok, value)
    }

    /// Values added through this context's store so far
    pub fn values_added(&self) -> usize {
        self.store.added()
    }

    /// Attach several values, returning how many were new
    pub fn add_values(&mut self, tok: TokenId, values: impl IntoIterator<Item = Value>) -> usize {
        values
            .into_iter()
            .filter(|v| self.store.add(self.list, tok, v.clone()))
            .count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Pass port
// ═══════════════════════════════════════════════════════════════════════════

/// One value-flow analysis
///
/// Passes read existing values and add new ones; they never remove or
/// rewrite a value. Running a pass twice on an unchanged list adds nothing
/// the second time.
pub trait ValueFlowPass: Send + Sync {
    /// Pass name for logging
    fn name(&self) -> &'static str;

    /// Run once over the whole list, returning the number of values added
    fn run(&self, ctx: &mut PassContext<'_>) -> usize;
}
