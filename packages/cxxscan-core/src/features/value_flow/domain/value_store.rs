//! Append-only value storage on tokens

use super::value::Value;
use crate::features::tokenizer::TokenList;
use crate::shared::models::TokenId;

/// Adds values to tokens, deduplicating and enforcing the per-token cap.
/// Values are never removed during a run.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    max_per_token: Option<usize>,
    added: usize,
    dropped: usize,
}

impl ValueStore {
    pub fn new(max_per_token: Option<usize>) -> Self {
        Self {
            max_per_token,
            added: 0,
            dropped: 0,
        }
    }

    /// Returns true when the value was new for the token
    pub fn add(&mut self, tokens: &mut TokenList, tok: TokenId, value: Value) -> bool {
        let values = &mut tokens[tok].values;
        if values.iter().any(|v| v.same_fact(&value)) {
            return false;
        }
        if let Some(max) = self.max_per_token {
            if values.len() >= max {
                self.dropped += 1;
                return false;
            }
        }
        values.push(value);
        self.added += 1;
        true
    }

    /// Values added over the lifetime of the store
    pub fn added(&self) -> usize {
        self.added
    }

    /// Values rejected by the per-token cap
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
