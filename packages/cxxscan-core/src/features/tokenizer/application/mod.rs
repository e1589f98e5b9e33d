//! Tokenizer application layer
//!
//! `Tokenizer` turns the raw tokens of one configuration into a linked,
//! simplified token list with ASTs.

mod tokenize_usecase;

pub use tokenize_usecase::{TokenizeOutput, Tokenizer};
