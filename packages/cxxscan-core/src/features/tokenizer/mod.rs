//! Tokenizer Feature
//!
//! ## Structure
//! - `domain/` - Token, TokenList, ValueType
//! - `infrastructure/` - lexer, bracket linking, pattern matching,
//!   simplification passes, AST construction
//! - `application/` - Tokenizer (raw tokens → analyzable token list)

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{TokenizeOutput, Tokenizer};
pub use domain::{BaseType, Sign, Token, TokenFlags, TokenKind, TokenList, ValueType};
pub use infrastructure::{
    find_match, find_match_varid, lex, matches, matches_varid, RawToken, TokenizeError,
    TokenizeResult,
};
