//! Tokenizer infrastructure: lexing, linking, simplification and AST

pub mod ast;
pub mod errors;
pub mod lexer;
pub mod links;
pub mod numbers;
pub mod pattern;
pub mod simplify;

pub use ast::create_ast;
pub use errors::{TokenizeError, TokenizeResult};
pub use lexer::{lex, RawToken};
pub use links::{link_brackets, link_templates, links_are_consistent};
pub use pattern::{find_match, find_match_varid, matches, matches_varid};
pub use simplify::{simplify, simplify_round, statement_end, SimplifyReport};
