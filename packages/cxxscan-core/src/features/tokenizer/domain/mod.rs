//! Tokenizer domain model

mod token;
mod token_list;
mod value_type;

pub use token::{
    char_literal_value, is_keyword, is_standard_type, string_literal_value, Token, TokenFlags,
    TokenKind,
};
pub use token_list::{TokenIter, TokenList};
pub use value_type::{BaseType, Sign, ValueType};
