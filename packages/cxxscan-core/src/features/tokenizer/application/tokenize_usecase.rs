//! Tokenize use case

use crate::config::{AnalysisLimits, Platform, Settings};
use crate::features::tokenizer::domain::{Token, TokenKind, TokenList};
use crate::features::tokenizer::infrastructure::{
    create_ast, lex, link_brackets, link_templates, simplify, RawToken, SimplifyReport,
    TokenizeError, TokenizeResult,
};
use crate::features::tokenizer::infrastructure::numbers::invalid_number_reason;
use tracing::debug;

/// Result of tokenizing one configuration
#[derive(Debug)]
pub struct TokenizeOutput {
    pub list: TokenList,
    pub simplify: SimplifyReport,
}

/// Raw tokens → linked, simplified token list with ASTs
#[derive(Debug, Clone)]
pub struct Tokenizer {
    platform: Platform,
    limits: AnalysisLimits,
}

impl Tokenizer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            platform: settings.target(),
            limits: settings.analysis_limits(),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Build the token list, validate literals and link brackets
    pub fn create_tokens(&self, raw: Vec<RawToken>, files: Vec<String>) -> TokenizeResult<TokenList> {
        let mut list = TokenList::new(files);
        for raw_tok in raw {
            let mut tok = Token::new(raw_tok.text, raw_tok.file_index, raw_tok.line, raw_tok.column);
            tok.flags |= raw_tok.flags;
            let id = list.push_back(tok);
            if list[id].kind == TokenKind::Number {
                if let Some(reason) = invalid_number_reason(list.text(id)) {
                    return Err(TokenizeError::syntax(
                        format!("{}: '{}'", reason, list.text(id)),
                        list.location(id),
                    ));
                }
            }
        }
        link_brackets(&mut list)?;
        link_templates(&mut list);
        Ok(list)
    }

    /// Run the simplification passes, then build ASTs
    pub fn simplify_token_list(&self, list: &mut TokenList) -> TokenizeResult<SimplifyReport> {
        let report = simplify(list, &self.platform, self.limits.max_simplify_rounds);
        create_ast(list)?;
        debug!(rounds = report.rounds, bounded = report.bounded, tokens = list.len(), "token list simplified");
        Ok(report)
    }

    /// Full tokenization of preprocessed raw tokens
    pub fn tokenize(&self, raw: Vec<RawToken>, files: Vec<String>) -> TokenizeResult<TokenizeOutput> {
        let mut list = self.create_tokens(raw, files)?;
        let simplify = self.simplify_token_list(&mut list)?;
        Ok(TokenizeOutput { list, simplify })
    }

    /// Tokenize source text directly, without preprocessing
    pub fn tokenize_str(&self, code: &str, file_name: &str) -> TokenizeResult<TokenizeOutput> {
        let raw = lex(code, 0, file_name)?;
        self.tokenize(raw, vec![file_name.to_string()])
    }
}
