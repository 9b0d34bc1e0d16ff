//! Reusable tree-sitter parser instances.
//!
//! Parsers are expensive to construct (they allocate grammar tables) but
//! cheap to reset, so the pool hands out a parser on `acquire` and expects
//! the caller to `release` it back rather than drop it.

use crate::error::{CemError, Result};
use crate::query::Grammar;
use std::sync::Mutex;
use tree_sitter::{Language, Parser};

/// A pool of parser instances for a single grammar.
pub struct ParserPool {
    html: Mutex<Vec<Parser>>,
    typescript: Mutex<Vec<Parser>>,
}

impl std::fmt::Debug for ParserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserPool").finish()
    }
}

impl Default for ParserPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserPool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            html: Mutex::new(Vec::new()),
            typescript: Mutex::new(Vec::new()),
        }
    }

    /// Takes a parser for `grammar` from the pool, creating one if the pool
    /// is empty.
    pub fn acquire(&self, grammar: Grammar) -> Result<Parser> {
        let bucket = match grammar {
            Grammar::Html => &self.html,
            Grammar::TypeScript => &self.typescript,
        };
        if let Some(parser) = bucket.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop() {
            return Ok(parser);
        }
        let language: Language = match grammar {
            Grammar::Html => tree_sitter_html::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        };
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| CemError::TreeSitterLanguage(e.to_string()))?;
        Ok(parser)
    }

    /// Returns `parser` to the pool after resetting it. The parser's
    /// allocations are retained for the next `acquire`.
    pub fn release(&self, grammar: Grammar, mut parser: Parser) {
        parser.reset();
        let bucket = match grammar {
            Grammar::Html => &self.html,
            Grammar::TypeScript => &self.typescript,
        };
        bucket
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(parser);
    }
}
