//! Compiled tree-sitter queries shared across the server.
//!
//! Query objects are built once and are immutable afterwards; callers obtain
//! a fresh [`tree_sitter::QueryCursor`] per call rather than sharing one,
//! since cursors are not safe to reuse across concurrent matches.

use crate::error::{CemError, Result};
use std::collections::HashMap;
use tree_sitter::{Language, Query, StreamingIterator};

const HTML_CUSTOM_ELEMENTS: &str = r"
(element
  (start_tag
    (tag_name) @tag.name) @tag.start) @element
";

const HTML_SCRIPT_TAGS: &str = r"
(script_element) @script
";

const HTML_COMPLETION_CONTEXT: &str = r"
(start_tag (tag_name) @tag.name.context)
(attribute (attribute_name) @attribute.context)
(quoted_attribute_value (attribute_value) @attr.value.completion)
";

const HTML_HEAD_ELEMENTS: &str = r"
(element
  (start_tag (tag_name) @head.tag (#eq? @head.tag \"head\")))
";

const TS_HTML_TEMPLATES: &str = r"
(call_expression
  function: (identifier) @tag (#eq? @tag \"html\")
  arguments: (template_string) @template)
(tagged_template_expression
  tag: (identifier) @tag (#eq? @tag \"html\")
  (template_string) @template)
";

const TS_IMPORTS: &str = r"
(import_statement
  source: (string (string_fragment) @import.path)) @import.static
(call_expression
  function: (import) @import.dynamic.fn
  arguments: (arguments (string (string_fragment) @import.path)))
";

const TS_COMPLETION_CONTEXT: &str = r"
(template_string) @template
(template_substitution) @template.substitution
";

/// Grammar selector for a compiled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Html,
    TypeScript,
}

/// A single named query keyed by grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub grammar: Grammar,
    pub name: &'static str,
}

/// Owns one compiled [`Query`] per `(grammar, name)` pair, all built once at
/// server startup.
pub struct QueryCache {
    queries: HashMap<(Grammar, &'static str), Query>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("count", &self.queries.len())
            .finish()
    }
}

impl QueryCache {
    /// Compiles every required query. Fails fast on a malformed query source
    /// (a programmer error, never a user-facing condition).
    pub fn new() -> Result<Self> {
        let html_lang: Language = tree_sitter_html::LANGUAGE.into();
        let ts_lang: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();

        let mut queries = HashMap::new();
        queries.insert(
            (Grammar::Html, "html.customElements"),
            compile(&html_lang, HTML_CUSTOM_ELEMENTS)?,
        );
        queries.insert(
            (Grammar::Html, "html.scriptTags"),
            compile(&html_lang, HTML_SCRIPT_TAGS)?,
        );
        queries.insert(
            (Grammar::Html, "html.completionContext"),
            compile(&html_lang, HTML_COMPLETION_CONTEXT)?,
        );
        queries.insert(
            (Grammar::Html, "html.headElements"),
            compile(&html_lang, HTML_HEAD_ELEMENTS)?,
        );
        queries.insert(
            (Grammar::TypeScript, "ts.htmlTemplates"),
            compile(&ts_lang, TS_HTML_TEMPLATES)?,
        );
        queries.insert(
            (Grammar::TypeScript, "ts.imports"),
            compile(&ts_lang, TS_IMPORTS)?,
        );
        queries.insert(
            (Grammar::TypeScript, "ts.completionContext"),
            compile(&ts_lang, TS_COMPLETION_CONTEXT)?,
        );

        Ok(Self { queries })
    }

    fn get(&self, grammar: Grammar, name: &'static str) -> Option<&Query> {
        self.queries.get(&(grammar, name))
    }

    /// Runs `name` over `root`, returning one capture map per match in query
    /// order. Each map's values preserve the order captures appeared in the
    /// source.
    #[must_use]
    pub fn matches(
        &self,
        grammar: Grammar,
        name: &'static str,
        root: tree_sitter::Node,
        source: &[u8],
    ) -> Vec<HashMap<String, Vec<tree_sitter::Range>>> {
        let Some(query) = self.get(grammar, name) else {
            return Vec::new();
        };
        let names: Vec<&str> = query.capture_names().to_vec();
        let mut cursor = tree_sitter::QueryCursor::new();
        let mut out = Vec::new();
        let mut matches = cursor.matches(query, root, source);
        while let Some(m) = matches.next() {
            let mut map: HashMap<String, Vec<tree_sitter::Range>> = HashMap::new();
            for capture in m.captures {
                let cap_name = names[capture.index as usize].to_string();
                map.entry(cap_name).or_default().push(capture.node.range());
            }
            out.push(map);
        }
        out
    }
}

fn compile(lang: &Language, source: &str) -> Result<Query> {
    Query::new(lang, source).map_err(|e| CemError::TreeSitterLanguage(e.to_string()))
}
