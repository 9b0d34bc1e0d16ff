//! Per-URI document lifecycle: content, syntax tree, and script-tag index.

use crate::incremental::{
    compute_edits_and_apply, grammar_for_path, reparse_incremental, should_attempt_incremental,
};
use crate::parser_pool::ParserPool;
use crate::position::{offset_to_position, position_to_offset};
use crate::query::{Grammar, QueryCache};
use dashmap::DashMap;
use std::sync::Arc;
use tower_lsp_server::lsp_types::{Position, Range, TextDocumentContentChangeEvent, Uri};
use tree_sitter::Tree;

/// Whether an import is statically resolvable at parse time or dynamic
/// (`import(...)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Static,
    Dynamic,
}

/// A single `import` reference found in a document or embedded script.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStatement {
    pub specifier: String,
    pub kind: ImportKind,
    pub range: Range,
}

/// A `<script>` element within an HTML document and its discovered imports.
#[derive(Debug, Clone)]
pub struct ScriptTag {
    pub range: Range,
    pub content_range: Range,
    pub is_module: bool,
    pub src: Option<String>,
    pub imports: Vec<ImportStatement>,
}

/// A custom element tag found while scanning a document, with the byte/LSP
/// ranges of its tag name and of each attribute.
#[derive(Debug, Clone)]
pub struct CustomElementMatch {
    pub tag_name: String,
    pub tag_name_range: Range,
    pub element_range: Range,
    pub attributes: Vec<AttributeMatch>,
}

#[derive(Debug, Clone)]
pub struct AttributeMatch {
    pub name: String,
    pub name_range: Range,
    pub value: Option<String>,
    pub value_range: Option<Range>,
}

/// One open document: its content, language, version, syntax tree, and the
/// script tags discovered within it (empty for non-HTML documents).
pub struct Document {
    pub uri: Uri,
    pub grammar: Grammar,
    pub version: i32,
    pub content: String,
    pub tree: Tree,
    pub script_tags: Vec<ScriptTag>,
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Self {
            uri: self.uri.clone(),
            grammar: self.grammar,
            version: self.version,
            content: self.content.clone(),
            tree: self.tree.clone(),
            script_tags: self.script_tags.clone(),
        }
    }
}

impl Document {
    /// Finds the custom-element match whose tag-name range contains
    /// `position`, if any.
    #[must_use]
    pub fn find_element_at(&self, queries: &QueryCache, position: Position) -> Option<CustomElementMatch> {
        self.custom_elements(queries)
            .into_iter()
            .find(|m| range_contains(m.tag_name_range, position))
    }

    /// Finds the attribute match (and its owning tag) whose name range
    /// contains `position`, if any.
    #[must_use]
    pub fn find_attribute_at(
        &self,
        queries: &QueryCache,
        position: Position,
    ) -> Option<(CustomElementMatch, AttributeMatch)> {
        for el in self.custom_elements(queries) {
            if let Some(attr) = el.attributes.iter().find(|a| range_contains(a.name_range, position)) {
                let attr = attr.clone();
                return Some((el, attr));
            }
        }
        None
    }

    /// Every custom-element tag in the document (tag names containing `-`),
    /// with their attributes.
    #[must_use]
    pub fn custom_elements(&self, queries: &QueryCache) -> Vec<CustomElementMatch> {
        if self.grammar != Grammar::Html {
            return Vec::new();
        }
        let bytes = self.content.as_bytes();
        let matches = queries.matches(Grammar::Html, "html.customElements", self.tree.root_node(), bytes);
        let mut out = Vec::new();
        for m in matches {
            let Some(name_ranges) = m.get("tag.name") else {
                continue;
            };
            let Some(name_range) = name_ranges.first() else {
                continue;
            };
            let tag_name = self.content[name_range.start_byte..name_range.end_byte].to_string();
            if !tag_name.contains('-') {
                continue;
            }
            let element_range = m
                .get("element")
                .and_then(|r| r.first())
                .copied()
                .unwrap_or(*name_range);
            out.push(CustomElementMatch {
                tag_name,
                tag_name_range: ts_range_to_lsp(&self.content, *name_range),
                element_range: ts_range_to_lsp(&self.content, element_range),
                attributes: self.attributes_within(element_range),
            });
        }
        out
    }

    fn attributes_within(&self, element_range: tree_sitter::Range) -> Vec<AttributeMatch> {
        let mut cursor = self.tree.root_node().walk();
        let mut out = Vec::new();
        collect_attributes(&self.tree.root_node(), element_range, &self.content, &mut out, &mut cursor);
        out
    }
}

fn collect_attributes(
    node: &tree_sitter::Node,
    element_range: tree_sitter::Range,
    content: &str,
    out: &mut Vec<AttributeMatch>,
    cursor: &mut tree_sitter::TreeCursor,
) {
    if node.start_byte() >= element_range.start_byte && node.end_byte() <= element_range.end_byte {
        if node.kind() == "attribute" {
            if let Some(name_node) = node.child_by_field_name("name").or_else(|| {
                let mut c = node.walk();
                node.children(&mut c).find(|n| n.kind() == "attribute_name")
            }) {
                let name = content[name_node.start_byte()..name_node.end_byte()].to_string();
                let mut value = None;
                let mut value_range = None;
                let mut c = node.walk();
                for child in node.children(&mut c) {
                    if child.kind() == "quoted_attribute_value" || child.kind() == "attribute_value" {
                        let raw = &content[child.start_byte()..child.end_byte()];
                        value = Some(raw.trim_matches(['"', '\'']).to_string());
                        value_range = Some(ts_range_to_lsp(content, child.range()));
                    }
                }
                out.push(AttributeMatch {
                    name,
                    name_range: ts_range_to_lsp(content, name_node.range()),
                    value,
                    value_range,
                });
            }
        }
    }
    for child in node.children(cursor) {
        let mut child_cursor = child.walk();
        collect_attributes(&child, element_range, content, out, &mut child_cursor);
    }
}

fn ts_range_to_lsp(content: &str, range: tree_sitter::Range) -> Range {
    Range {
        start: offset_to_position(content, range.start_byte),
        end: offset_to_position(content, range.end_byte),
    }
}

fn range_contains(range: Range, position: Position) -> bool {
    let after_start = position.line > range.start.line
        || (position.line == range.start.line && position.character >= range.start.character);
    let before_end = position.line < range.end.line
        || (position.line == range.end.line && position.character <= range.end.character);
    after_start && before_end
}

/// Concurrent store of every open document, keyed by URI.
pub struct DocumentStore {
    documents: DashMap<Uri, Document>,
    parsers: Arc<ParserPool>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("open_documents", &self.documents.len())
            .finish()
    }
}

impl DocumentStore {
    #[must_use]
    pub fn new(parsers: Arc<ParserPool>) -> Self {
        Self {
            documents: DashMap::new(),
            parsers,
        }
    }

    /// Opens `uri` with `content`, replacing any existing document for the
    /// same URI.
    pub fn open(&self, uri: Uri, content: String, version: i32) {
        let grammar = grammar_for_path(uri.path().as_str());
        let mut parser = self.parsers.acquire(grammar).unwrap_or_else(|_| tree_sitter::Parser::new());
        let Some(tree) = parser.parse(&content, None) else {
            return;
        };
        self.parsers.release(grammar, parser);

        let mut doc = Document {
            uri: uri.clone(),
            grammar,
            version,
            content,
            tree,
            script_tags: Vec::new(),
        };
        self.refresh_script_tags(&mut doc);
        self.documents.insert(uri, doc);
    }

    /// Applies `changes` to the document at `uri`, reparsing incrementally
    /// when eligible and falling back to a full parse when validation fails.
    /// Behaves like [`Self::open`] if `uri` was not already open.
    pub fn update(&self, uri: Uri, changes: Vec<TextDocumentContentChangeEvent>, version: i32) {
        if !self.documents.contains_key(&uri) {
            let content = changes.into_iter().next_back().map_or_else(String::new, |c| c.text);
            self.open(uri, content, version);
            return;
        }
        let Some(mut existing) = self.documents.get_mut(&uri) else {
            return;
        };

        let attempt_incremental = should_attempt_incremental(&existing.content, &changes);
        let (edits, new_content) = compute_edits_and_apply(&existing.content, &changes);

        let grammar = existing.grammar;
        let mut parser = self.parsers.acquire(grammar).unwrap_or_else(|_| tree_sitter::Parser::new());

        let outcome = if attempt_incremental {
            reparse_incremental(&mut parser, &existing.tree, &edits, &new_content)
        } else if let Some(tree) = parser.parse(&new_content, None) {
            crate::incremental::ReparseOutcome {
                tree,
                used_incremental: false,
            }
        } else {
            self.parsers.release(grammar, parser);
            return;
        };

        self.parsers.release(grammar, parser);

        existing.content = new_content;
        existing.tree = outcome.tree;
        existing.version = version;
        let mut doc = existing.clone();
        drop(existing);
        self.refresh_script_tags(&mut doc);
        self.documents.insert(uri, doc);
    }

    /// Removes `uri` from the store, returning its parser to the pool.
    pub fn close(&self, uri: &Uri) {
        self.documents.remove(uri);
    }

    /// A cloned snapshot of the document at `uri`, if open.
    #[must_use]
    pub fn get(&self, uri: &Uri) -> Option<Document> {
        self.documents.get(uri).map(|d| d.clone())
    }

    #[must_use]
    pub fn is_open(&self, uri: &Uri) -> bool {
        self.documents.contains_key(uri)
    }

    /// URIs of every currently open document, in no particular order.
    #[must_use]
    pub fn open_uris(&self) -> Vec<Uri> {
        self.documents.iter().map(|e| e.key().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn refresh_script_tags(&self, doc: &mut Document) {
        if doc.grammar != Grammar::Html {
            doc.script_tags.clear();
            return;
        }
        doc.script_tags = crate::document::discover_script_tags(doc, &self.parsers);
    }
}

/// Discovers `<script>` tags in an HTML document and, for inline module
/// scripts, parses their content as TypeScript to extract imports.
fn discover_script_tags(doc: &Document, parsers: &ParserPool) -> Vec<ScriptTag> {
    let mut cursor = doc.tree.root_node().walk();
    let mut tags = Vec::new();
    walk_script_elements(&doc.tree.root_node(), &doc.content, &mut cursor, &mut tags);

    for tag in &mut tags {
        if !tag.is_module || tag.src.is_some() {
            continue;
        }
        let start = position_to_offset(&doc.content, tag.content_range.start);
        let end = position_to_offset(&doc.content, tag.content_range.end);
        if start >= end || end > doc.content.len() {
            continue;
        }
        let script_source = &doc.content[start..end];
        let Ok(mut parser) = parsers.acquire(Grammar::TypeScript) else {
            continue;
        };
        if let Some(tree) = parser.parse(script_source, None) {
            tag.imports = extract_imports_from_source(script_source, &tree, start, &doc.content);
        }
        parsers.release(Grammar::TypeScript, parser);
    }

    tags
}

fn walk_script_elements(
    node: &tree_sitter::Node,
    content: &str,
    cursor: &mut tree_sitter::TreeCursor,
    out: &mut Vec<ScriptTag>,
) {
    if node.kind() == "script_element" {
        if let Some(tag) = build_script_tag(node, content) {
            out.push(tag);
        }
    }
    for child in node.children(cursor) {
        let mut child_cursor = child.walk();
        walk_script_elements(&child, content, &mut child_cursor, out);
    }
}

fn build_script_tag(node: &tree_sitter::Node, content: &str) -> Option<ScriptTag> {
    let mut script_type = None;
    let mut src = None;
    let mut raw_text_range = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "start_tag" {
            let mut attr_cursor = child.walk();
            for attr in child.children(&mut attr_cursor) {
                if attr.kind() != "attribute" {
                    continue;
                }
                let attr_text = &content[attr.start_byte()..attr.end_byte()];
                if let Some((name, value)) = split_attribute(attr_text) {
                    match name {
                        "type" => script_type = Some(value.to_string()),
                        "src" => src = Some(value.to_string()),
                        _ => {}
                    }
                }
            }
        } else if child.kind() == "raw_text" {
            raw_text_range = Some(child.range());
        }
    }

    let is_module = script_type.as_deref() == Some("module");
    let content_range = raw_text_range.map_or(
        Range {
            start: offset_to_position(content, node.end_byte()),
            end: offset_to_position(content, node.end_byte()),
        },
        |r| ts_range_to_lsp(content, r),
    );

    Some(ScriptTag {
        range: ts_range_to_lsp(content, node.range()),
        content_range,
        is_module,
        src,
        imports: Vec::new(),
    })
}

fn split_attribute(attr_text: &str) -> Option<(&str, &str)> {
    let (name, rest) = attr_text.split_once('=')?;
    let value = rest.trim_matches(['"', '\'']);
    Some((name.trim(), value))
}

fn extract_imports_from_source(
    script_source: &str,
    tree: &Tree,
    script_offset_in_doc: usize,
    doc_content: &str,
) -> Vec<ImportStatement> {
    // Queries are cheap to compile for a single pass over a small embedded
    // script; the long-lived QueryCache handles the hot document-wide path.
    let Ok(queries) = QueryCache::new() else {
        return Vec::new();
    };
    let matches = queries.matches(
        Grammar::TypeScript,
        "ts.imports",
        tree.root_node(),
        script_source.as_bytes(),
    );
    let mut out = Vec::new();
    for m in matches {
        let kind = if m.contains_key("import.dynamic.fn") {
            ImportKind::Dynamic
        } else {
            ImportKind::Static
        };
        let Some(ranges) = m.get("import.path") else {
            continue;
        };
        let Some(range) = ranges.first() else {
            continue;
        };
        let specifier = script_source[range.start_byte..range.end_byte].to_string();
        let doc_start = script_offset_in_doc + range.start_byte;
        let doc_end = script_offset_in_doc + range.end_byte;
        out.push(ImportStatement {
            specifier,
            kind,
            range: Range {
                start: offset_to_position(doc_content, doc_start),
                end: offset_to_position(doc_content, doc_end),
            },
        });
    }
    out
}
