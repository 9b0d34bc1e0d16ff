//! Classifies the token at the cursor into a [`CompletionKind`] so the LSP
//! handler knows what to offer: tag names, attribute names, attribute
//! values, or a framework-specific binding sigil inside a template literal.

use crate::document::Document;
use crate::position::position_to_offset;
use crate::query::{Grammar, QueryCache};
use tower_lsp_server::lsp_types::Position;

/// A small, closed set of standard (non-custom) HTML elements. Used to keep
/// the tag-name completion from firing for ordinary elements unless the
/// user is still in the middle of typing a short prefix.
const STANDARD_ELEMENTS: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi", "bdo",
    "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code", "col", "colgroup",
    "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt", "em",
    "embed", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "i", "iframe", "img", "input", "ins", "kbd", "label",
    "legend", "li", "link", "main", "map", "mark", "meta", "meter", "nav", "noscript", "object",
    "ol", "optgroup", "option", "output", "p", "param", "picture", "pre", "progress", "q", "rp",
    "rt", "ruby", "s", "samp", "script", "section", "select", "slot", "small", "source", "span",
    "strong", "style", "sub", "summary", "sup", "table", "tbody", "td", "template", "textarea",
    "tfoot", "th", "thead", "time", "title", "tr", "track", "u", "ul", "var", "video", "wbr",
];

/// Classification of what the cursor is positioned to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionKind {
    TagName,
    AttributeName { tag: String },
    AttributeValue { tag: String, attribute: String },
    LitEventBinding { tag: String },
    LitPropertyBinding { tag: String },
    LitBooleanAttribute { tag: String },
    Unknown,
}

/// Result of classifying a cursor position: the kind plus the text prefix
/// already typed, used to filter completion candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionAnalysis {
    pub kind: CompletionKind,
    pub prefix: String,
}

/// Classifies the cursor at `position` within `document`.
#[must_use]
pub fn analyze(queries: &QueryCache, document: &Document, position: Position) -> CompletionAnalysis {
    match document.grammar {
        Grammar::Html => analyze_html(queries, &document.content, &document.tree, position),
        Grammar::TypeScript => analyze_typescript(queries, document, position),
    }
}

fn analyze_typescript(
    queries: &QueryCache,
    document: &Document,
    position: Position,
) -> CompletionAnalysis {
    let offset = position_to_offset(&document.content, position);
    let matches = queries.matches(
        Grammar::TypeScript,
        "ts.completionContext",
        document.tree.root_node(),
        document.content.as_bytes(),
    );

    for m in &matches {
        if let Some(ranges) = m.get("template.substitution") {
            for range in ranges {
                if offset >= range.start_byte && offset <= range.end_byte {
                    return CompletionAnalysis {
                        kind: CompletionKind::Unknown,
                        prefix: String::new(),
                    };
                }
            }
        }
    }

    for m in &matches {
        if let Some(ranges) = m.get("template") {
            for range in ranges {
                if offset >= range.start_byte && offset <= range.end_byte {
                    let inner = &document.content[range.start_byte..range.end_byte];
                    let relative_offset = offset - range.start_byte;
                    let inner_pos = crate::position::offset_to_position(inner, relative_offset);
                    let html_source = inner.trim_start_matches('`');
                    let trimmed_offset = inner.len() - html_source.len();
                    let _ = trimmed_offset;
                    let mut parser = tree_sitter::Parser::new();
                    if parser
                        .set_language(&tree_sitter_html::LANGUAGE.into())
                        .is_ok()
                    {
                        if let Some(tree) = parser.parse(inner, None) {
                            let mut analysis = analyze_html(queries, inner, &tree, inner_pos);
                            analysis = apply_lit_sigils(inner, relative_offset, analysis);
                            return analysis;
                        }
                    }
                }
            }
        }
    }

    CompletionAnalysis {
        kind: CompletionKind::Unknown,
        prefix: String::new(),
    }
}

fn apply_lit_sigils(source: &str, offset: usize, analysis: CompletionAnalysis) -> CompletionAnalysis {
    let CompletionKind::AttributeName { tag } = &analysis.kind else {
        return analysis;
    };
    let Some(prefix_start) = find_sigil_scan_start(source, offset) else {
        return analysis;
    };
    let sigil = &source[prefix_start..=prefix_start];
    match sigil {
        "@" => CompletionAnalysis {
            kind: CompletionKind::LitEventBinding { tag: tag.clone() },
            prefix: analysis.prefix,
        },
        "." => CompletionAnalysis {
            kind: CompletionKind::LitPropertyBinding { tag: tag.clone() },
            prefix: analysis.prefix,
        },
        "?" => CompletionAnalysis {
            kind: CompletionKind::LitBooleanAttribute { tag: tag.clone() },
            prefix: analysis.prefix,
        },
        _ => analysis,
    }
}

/// Scans backward from `offset` over identifier characters to find a
/// framework-attribute sigil (`@`, `.`, `?`) immediately preceding an
/// attribute name. Stops at whitespace, `=`, `<`, or `>`.
fn find_sigil_scan_start(source: &str, offset: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = offset.min(bytes.len());
    while i > 0 {
        let c = bytes[i - 1] as char;
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            i -= 1;
            continue;
        }
        if c == '@' || c == '.' || c == '?' {
            return Some(i - 1);
        }
        break;
    }
    None
}

fn analyze_html(
    queries: &QueryCache,
    content: &str,
    tree: &tree_sitter::Tree,
    position: Position,
) -> CompletionAnalysis {
    let offset = position_to_offset(content, position);
    let matches = queries.matches(Grammar::Html, "html.completionContext", tree.root_node(), content.as_bytes());

    let line = content.split('\n').nth(position.line as usize).unwrap_or("");

    // 1. Immediately after a tag name, in trailing whitespace: attribute-name
    //    completion for that tag, provided the tag looks like a real custom
    //    element (contains '-', length > 3).
    if let Some((tag, tag_end)) = tag_name_immediately_before(&matches, content, offset) {
        if tag.contains('-') && tag.len() > 3 && offset >= tag_end {
            return CompletionAnalysis {
                kind: CompletionKind::AttributeName { tag },
                prefix: attribute_name_prefix(line, position.character),
            };
        }
    }

    // 3/4. Attribute-value completion takes precedence when inside a quoted
    //    value.
    if let Some((tag, attr)) = attribute_value_context(&matches, content, offset, tree) {
        return CompletionAnalysis {
            kind: CompletionKind::AttributeValue { tag, attribute: attr },
            prefix: attribute_value_prefix(line, position.character),
        };
    }

    // Tag-name completion.
    if let Some(ranges) = matches.iter().find_map(|m| m.get("tag.name.context")) {
        for range in ranges {
            if offset >= range.start_byte && offset <= range.end_byte {
                let tag_text = &content[range.start_byte..range.end_byte];
                if STANDARD_ELEMENTS.contains(&tag_text) && tag_text.len() > 2 {
                    return CompletionAnalysis {
                        kind: CompletionKind::Unknown,
                        prefix: String::new(),
                    };
                }
                return CompletionAnalysis {
                    kind: CompletionKind::TagName,
                    prefix: tag_name_prefix(line, position.character),
                };
            }
        }
    }

    // Fallback: attribute-name completion inside any attribute context.
    if let Some((tag, _)) = innermost_tag_containing(&matches, content, offset, tree) {
        if let Some(ranges) = matches.iter().find_map(|m| m.get("attribute.context")) {
            for range in ranges {
                if offset >= range.start_byte && offset <= range.end_byte {
                    return CompletionAnalysis {
                        kind: CompletionKind::AttributeName { tag },
                        prefix: attribute_name_prefix(line, position.character),
                    };
                }
            }
        }
    }

    CompletionAnalysis {
        kind: CompletionKind::Unknown,
        prefix: String::new(),
    }
}

fn tag_name_immediately_before(
    matches: &[std::collections::HashMap<String, Vec<tree_sitter::Range>>],
    content: &str,
    offset: usize,
) -> Option<(String, usize)> {
    const SLACK: usize = 2;
    for m in matches {
        if let Some(ranges) = m.get("tag.name.context") {
            for range in ranges {
                if offset >= range.end_byte && offset <= range.end_byte + SLACK {
                    let between = &content[range.end_byte..offset];
                    if between.chars().all(char::is_whitespace) && !between.contains('<') {
                        return Some((content[range.start_byte..range.end_byte].to_string(), range.end_byte));
                    }
                }
            }
        }
    }
    None
}

fn attribute_value_context(
    matches: &[std::collections::HashMap<String, Vec<tree_sitter::Range>>],
    content: &str,
    offset: usize,
    tree: &tree_sitter::Tree,
) -> Option<(String, String)> {
    let ranges = matches.iter().find_map(|m| m.get("attr.value.completion"))?;
    for range in ranges {
        if offset >= range.start_byte && offset <= range.end_byte {
            let node = tree
                .root_node()
                .descendant_for_byte_range(range.start_byte, range.end_byte)?;
            let attr_node = ancestor_of_kind(node, "attribute")?;
            let attr_name = attr_node
                .children(&mut attr_node.walk())
                .find(|n| n.kind() == "attribute_name")
                .map(|n| content[n.start_byte()..n.end_byte()].to_string())?;
            let element = ancestor_of_kind(attr_node, "element")?;
            let tag_node = element
                .children(&mut element.walk())
                .find(|n| n.kind() == "start_tag")
                .and_then(|start| {
                    start
                        .children(&mut start.walk())
                        .find(|n| n.kind() == "tag_name")
                })?;
            let tag = content[tag_node.start_byte()..tag_node.end_byte()].to_string();
            return Some((tag, attr_name));
        }
    }
    None
}

fn innermost_tag_containing(
    _matches: &[std::collections::HashMap<String, Vec<tree_sitter::Range>>],
    content: &str,
    offset: usize,
    tree: &tree_sitter::Tree,
) -> Option<(String, tree_sitter::Range)> {
    let node = tree.root_node().descendant_for_byte_range(offset, offset)?;
    let element = ancestor_of_kind(node, "element")?;
    let tag_node = element
        .children(&mut element.walk())
        .find(|n| n.kind() == "start_tag")
        .and_then(|start| start.children(&mut start.walk()).find(|n| n.kind() == "tag_name"))?;
    Some((
        content[tag_node.start_byte()..tag_node.end_byte()].to_string(),
        element.range(),
    ))
}

fn ancestor_of_kind<'a>(node: tree_sitter::Node<'a>, kind: &str) -> Option<tree_sitter::Node<'a>> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.kind() == kind {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

fn tag_name_prefix(line: &str, character: u32) -> String {
    let byte_col = crate::position::utf16_to_byte_col(line, character);
    let before = &line[..byte_col.min(line.len())];
    let start = before.rfind('<').map_or(0, |i| i + 1);
    before[start..].to_string()
}

fn attribute_name_prefix(line: &str, character: u32) -> String {
    let byte_col = crate::position::utf16_to_byte_col(line, character);
    let before = &line[..byte_col.min(line.len())];
    let token = before.rsplit(char::is_whitespace).next().unwrap_or("");
    if token.contains('=') { String::new() } else { token.to_string() }
}

fn attribute_value_prefix(line: &str, character: u32) -> String {
    let byte_col = crate::position::utf16_to_byte_col(line, character);
    let before = &line[..byte_col.min(line.len())];
    let Some(eq_idx) = before.rfind('=') else {
        return String::new();
    };
    let after_eq = &before[eq_idx + 1..];
    let quote_start = after_eq.find(['"', '\'']).map_or(0, |i| i + 1);
    after_eq[quote_start..].to_string()
}
