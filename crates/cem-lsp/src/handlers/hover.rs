//! Hover handler implementation.
//!
//! Shows an element's description, attributes, slots, and events when the
//! cursor sits on a custom-element tag name, or an attribute's type and
//! default when the cursor sits on an attribute name.

use cem_core::manifest::{Attribute, CustomElement};
use cem_core::ServerState;
use tower_lsp_server::lsp_types::{Hover, HoverContents, HoverParams, MarkupContent, MarkupKind};

/// Handles hover requests.
///
/// Returns `None` when the document isn't open, nothing custom-element-ish
/// sits under the cursor, or the tag is known to neither registry.
#[must_use]
pub fn handle_hover(state: &ServerState, params: HoverParams) -> Option<Hover> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;
    let document = state.documents.get(&uri)?;

    if let Some((element_match, attr_match)) = document.find_attribute_at(&state.queries, position) {
        let element = lookup_element(state, &element_match.tag_name)?;
        let attribute = element.attribute(&attr_match.name)?;
        return Some(markdown_hover(hover_for_attribute(&element, attribute)));
    }

    let element_match = document.find_element_at(&state.queries, position)?;
    let element = lookup_element(state, &element_match.tag_name)?;
    Some(markdown_hover(hover_for_element(&element)))
}

fn lookup_element(state: &ServerState, tag: &str) -> Option<CustomElement> {
    state.registry.element(tag).or_else(|| state.ephemeral.find(tag))
}

fn markdown_hover(value: String) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: None,
    }
}

fn hover_for_element(element: &CustomElement) -> String {
    let mut out = format!("### `<{}>`\n`{}`\n\n", element.tag_name, element.class_name);

    if let Some(description) = &element.description {
        out.push_str(description);
        out.push_str("\n\n");
    } else if let Some(summary) = &element.summary {
        out.push_str(summary);
        out.push_str("\n\n");
    }

    if !element.attributes.is_empty() {
        out.push_str("**Attributes**\n\n");
        for attr in &element.attributes {
            let ty = attr.attr_type.as_ref().map_or("any", |t| t.text.as_str());
            out.push_str(&format!("- `{}`: `{ty}`\n", attr.name));
        }
        out.push('\n');
    }

    if !element.slots.is_empty() {
        out.push_str("**Slots**\n\n");
        for slot in &element.slots {
            let name = if slot.name.is_empty() { "(default)" } else { &slot.name };
            out.push_str(&format!("- `{name}`\n"));
        }
        out.push('\n');
    }

    if !element.events.is_empty() {
        out.push_str("**Events**\n\n");
        for event in &element.events {
            out.push_str(&format!("- `{}`\n", event.name));
        }
    }

    out
}

fn hover_for_attribute(element: &CustomElement, attribute: &Attribute) -> String {
    let mut out = format!("### `{}`\nattribute of `<{}>`\n\n", attribute.name, element.tag_name);

    if let Some(attr_type) = &attribute.attr_type {
        out.push_str(&format!("Type: `{}`\n\n", attr_type.text));
    }
    if let Some(default) = &attribute.default {
        out.push_str(&format!("Default: `{default}`\n\n"));
    }
    if let Some(description) = &attribute.description {
        out.push_str(description);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cem_core::manifest::{AttributeType, CustomElementDeclaration, Declaration, Module, Package, Slot};
    use std::str::FromStr;
    use tower_lsp_server::lsp_types::{
        Position, TextDocumentIdentifier, TextDocumentPositionParams, Uri, WorkDoneProgressParams,
    };

    fn uri(s: &str) -> Uri {
        Uri::from_str(s).unwrap()
    }

    fn state_with_button() -> ServerState {
        let state = ServerState::new().unwrap();
        let pkg = Package {
            schema_version: "2.0.0".into(),
            modules: vec![Module {
                kind: "javascript-module".into(),
                path: "my-button.js".into(),
                declarations: vec![Declaration::Class(CustomElementDeclaration {
                    name: "MyButton".into(),
                    tag_name: Some("my-button".into()),
                    description: Some("A clickable button.".into()),
                    summary: None,
                    attributes: vec![Attribute {
                        name: "variant".into(),
                        description: Some("Visual style.".into()),
                        attr_type: Some(AttributeType {
                            text: "\"primary\" | \"secondary\"".into(),
                        }),
                        default: Some("\"primary\"".into()),
                        field_name: None,
                    }],
                    slots: vec![Slot {
                        name: "icon".into(),
                        description: None,
                    }],
                    events: vec![],
                    source: None,
                    custom_element: true,
                })],
                exports: vec![],
            }],
            readme: None,
        };
        state.registry.add_manifest(&pkg, Some("my-components"), "manifest.json");
        state
    }

    fn hover_params(uri: Uri, position: Position) -> HoverParams {
        HoverParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
        }
    }

    #[test]
    fn hover_on_tag_name_returns_description() {
        let state = state_with_button();
        state.documents.open(uri("file:///t.html"), "<my-button></my-button>".into(), 1);
        let hover = handle_hover(
            &state,
            hover_params(uri("file:///t.html"), Position { line: 0, character: 3 }),
        )
        .unwrap();
        let HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup contents");
        };
        assert!(markup.value.contains("A clickable button."));
        assert!(markup.value.contains("icon"));
    }

    #[test]
    fn hover_on_unknown_tag_returns_none() {
        let state = ServerState::new().unwrap();
        state.documents.open(uri("file:///t.html"), "<my-mystery></my-mystery>".into(), 1);
        let hover = handle_hover(
            &state,
            hover_params(uri("file:///t.html"), Position { line: 0, character: 3 }),
        );
        assert!(hover.is_none());
    }

    #[test]
    fn hover_on_attribute_name_returns_type_info() {
        let state = state_with_button();
        state
            .documents
            .open(uri("file:///t.html"), "<my-button variant=\"primary\"></my-button>".into(), 1);
        let hover = handle_hover(
            &state,
            hover_params(uri("file:///t.html"), Position { line: 0, character: 13 }),
        )
        .unwrap();
        let HoverContents::Markup(markup) = hover.contents else {
            panic!("expected markup contents");
        };
        assert!(markup.value.contains("\"primary\" | \"secondary\""));
    }
}
