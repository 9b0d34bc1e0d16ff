//! Completion handler implementation.
//!
//! Classifies the cursor with [`cem_core::completion::analyze`] and builds
//! candidates from the Registry (manifest-backed elements) and the
//! Ephemeral Registry (elements synthesized from the currently open
//! document).

use cem_core::completion::CompletionKind;
use cem_core::manifest::CustomElement;
use cem_core::ServerState;
use tower_lsp_server::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionParams, CompletionResponse, Documentation,
};

/// Handles completion requests.
///
/// Returns `None` when the document isn't open or the cursor isn't
/// positioned to complete anything CEM-related.
#[must_use]
pub fn handle_completion(state: &ServerState, params: CompletionParams) -> Option<CompletionResponse> {
    let uri = params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;
    let document = state.documents.get(&uri)?;

    let analysis = cem_core::completion::analyze(&state.queries, &document, position);
    let items = match &analysis.kind {
        CompletionKind::TagName => tag_name_items(state, &analysis.prefix),
        CompletionKind::AttributeName { tag } => attribute_name_items(state, tag, &analysis.prefix),
        CompletionKind::AttributeValue { tag, attribute } => {
            attribute_value_items(state, tag, attribute, &analysis.prefix)
        }
        CompletionKind::LitEventBinding { tag } => event_items(state, tag, &analysis.prefix),
        CompletionKind::LitPropertyBinding { tag } => property_items(state, tag, &analysis.prefix),
        CompletionKind::LitBooleanAttribute { tag } => boolean_attribute_items(state, tag, &analysis.prefix),
        CompletionKind::Unknown => Vec::new(),
    };

    if items.is_empty() {
        None
    } else {
        Some(CompletionResponse::Array(items))
    }
}

fn lookup_element(state: &ServerState, tag: &str) -> Option<CustomElement> {
    state.registry.element(tag).or_else(|| state.ephemeral.find(tag))
}

fn matches_prefix(candidate: &str, prefix: &str) -> bool {
    prefix.is_empty() || candidate.to_ascii_lowercase().starts_with(&prefix.to_ascii_lowercase())
}

fn tag_name_items(state: &ServerState, prefix: &str) -> Vec<CompletionItem> {
    state
        .registry
        .all_tag_names()
        .into_iter()
        .filter(|tag| matches_prefix(tag, prefix))
        .map(|tag| {
            let description = state.registry.element(&tag).and_then(|e| e.summary.or(e.description));
            CompletionItem {
                label: tag.clone(),
                kind: Some(CompletionItemKind::CLASS),
                detail: description,
                ..Default::default()
            }
        })
        .collect()
}

fn attribute_name_items(state: &ServerState, tag: &str, prefix: &str) -> Vec<CompletionItem> {
    let Some(element) = lookup_element(state, tag) else {
        return Vec::new();
    };
    element
        .attributes
        .iter()
        .filter(|attr| matches_prefix(&attr.name, prefix))
        .map(|attr| CompletionItem {
            label: attr.name.clone(),
            kind: Some(CompletionItemKind::PROPERTY),
            detail: attr.attr_type.as_ref().map(|t| t.text.clone()),
            documentation: attr.description.clone().map(Documentation::String),
            ..Default::default()
        })
        .collect()
}

fn attribute_value_items(state: &ServerState, tag: &str, attribute: &str, prefix: &str) -> Vec<CompletionItem> {
    let Some(element) = lookup_element(state, tag) else {
        return Vec::new();
    };
    let Some(attr) = element.attribute(attribute) else {
        return Vec::new();
    };
    let Some(attr_type) = &attr.attr_type else {
        return Vec::new();
    };
    let Some(values) = attr_type.literal_values() else {
        return Vec::new();
    };
    values
        .into_iter()
        .filter(|v| matches_prefix(v, prefix))
        .map(|value| CompletionItem {
            label: value,
            kind: Some(CompletionItemKind::ENUM_MEMBER),
            ..Default::default()
        })
        .collect()
}

fn event_items(state: &ServerState, tag: &str, prefix: &str) -> Vec<CompletionItem> {
    let Some(element) = lookup_element(state, tag) else {
        return Vec::new();
    };
    element
        .events
        .iter()
        .filter(|event| matches_prefix(&event.name, prefix))
        .map(|event| CompletionItem {
            label: event.name.clone(),
            kind: Some(CompletionItemKind::EVENT),
            documentation: event.description.clone().map(Documentation::String),
            ..Default::default()
        })
        .collect()
}

fn property_items(state: &ServerState, tag: &str, prefix: &str) -> Vec<CompletionItem> {
    let Some(element) = lookup_element(state, tag) else {
        return Vec::new();
    };
    element
        .attributes
        .iter()
        .filter(|attr| matches_prefix(&attr.name, prefix))
        .map(|attr| {
            let label = attr.field_name.clone().unwrap_or_else(|| attr.name.clone());
            CompletionItem {
                label,
                kind: Some(CompletionItemKind::FIELD),
                detail: attr.attr_type.as_ref().map(|t| t.text.clone()),
                ..Default::default()
            }
        })
        .collect()
}

fn boolean_attribute_items(state: &ServerState, tag: &str, prefix: &str) -> Vec<CompletionItem> {
    let Some(element) = lookup_element(state, tag) else {
        return Vec::new();
    };
    element
        .attributes
        .iter()
        .filter(|attr| attr.attr_type.as_ref().is_some_and(|t| t.is_boolean()))
        .filter(|attr| matches_prefix(&attr.name, prefix))
        .map(|attr| CompletionItem {
            label: attr.name.clone(),
            kind: Some(CompletionItemKind::PROPERTY),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cem_core::manifest::{
        Attribute, AttributeType, CustomElementDeclaration, Declaration, EventDef, Module, Package,
    };
    use std::str::FromStr;
    use tower_lsp_server::lsp_types::{
        Position, TextDocumentIdentifier, TextDocumentPositionParams, Uri,
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
                    description: None,
                    summary: Some("A button.".into()),
                    attributes: vec![Attribute {
                        name: "variant".into(),
                        description: None,
                        attr_type: Some(AttributeType {
                            text: "\"primary\" | \"secondary\"".into(),
                        }),
                        default: None,
                        field_name: None,
                    }],
                    slots: vec![],
                    events: vec![EventDef {
                        name: "my-click".into(),
                        description: None,
                    }],
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

    fn completion_params(uri: Uri, position: Position) -> CompletionParams {
        CompletionParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: None,
        }
    }

    #[test]
    fn returns_none_for_missing_document() {
        let state = ServerState::new().unwrap();
        let result = handle_completion(
            &state,
            completion_params(uri("file:///missing.html"), Position { line: 0, character: 0 }),
        );
        assert!(result.is_none());
    }

    #[test]
    fn tag_name_completion_includes_registered_element() {
        let state = state_with_button();
        state.documents.open(uri("file:///t.html"), "<my-but".into(), 1);
        let result = handle_completion(
            &state,
            completion_params(uri("file:///t.html"), Position { line: 0, character: 7 }),
        )
        .unwrap();
        let CompletionResponse::Array(items) = result else {
            panic!("expected array response");
        };
        assert!(items.iter().any(|i| i.label == "my-button"));
    }

    #[test]
    fn attribute_value_completion_lists_literal_union() {
        let state = state_with_button();
        state
            .documents
            .open(uri("file:///t.html"), "<my-button variant=\"\"></my-button>".into(), 1);
        let result = handle_completion(
            &state,
            completion_params(uri("file:///t.html"), Position { line: 0, character: 20 }),
        )
        .unwrap();
        let CompletionResponse::Array(items) = result else {
            panic!("expected array response");
        };
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"primary"));
        assert!(labels.contains(&"secondary"));
    }
}
