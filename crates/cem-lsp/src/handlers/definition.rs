//! `textDocument/definition` — jumps from a custom-element tag name to the
//! manifest's recorded source location for that element: its `source.href`
//! when the manifest carries one, otherwise its module path resolved
//! against the workspace root.

use cem_core::ServerState;
use std::path::Path;
use std::str::FromStr;
use tower_lsp_server::lsp_types::{
    GotoDefinitionParams, GotoDefinitionResponse, Location, Position, Range, Uri,
};

/// Resolves go-to-definition for the tag under the cursor.
///
/// Returns `None` when the document isn't open, the cursor isn't on a known
/// custom element, or the element's definition carries no resolvable
/// location.
#[must_use]
pub fn handle_definition(state: &ServerState, params: GotoDefinitionParams) -> Option<GotoDefinitionResponse> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;
    let document = state.documents.get(&uri)?;

    let element_match = document.find_element_at(&state.queries, position)?;
    let definition = state.registry.element_definition(&element_match.tag_name)?;

    let target_uri = resolve_target_uri(state, &definition)?;
    Some(GotoDefinitionResponse::Scalar(Location {
        uri: target_uri,
        range: zero_range(),
    }))
}

fn resolve_target_uri(state: &ServerState, definition: &cem_core::manifest::ElementDefinition) -> Option<Uri> {
    if let Some(href) = &definition.source_href {
        if let Ok(uri) = Uri::from_str(href) {
            return Some(uri);
        }
        return file_uri_relative_to_root(state, href);
    }
    file_uri_relative_to_root(state, &definition.module_path)
}

fn file_uri_relative_to_root(state: &ServerState, relative_path: &str) -> Option<Uri> {
    let root = state
        .workspace_root
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let root = root.as_ref()?;
    let full_path = root.join(Path::new(relative_path));
    Uri::from_str(&format!("file://{}", full_path.display())).ok()
}

fn zero_range() -> Range {
    Range {
        start: Position { line: 0, character: 0 },
        end: Position { line: 0, character: 0 },
    }
}
