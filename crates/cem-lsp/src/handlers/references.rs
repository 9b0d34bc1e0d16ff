//! `textDocument/references` — finds every usage of the custom element
//! under the cursor across currently open documents.
//!
//! There is no persistent workspace-wide index of tag usage; scanning open
//! documents (rather than walking the filesystem) keeps this handler free
//! of synchronous disk I/O, matching the other feature handlers.

use cem_core::ServerState;
use tower_lsp_server::lsp_types::{Location, ReferenceParams};

/// Finds every usage of the tag under the cursor across open documents.
///
/// Returns `None` when the document isn't open or the cursor isn't on a
/// custom-element tag name.
#[must_use]
pub fn handle_references(state: &ServerState, params: ReferenceParams) -> Option<Vec<Location>> {
    let uri = params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;
    let document = state.documents.get(&uri)?;
    let element_match = document.find_element_at(&state.queries, position)?;
    let tag = element_match.tag_name;

    let include_declaration = params.context.include_declaration;

    let mut locations = Vec::new();
    for open_uri in state.documents.open_uris() {
        let Some(open_document) = state.documents.get(&open_uri) else {
            continue;
        };
        for candidate in open_document.custom_elements(&state.queries) {
            if candidate.tag_name != tag {
                continue;
            }
            if !include_declaration && open_uri == uri && candidate.tag_name_range == element_match.tag_name_range {
                continue;
            }
            locations.push(Location {
                uri: open_uri.clone(),
                range: candidate.tag_name_range,
            });
        }
    }

    if locations.is_empty() {
        None
    } else {
        Some(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tower_lsp_server::lsp_types::{
        Position, ReferenceContext, TextDocumentIdentifier, TextDocumentPositionParams, Uri,
        WorkDoneProgressParams,
    };

    fn uri(s: &str) -> Uri {
        Uri::from_str(s).unwrap()
    }

    fn reference_params(uri: Uri, position: Position, include_declaration: bool) -> ReferenceParams {
        ReferenceParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: Default::default(),
            context: ReferenceContext { include_declaration },
        }
    }

    #[test]
    fn finds_usages_across_two_open_documents() {
        let state = ServerState::new().unwrap();
        state
            .documents
            .open(uri("file:///a.html"), "<my-button></my-button>".into(), 1);
        state
            .documents
            .open(uri("file:///b.html"), "<my-button></my-button>".into(), 1);

        let locations = handle_references(
            &state,
            reference_params(uri("file:///a.html"), Position { line: 0, character: 3 }, true),
        )
        .unwrap();
        assert_eq!(locations.len(), 2);
    }

    #[test]
    fn excludes_declaration_when_not_requested() {
        let state = ServerState::new().unwrap();
        state
            .documents
            .open(uri("file:///a.html"), "<my-button></my-button>".into(), 1);

        let locations = handle_references(
            &state,
            reference_params(uri("file:///a.html"), Position { line: 0, character: 3 }, false),
        );
        assert!(locations.is_none());
    }
}
