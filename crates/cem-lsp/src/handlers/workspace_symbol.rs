//! `workspace/symbol` — a searchable index of every custom element known to
//! the registry, filtered by the client's query string.

use cem_core::ServerState;
use std::str::FromStr;
use tower_lsp_server::lsp_types::{
    Location, OneOf, Position, Range, SymbolInformation, SymbolKind, Uri, WorkspaceSymbolParams,
    WorkspaceSymbolResponse,
};

/// Handles a `workspace/symbol` request.
///
/// An empty query returns every registered element; otherwise only tags
/// containing the query (case-insensitive) are returned.
#[must_use]
pub fn handle_workspace_symbol(state: &ServerState, params: WorkspaceSymbolParams) -> WorkspaceSymbolResponse {
    let query = params.query.to_ascii_lowercase();

    let mut symbols: Vec<SymbolInformation> = state
        .registry
        .all_tag_names()
        .into_iter()
        .filter(|tag| query.is_empty() || tag.to_ascii_lowercase().contains(&query))
        .filter_map(|tag| symbol_for_tag(state, &tag))
        .collect();

    symbols.sort_by(|a, b| a.name.cmp(&b.name));
    WorkspaceSymbolResponse::Flat(symbols)
}

fn symbol_for_tag(state: &ServerState, tag: &str) -> Option<SymbolInformation> {
    let definition = state.registry.element_definition(tag)?;
    let uri = location_uri(state, &definition.module_path);

    #[allow(deprecated)]
    Some(SymbolInformation {
        name: tag.to_string(),
        kind: SymbolKind::CLASS,
        tags: None,
        deprecated: None,
        location: Location {
            uri,
            range: Range {
                start: Position { line: 0, character: 0 },
                end: Position { line: 0, character: 0 },
            },
        },
        container_name: definition.package_name,
    })
}

fn location_uri(state: &ServerState, module_path: &str) -> Uri {
    if let Some(root) = state
        .workspace_root
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .as_ref()
    {
        let full_path = root.join(module_path);
        if let Ok(uri) = Uri::from_str(&format!("file://{}", full_path.display())) {
            return uri;
        }
    }
    Uri::from_str(&format!("file:///{module_path}")).unwrap_or_else(|_| Uri::from_str("file:///").unwrap())
}

/// Whether a capability advertisement should resolve symbol locations lazily.
/// `cem-lsp` always returns fully resolved locations, so `workspaceSymbolProvider`
/// is registered as a plain boolean rather than an options object.
#[must_use]
pub fn resolve_provider() -> OneOf<bool, ()> {
    OneOf::Left(true)
}
