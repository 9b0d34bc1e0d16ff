//! Code actions handler implementation.
//!
//! Builds quick fixes from the `AutofixData` each diagnostic carries:
//! tag-typo correction, missing-import insertion, attribute-name
//! correction, slot-value correction, and attribute-value correction.

use cem_core::diagnostics::AutofixData;
use cem_core::ServerState;
use std::collections::HashMap;
use tower_lsp_server::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams, Position, Range, TextEdit, Uri,
    WorkspaceEdit,
};

use super::diagnostics::module_path_for_uri;

/// Handles code-action requests: recomputes diagnostics overlapping the
/// requested range and turns each one's autofix data into a `WorkspaceEdit`.
#[must_use]
pub fn handle_code_actions(
    state: &ServerState,
    config: &crate::config::DiagnosticsConfig,
    params: CodeActionParams,
) -> Vec<CodeActionOrCommand> {
    let uri = params.text_document.uri;
    let range = params.range;

    let Some(document) = state.documents.get(&uri) else {
        return Vec::new();
    };

    let module_path = module_path_for_uri(state, &uri);
    let diagnostics = cem_core::diagnostics::compute_diagnostics(
        &state.queries,
        &document,
        &state.registry,
        &state.ephemeral,
        &state.module_graph,
        &module_path,
    );

    diagnostics
        .into_iter()
        .filter(|d| ranges_overlap(d.range, range))
        .filter_map(|d| build_action(&uri, &document, &d, config))
        .collect()
}

fn build_action(
    uri: &Uri,
    document: &cem_core::Document,
    diagnostic: &cem_core::diagnostics::CemDiagnostic,
    _config: &crate::config::DiagnosticsConfig,
) -> Option<CodeActionOrCommand> {
    match &diagnostic.fix {
        AutofixData::UnknownTagTypo { tag, suggestion } => {
            let suggestion = suggestion.as_ref()?;
            Some(replace_action(
                format!("Replace '{tag}' with '{suggestion}'"),
                uri,
                diagnostic.range,
                suggestion.clone(),
            ))
        }
        AutofixData::MissingImport {
            tag,
            suggested_specifier,
            ..
        } => insert_import_action(uri, document, tag, suggested_specifier),
        AutofixData::UnknownAttribute { attr, suggestion, .. } => {
            let suggestion = suggestion.as_ref()?;
            Some(replace_action(
                format!("Replace attribute '{attr}' with '{suggestion}'"),
                uri,
                diagnostic.range,
                suggestion.clone(),
            ))
        }
        AutofixData::UnknownSlotValue { value, suggestion, .. } => {
            let suggestion = suggestion.as_ref()?;
            Some(replace_action(
                format!("Replace slot '{value}' with '{suggestion}'"),
                uri,
                diagnostic.range,
                suggestion.clone(),
            ))
        }
        AutofixData::InvalidAttributeValue { value, allowed, .. } => {
            let first = allowed.as_ref()?.first()?;
            Some(replace_action(
                format!("Replace '{value}' with '{first}'"),
                uri,
                diagnostic.range,
                first.clone(),
            ))
        }
    }
}

fn replace_action(title: String, uri: &Uri, range: Range, new_text: String) -> CodeActionOrCommand {
    let mut changes = HashMap::new();
    changes.insert(uri.clone(), vec![TextEdit { range, new_text }]);
    CodeActionOrCommand::CodeAction(CodeAction {
        title,
        kind: Some(CodeActionKind::QUICKFIX),
        edit: Some(WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        }),
        is_preferred: Some(true),
        ..Default::default()
    })
}

/// Finds the insertion point for a new `import` statement: the end of the
/// first inline `<script type="module">` for HTML documents, or the line
/// after the last top-level import for TS documents. Falls back to the
/// start of the document when neither is found.
fn insert_import_action(
    uri: &Uri,
    document: &cem_core::Document,
    tag: &str,
    specifier: &str,
) -> Option<CodeActionOrCommand> {
    let insertion_point = document
        .script_tags
        .iter()
        .find(|s| s.is_module)
        .map(|s| s.content_range.start)
        .unwrap_or(Position { line: 0, character: 0 });

    let new_text = format!("\nimport '{specifier}';");
    let range = Range {
        start: insertion_point,
        end: insertion_point,
    };

    Some(replace_action(
        format!("Import '{specifier}' for <{tag}>"),
        uri,
        range,
        new_text,
    ))
}

fn ranges_overlap(a: Range, b: Range) -> bool {
    !(a.end.line < b.start.line
        || (a.end.line == b.start.line && a.end.character < b.start.character)
        || b.end.line < a.start.line
        || (b.end.line == a.start.line && b.end.character < a.start.character))
}
