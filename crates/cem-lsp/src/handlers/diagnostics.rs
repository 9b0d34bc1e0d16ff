//! Diagnostics handler implementation.
//!
//! Delegates analysis to [`cem_core::diagnostics::compute_diagnostics`] and
//! translates its ecosystem-agnostic [`CemDiagnostic`]s into LSP
//! `Diagnostic`s, applying the configured per-kind severity overrides.

use crate::config::DiagnosticsConfig;
use cem_core::diagnostics::{AutofixData, CemDiagnostic, Severity};
use cem_core::ServerState;
use std::path::Path;
use tower_lsp_server::lsp_types::{Diagnostic, DiagnosticSeverity, Uri};

/// Computes diagnostics for the document at `uri`.
///
/// Returns an empty vec when the document isn't open.
#[must_use]
pub fn handle_diagnostics(state: &ServerState, uri: &Uri, config: &DiagnosticsConfig) -> Vec<Diagnostic> {
    let Some(document) = state.documents.get(uri) else {
        tracing::warn!(%uri, "document not found for diagnostics");
        return Vec::new();
    };

    let module_path = module_path_for_uri(state, uri);
    let cem_diagnostics = cem_core::diagnostics::compute_diagnostics(
        &state.queries,
        &document,
        &state.registry,
        &state.ephemeral,
        &state.module_graph,
        &module_path,
    );

    cem_diagnostics
        .into_iter()
        .map(|d| to_lsp_diagnostic(d, config))
        .collect()
}

/// Resolves `uri`'s filesystem path relative to the workspace root, falling
/// back to the bare path when no workspace root is known yet (falls back to
/// the module graph's best-effort import matching).
pub(crate) fn module_path_for_uri(state: &ServerState, uri: &Uri) -> String {
    let path = uri.path().as_str();
    let root = state
        .workspace_root
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(root) = root.as_ref() {
        if let Ok(relative) = Path::new(path).strip_prefix(root) {
            return relative.to_string_lossy().replace('\\', "/");
        }
    }
    path.trim_start_matches('/').to_string()
}

fn to_lsp_diagnostic(diagnostic: CemDiagnostic, config: &DiagnosticsConfig) -> Diagnostic {
    let severity = severity_for(&diagnostic, config);
    Diagnostic {
        range: diagnostic.range,
        severity: Some(severity),
        message: diagnostic.message,
        source: Some("cem-lsp".into()),
        ..Default::default()
    }
}

fn severity_for(diagnostic: &CemDiagnostic, config: &DiagnosticsConfig) -> DiagnosticSeverity {
    match &diagnostic.fix {
        AutofixData::UnknownTagTypo { .. } => config.unknown_element_severity,
        AutofixData::MissingImport { .. } => config.missing_import_severity,
        AutofixData::UnknownAttribute { .. } => config.unknown_attribute_severity,
        AutofixData::UnknownSlotValue { .. } => config.unknown_slot_severity,
        AutofixData::InvalidAttributeValue { .. } => config.invalid_attribute_value_severity,
    }
}

/// Maps a [`Severity`] (unused once config overrides apply, but retained for
/// handlers that want the default mapping without config) to its LSP
/// equivalent.
#[must_use]
pub fn default_lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cem_core::manifest::{Attribute, CustomElementDeclaration, Declaration, Module, Package};
    use std::str::FromStr;

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
                    summary: None,
                    attributes: vec![Attribute {
                        name: "variant".into(),
                        description: None,
                        attr_type: None,
                        default: None,
                        field_name: None,
                    }],
                    slots: vec![],
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

    #[test]
    fn missing_document_returns_empty() {
        let state = ServerState::new().unwrap();
        let config = DiagnosticsConfig::default();
        let diags = handle_diagnostics(&state, &uri("file:///missing.html"), &config);
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_tag_becomes_warning_by_default() {
        let state = state_with_button();
        state
            .documents
            .open(uri("file:///t.html"), "<my-buttom></my-buttom>".into(), 1);
        let config = DiagnosticsConfig::default();
        let diags = handle_diagnostics(&state, &uri("file:///t.html"), &config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
    }

    #[test]
    fn unknown_attribute_honors_severity_override_when_imported() {
        let state = state_with_button();
        // Document directly owns the `my-button` tag in the module graph, so
        // it counts as already imported and only the attribute diagnostic fires.
        state.module_graph.add_local_tag("t.html", "my-button");
        state
            .documents
            .open(uri("file:///t.html"), "<my-button bogus=\"x\"></my-button>".into(), 1);
        let config = DiagnosticsConfig::default();
        let diags = handle_diagnostics(&state, &uri("file:///t.html"), &config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(config.unknown_attribute_severity));
    }
}
