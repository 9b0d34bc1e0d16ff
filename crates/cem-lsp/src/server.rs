//! The `tower-lsp-server` backend: wires incoming LSP requests to the
//! synchronous `handlers::*` functions and owns the async lifecycle around
//! them (manifest loading, file watching, per-document diagnostics
//! publishing).

use crate::config::{CemConfig, ManifestConfig};
use crate::handlers::{code_actions, completion, definition, diagnostics, hover, references, workspace_symbol};
use cem_core::manifest::{Declaration, Package};
use cem_core::query::Grammar;
use cem_core::{ServerState, SynthesisContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp_server::jsonrpc::Result as RpcResult;
use tower_lsp_server::lsp_types::{
    CodeActionOptions, CodeActionParams, CodeActionProviderCapability, CompletionOptions, CompletionParams,
    CompletionResponse, DiagnosticOptions, DiagnosticServerCapabilities, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DocumentDiagnosticParams, DocumentDiagnosticReport,
    DocumentDiagnosticReportResult, FullDocumentDiagnosticReport, GotoDefinitionParams, GotoDefinitionResponse,
    Hover, HoverParams, HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams, Location,
    MessageType, OneOf, ReferenceParams, RelatedFullDocumentDiagnosticReport, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, Uri, WorkspaceSymbolParams, WorkspaceSymbolResponse,
};
use tower_lsp_server::{Client, LanguageServer};

/// The `cem-lsp` backend.
pub struct Backend {
    client: Client,
    state: Arc<ServerState>,
    config: Arc<RwLock<CemConfig>>,
}

impl Backend {
    /// Builds a backend around a fresh [`ServerState`] (no manifests loaded
    /// yet; `initialized` kicks off discovery).
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(ServerState::new().expect("query compilation is a programmer error, never a runtime one")),
            config: Arc::new(RwLock::new(CemConfig::default())),
        }
    }

    fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(
                    ["<", " ", "\"", "=", ".", "@", "?"].into_iter().map(String::from).collect(),
                ),
                resolve_provider: Some(false),
                ..Default::default()
            }),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            definition_provider: Some(OneOf::Left(true)),
            references_provider: Some(OneOf::Left(true)),
            workspace_symbol_provider: Some(workspace_symbol::resolve_provider()),
            code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
                code_action_kinds: Some(vec![tower_lsp_server::lsp_types::CodeActionKind::QUICKFIX]),
                ..Default::default()
            })),
            diagnostic_provider: Some(DiagnosticServerCapabilities::Options(DiagnosticOptions {
                identifier: Some("cem".into()),
                inter_file_dependencies: true,
                workspace_diagnostics: false,
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    /// Records import edges (HTML script tags) and seeds the ephemeral
    /// registry (TypeScript documents, via the synthesizer's cheap in-memory
    /// path) for the document at `uri`.
    async fn ingest_document(&self, uri: &Uri) {
        let Some(document) = self.state.documents.get(uri) else {
            return;
        };
        let module_path = diagnostics::module_path_for_uri(&self.state, uri);

        match document.grammar {
            Grammar::Html => {
                for script in &document.script_tags {
                    for import in &script.imports {
                        self.state.module_graph.add_import(&module_path, &import.specifier);
                    }
                }
            }
            Grammar::TypeScript => {
                let root = self
                    .state
                    .workspace_root
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .clone();
                if let Some(root) = root {
                    let session = self.state.synthesizer.new_session(&root);
                    if let Some(pkg) = session.in_memory_manifest() {
                        self.state.ephemeral.update(uri.clone(), pkg);
                    }
                }
            }
        }
    }

    /// Publishes diagnostics for `uri` on a cancellable background task, so
    /// a fast follow-up edit supersedes rather than queues behind a slower
    /// in-flight computation.
    async fn publish_diagnostics_for(&self, uri: Uri) {
        let state = Arc::clone(&self.state);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        self.state.spawn_background_task(uri.clone(), async move {
            let diag_config = config.read().await.diagnostics.clone();
            let diags = diagnostics::handle_diagnostics(&state, &uri, &diag_config);
            client.publish_diagnostics(uri, diags, None).await;
        });
    }
}

impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> RpcResult<InitializeResult> {
        tracing::info!("initializing cem-lsp server");

        let config = crate::config::parse_initialization_options(params.initialization_options);
        *self.config.write().await = config;

        if let Some(root) = workspace_root_from_params(&params) {
            *self
                .state
                .workspace_root
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(root);
        }

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "cem-lsp".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("cem-lsp server initialized");
        self.client.log_message(MessageType::INFO, "cem-lsp ready").await;

        let root = self
            .state
            .workspace_root
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let Some(root) = root else {
            tracing::debug!("no workspace root given at initialize, skipping manifest discovery");
            return;
        };

        let manifest_config = self.config.read().await.manifest.clone();
        let state = Arc::clone(&self.state);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);

        tokio::spawn(async move {
            load_workspace_manifests(&state, &root, &manifest_config).await;
            client
                .log_message(
                    MessageType::INFO,
                    format!("cem-lsp loaded {} custom element(s)", state.registry.len()),
                )
                .await;
            start_watchers(&state, &client, &config, &root).await;
        });
    }

    async fn shutdown(&self) -> RpcResult<()> {
        tracing::info!("shutting down cem-lsp server");
        self.state.stop_watchers().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let content = params.text_document.text;
        tracing::info!(%uri, "document opened");

        self.state.documents.open(uri.clone(), content, params.text_document.version);
        self.ingest_document(&uri).await;
        self.publish_diagnostics_for(uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        self.state
            .documents
            .update(uri.clone(), params.content_changes, params.text_document.version);
        self.ingest_document(&uri).await;
        self.publish_diagnostics_for(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::info!(%uri, "document closed");

        self.state.documents.close(&uri);
        self.state.ephemeral.remove(&uri);
        self.state.cancel_background_task(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn hover(&self, params: HoverParams) -> RpcResult<Option<Hover>> {
        Ok(hover::handle_hover(&self.state, params))
    }

    async fn completion(&self, params: CompletionParams) -> RpcResult<Option<CompletionResponse>> {
        Ok(completion::handle_completion(&self.state, params))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> RpcResult<Option<GotoDefinitionResponse>> {
        Ok(definition::handle_definition(&self.state, params))
    }

    async fn references(&self, params: ReferenceParams) -> RpcResult<Option<Vec<Location>>> {
        Ok(references::handle_references(&self.state, params))
    }

    async fn symbol(&self, params: WorkspaceSymbolParams) -> RpcResult<Option<WorkspaceSymbolResponse>> {
        Ok(Some(workspace_symbol::handle_workspace_symbol(&self.state, params)))
    }

    async fn code_action(
        &self,
        params: CodeActionParams,
    ) -> RpcResult<Option<Vec<tower_lsp_server::lsp_types::CodeActionOrCommand>>> {
        let config = self.config.read().await.diagnostics.clone();
        Ok(Some(code_actions::handle_code_actions(&self.state, &config, params)))
    }

    async fn diagnostic(&self, params: DocumentDiagnosticParams) -> RpcResult<DocumentDiagnosticReportResult> {
        let uri = params.text_document.uri;
        let config = self.config.read().await.diagnostics.clone();
        let items = diagnostics::handle_diagnostics(&self.state, &uri, &config);

        Ok(DocumentDiagnosticReportResult::Report(DocumentDiagnosticReport::Full(
            RelatedFullDocumentDiagnosticReport {
                related_documents: None,
                full_document_diagnostic_report: FullDocumentDiagnosticReport { result_id: None, items },
            },
        )))
    }
}

fn workspace_root_from_params(params: &InitializeParams) -> Option<PathBuf> {
    if let Some(folders) = &params.workspace_folders {
        if let Some(first) = folders.first() {
            if let Some(path) = first.uri.to_file_path() {
                return Some(path.to_path_buf());
            }
        }
    }
    params.root_uri.as_ref().and_then(|uri| uri.to_file_path()).map(|p| p.to_path_buf())
}

/// Seeds the module graph with every tag a manifest's own modules declare,
/// so the diagnostics pass can recognize them as locally owned even before
/// any document imports them.
fn seed_module_graph(state: &ServerState, pkg: &Package) {
    for module in &pkg.modules {
        for decl in &module.declarations {
            if let Declaration::Class(class_decl) = decl {
                if let Some(tag) = class_decl.effective_tag_name() {
                    state.module_graph.add_local_tag(&module.path, tag);
                }
            }
        }
    }
}

fn synthesize_manifest(state: &ServerState, root: &Path) -> Option<Package> {
    let session = state.synthesizer.new_session(root);
    if let Some(pkg) = session.in_memory_manifest() {
        return Some(pkg);
    }
    let ctx = SynthesisContext {
        workspace_root: root.to_path_buf(),
    };
    session.generate_full(&ctx).ok()
}

/// Performs the initial workspace discovery pass: loads every manifest
/// reachable from `root` (root manifest, workspace packages, `node_modules`
/// dependencies), falling back to the configured synthesizer when none is
/// found on disk.
async fn load_workspace_manifests(state: &ServerState, root: &Path, config: &ManifestConfig) {
    let load_root = root.to_path_buf();
    let declared_path = config.declared_path.clone();
    let loaded = tokio::task::spawn_blocking(move || cem_core::manifest_loader::load_workspace(&load_root, &declared_path)).await;

    let mut manifests = match loaded {
        Ok(Ok(workspace)) => workspace.manifests,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to load workspace manifests");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "manifest load task panicked");
            Vec::new()
        }
    };

    if !config.include_node_modules {
        manifests.retain(|(_, discovered)| !discovered.path.components().any(|c| c.as_os_str() == "node_modules"));
    }

    if manifests.is_empty() {
        if let Some(pkg) = synthesize_manifest(state, root) {
            state.registry.add_manifest(&pkg, None, "synthesized");
            seed_module_graph(state, &pkg);
        }
        return;
    }

    for (pkg, discovered) in &manifests {
        let manifest_path = discovered.path.to_string_lossy().to_string();
        state.registry.add_manifest(pkg, discovered.package_name.as_deref(), &manifest_path);
        seed_module_graph(state, pkg);
    }
}

/// Re-reads every manifest currently on record from disk and republishes
/// diagnostics for every open document, since a manifest change can turn a
/// previously-unknown tag into a known one (or vice versa).
async fn reload_manifests_and_republish(state: &Arc<ServerState>, client: &Client, config: &Arc<RwLock<CemConfig>>) {
    let entries = state.registry.manifest_entries();
    let known: std::collections::HashMap<String, Option<String>> = entries.iter().cloned().collect();
    let paths: Vec<String> = entries.into_iter().map(|(path, _)| path).collect();

    let reloaded = tokio::task::spawn_blocking(move || cem_core::manifest_loader::reload_manifests(&paths, &known))
        .await
        .unwrap_or_default();

    state.registry.clear();
    state.module_graph.clear();
    for (pkg, discovered) in &reloaded {
        let manifest_path = discovered.path.to_string_lossy().to_string();
        state.registry.add_manifest(pkg, discovered.package_name.as_deref(), &manifest_path);
        seed_module_graph(state, pkg);
    }
    tracing::info!(count = state.registry.len(), "reloaded manifests after file change");

    republish_diagnostics_for_open_documents(state, client, config).await;
}

/// Regenerates the manifest from source via the configured synthesizer,
/// triggered by the debounced generate watcher when no manifest exists on
/// disk to watch directly.
async fn regenerate_manifest(state: &Arc<ServerState>, client: &Client, config: &Arc<RwLock<CemConfig>>, root: &Path) {
    let session = state.synthesizer.new_session(root);
    let ctx = SynthesisContext {
        workspace_root: root.to_path_buf(),
    };
    let result = tokio::task::spawn_blocking(move || session.generate_full(&ctx)).await;

    match result {
        Ok(Ok(pkg)) => {
            state.registry.clear();
            state.module_graph.clear();
            state.registry.add_manifest(&pkg, None, "synthesized");
            seed_module_graph(state, &pkg);
            tracing::info!(count = state.registry.len(), "regenerated manifest from source");
            republish_diagnostics_for_open_documents(state, client, config).await;
        }
        Ok(Err(e)) => tracing::warn!(error = %e, "manifest regeneration failed"),
        Err(e) => tracing::warn!(error = %e, "manifest regeneration task panicked"),
    }
}

async fn republish_diagnostics_for_open_documents(state: &Arc<ServerState>, client: &Client, config: &Arc<RwLock<CemConfig>>) {
    let diag_config = config.read().await.diagnostics.clone();
    for uri in state.documents.open_uris() {
        let diags = diagnostics::handle_diagnostics(state, &uri, &diag_config);
        client.publish_diagnostics(uri, diags, None).await;
    }
}

/// Starts the manifest file watcher when at least one manifest was loaded
/// from disk, or the generate watcher (driving synthesis) when none was.
async fn start_watchers(state: &Arc<ServerState>, client: &Client, config: &Arc<RwLock<CemConfig>>, root: &Path) {
    let manifest_paths: Vec<PathBuf> = state.registry.manifest_paths().into_iter().map(PathBuf::from).collect();

    if manifest_paths.is_empty() {
        let regen_state = Arc::clone(state);
        let regen_client = client.clone();
        let regen_config = Arc::clone(config);
        let regen_root = root.to_path_buf();
        let watcher_config = config.read().await.watcher.clone();

        let result = cem_core::watcher::start_generate_watcher(
            root,
            &watcher_config.generate_globs,
            Arc::new(move || {
                let state = Arc::clone(&regen_state);
                let client = regen_client.clone();
                let config = Arc::clone(&regen_config);
                let root = regen_root.clone();
                tokio::spawn(async move { regenerate_manifest(&state, &client, &config, &root).await });
            }),
        );
        match result {
            Ok(handle) => state.track_watcher(handle),
            Err(e) => tracing::warn!(error = %e, "failed to start generate watcher"),
        }
        return;
    }

    let watch_state = Arc::clone(state);
    let watch_client = client.clone();
    let watch_config = Arc::clone(config);
    let result = cem_core::watcher::start_file_watcher(manifest_paths, move || {
        let state = Arc::clone(&watch_state);
        let client = watch_client.clone();
        let config = Arc::clone(&watch_config);
        tokio::spawn(async move { reload_manifests_and_republish(&state, &client, &config).await });
    });
    match result {
        Ok(handle) => state.track_watcher(handle),
        Err(e) => tracing::warn!(error = %e, "failed to start manifest file watcher"),
    }
}
