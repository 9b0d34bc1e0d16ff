//! The shared aggregate of server-wide state: document store, registries,
//! module graph, query cache, and parser pool.

use crate::document::DocumentStore;
use crate::ephemeral::EphemeralRegistry;
use crate::module_graph::ModuleGraph;
use crate::parser_pool::ParserPool;
use crate::query::QueryCache;
use crate::registry::Registry;
use crate::synth::{ManifestSynthesizer, NullSynthesizer};
use crate::watcher::WatcherHandle;
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_lsp_server::lsp_types::Uri;

/// Everything the LSP handlers need, constructed once at startup and shared
/// via `Arc`. Individual fields carry their own internal synchronization;
/// there is no outer lock on the struct itself.
pub struct ServerState {
    pub documents: DocumentStore,
    pub registry: Registry,
    pub ephemeral: EphemeralRegistry,
    pub module_graph: ModuleGraph,
    pub queries: QueryCache,
    pub parsers: Arc<ParserPool>,
    pub synthesizer: Box<dyn ManifestSynthesizer>,
    pub workspace_root: std::sync::RwLock<Option<PathBuf>>,
    watchers: std::sync::Mutex<Vec<WatcherHandle>>,
    background_tasks: DashMap<Uri, JoinHandle<()>>,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("documents", &self.documents)
            .field("registry", &self.registry)
            .field("ephemeral", &self.ephemeral)
            .field("module_graph", &self.module_graph)
            .finish()
    }
}

impl ServerState {
    /// Builds a fresh server state with the default [`NullSynthesizer`].
    pub fn new() -> crate::error::Result<Self> {
        Self::with_synthesizer(Box::new(NullSynthesizer))
    }

    /// Builds a fresh server state with a caller-supplied manifest
    /// synthesizer (the test harness and production `main.rs` both use
    /// this; production wires in the real generation pipeline).
    pub fn with_synthesizer(synthesizer: Box<dyn ManifestSynthesizer>) -> crate::error::Result<Self> {
        let parsers = Arc::new(ParserPool::new());
        Ok(Self {
            documents: DocumentStore::new(parsers.clone()),
            registry: Registry::new(),
            ephemeral: EphemeralRegistry::new(),
            module_graph: ModuleGraph::new(),
            queries: QueryCache::new()?,
            parsers,
            synthesizer,
            workspace_root: std::sync::RwLock::new(None),
            watchers: std::sync::Mutex::new(Vec::new()),
            background_tasks: DashMap::new(),
        })
    }

    /// Registers a watcher handle so it is stopped when the server shuts
    /// down.
    pub fn track_watcher(&self, handle: WatcherHandle) {
        self.watchers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(handle);
    }

    /// Spawns `task` as the background job for `uri`, aborting any prior
    /// job for the same URI first so a newer notification always wins.
    pub fn spawn_background_task<F>(&self, uri: Uri, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.cancel_background_task(&uri);
        let handle = tokio::spawn(task);
        self.background_tasks.insert(uri, handle);
    }

    /// Aborts the background job for `uri`, if any.
    pub fn cancel_background_task(&self, uri: &Uri) {
        if let Some((_, handle)) = self.background_tasks.remove(uri) {
            handle.abort();
        }
    }

    /// Stops every tracked watcher. Called on `shutdown`.
    pub async fn stop_watchers(&self) {
        let handles: Vec<WatcherHandle> = std::mem::take(
            &mut *self
                .watchers
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        for mut handle in handles {
            handle.stop().await;
        }
    }
}
