//! Core abstractions for the custom-elements language server.
//!
//! `cem-core` owns everything that does not speak LSP directly: the
//! document engine (incremental HTML/TS parsing with UTF-16/UTF-8 position
//! handling), the manifest registry (hot-reloadable element index), the
//! module graph (lazy import resolution), and the completion/diagnostics
//! analyzers. `cem-lsp` wires these into a `tower-lsp-server` backend.
//!
//! # Examples
//!
//! ```
//! use cem_core::registry::Registry;
//!
//! let registry = Registry::new();
//! assert!(registry.is_empty());
//! ```

pub mod completion;
pub mod diagnostics;
pub mod document;
pub mod ephemeral;
pub mod error;
pub mod incremental;
pub mod manifest;
pub mod manifest_loader;
pub mod module_graph;
pub mod parser_pool;
pub mod position;
pub mod query;
pub mod registry;
pub mod state;
pub mod synth;
pub mod watcher;

pub use completion::{analyze as analyze_completion, CompletionAnalysis, CompletionKind};
pub use diagnostics::{compute_diagnostics, AutofixData, CemDiagnostic, Severity};
pub use document::{Document, DocumentStore};
pub use ephemeral::EphemeralRegistry;
pub use error::{CemError, Result};
pub use manifest::{Attribute, CustomElement, ElementDefinition, Package};
pub use module_graph::ModuleGraph;
pub use query::{Grammar, QueryCache};
pub use registry::Registry;
pub use state::ServerState;
pub use synth::{ManifestSynthesizer, NullSynthesizer, SynthesisContext, SynthesisSession};
