//! LSP protocol handlers.
//!
//! This module contains all Language Server Protocol request handlers for
//! cem-lsp. Each handler is responsible for a specific LSP feature:
//!
//! - [`completion`]: Tag-name, attribute-name, and attribute-value completion
//! - [`hover`]: Element/attribute documentation
//! - [`diagnostics`]: Unknown elements, missing imports, invalid attributes
//! - [`code_actions`]: Quick fixes for diagnostics
//! - [`definition`]: Jump from a tag name to its manifest source
//! - [`references`]: Find other usages of a tag across open documents
//! - [`workspace_symbol`]: Searchable index of registered custom elements
//!
//! # Handler Architecture
//!
//! All handlers are synchronous free functions that take a `&ServerState`
//! (or, for diagnostics/code actions, the additional `&CemConfig`) plus the
//! LSP request params, and return the LSP response type directly. They never
//! touch disk or perform network I/O; that happens in the background tasks
//! `server.rs` spawns around manifest loading and watching.

pub mod code_actions;
pub mod completion;
pub mod definition;
pub mod diagnostics;
pub mod hover;
pub mod references;
pub mod workspace_symbol;
