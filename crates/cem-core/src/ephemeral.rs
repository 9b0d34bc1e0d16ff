//! Per-document element definitions synthesized from currently-open source,
//! consulted only as a fallback after the main [`crate::registry::Registry`].

use crate::manifest::{CustomElement, Package};
use dashmap::DashMap;
use tower_lsp_server::lsp_types::Uri;

/// URI-scoped synthesized packages plus a flat tag index rebuilt whenever an
/// entry is added or removed.
pub struct EphemeralRegistry {
    by_uri: DashMap<Uri, Package>,
    tag_index: DashMap<String, (Uri, CustomElement)>,
}

impl std::fmt::Debug for EphemeralRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralRegistry")
            .field("documents", &self.by_uri.len())
            .field("tags", &self.tag_index.len())
            .finish()
    }
}

impl Default for EphemeralRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_uri: DashMap::new(),
            tag_index: DashMap::new(),
        }
    }

    /// Replaces the synthesized package for `uri` and rebuilds the flat tag
    /// index.
    pub fn update(&self, uri: Uri, package: Package) {
        self.by_uri.insert(uri, package);
        self.rebuild_index();
    }

    /// Removes all entries for `uri` and rebuilds the flat tag index.
    pub fn remove(&self, uri: &Uri) {
        self.by_uri.remove(uri);
        self.rebuild_index();
    }

    /// Looks up a tag in the ephemeral index only. Callers must consult the
    /// main registry first; ephemeral entries never shadow manifest ones.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<CustomElement> {
        self.tag_index.get(tag).map(|entry| entry.1.clone())
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tag_index.contains_key(tag)
    }

    fn rebuild_index(&self) {
        self.tag_index.clear();
        for entry in &self.by_uri {
            let uri = entry.key().clone();
            for module in &entry.value().modules {
                for decl in &module.declarations {
                    if let crate::manifest::Declaration::Class(class_decl) = decl {
                        if let Some(element) = CustomElement::from_declaration(class_decl, &module.path) {
                            self.tag_index
                                .insert(element.tag_name.clone(), (uri.clone(), element));
                        }
                    }
                }
            }
        }
    }
}
