//! Concurrently-accessed index of custom elements loaded from manifests.

use crate::manifest::{Attribute, CustomElement, Declaration, ElementDefinition, Package, Slot};
use dashmap::DashMap;
use std::sync::RwLock;
use tracing::warn;

/// Indexed store of elements/attributes/slots/definitions, fed by
/// [`crate::manifest_loader`] and kept current by the file watcher.
pub struct Registry {
    elements: DashMap<String, CustomElement>,
    definitions: DashMap<String, ElementDefinition>,
    manifest_packages: RwLock<Vec<(String, Option<String>)>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("element_count", &self.elements.len())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: DashMap::new(),
            definitions: DashMap::new(),
            manifest_packages: RwLock::new(Vec::new()),
        }
    }

    /// Indexes every custom-element declaration in `pkg`. Tags that already
    /// exist are overwritten; a later manifest always wins over an earlier
    /// one, and the overwrite is logged.
    pub fn add_manifest(&self, pkg: &Package, package_name: Option<&str>, manifest_path: &str) {
        self.manifest_packages
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((manifest_path.to_string(), package_name.map(str::to_string)));

        for module in &pkg.modules {
            for decl in &module.declarations {
                let Declaration::Class(class_decl) = decl else {
                    continue;
                };
                let Some(element) = CustomElement::from_declaration(class_decl, &module.path) else {
                    continue;
                };
                if self.elements.contains_key(&element.tag_name) {
                    warn!(tag = %element.tag_name, "overwriting existing custom element definition (later manifest wins)");
                }
                let definition = ElementDefinition {
                    element: element.clone(),
                    package_name: package_name.map(str::to_string),
                    module_path: module.path.clone(),
                    source_href: class_decl.source.as_ref().and_then(|s| s.href.clone()),
                };
                self.elements.insert(element.tag_name.clone(), element);
                self.definitions.insert(definition.element.tag_name.clone(), definition);
            }
        }
    }

    #[must_use]
    pub fn element(&self, tag: &str) -> Option<CustomElement> {
        self.elements.get(tag).map(|e| e.clone())
    }

    #[must_use]
    pub fn attributes(&self, tag: &str) -> Option<Vec<Attribute>> {
        self.elements.get(tag).map(|e| e.attributes.clone())
    }

    #[must_use]
    pub fn slots(&self, tag: &str) -> Option<Vec<Slot>> {
        self.elements.get(tag).map(|e| e.slots.clone())
    }

    #[must_use]
    pub fn element_definition(&self, tag: &str) -> Option<ElementDefinition> {
        self.definitions.get(tag).map(|d| d.clone())
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.elements.contains_key(tag)
    }

    #[must_use]
    pub fn all_tag_names(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.key().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Manifest file paths loaded so far, paired with their package name
    /// when known. Used to seed the file watcher.
    #[must_use]
    pub fn manifest_paths(&self) -> Vec<String> {
        self.manifest_packages
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Manifest file paths loaded so far, paired with the package name on
    /// record for each, preserving the association across a reload.
    #[must_use]
    pub fn manifest_entries(&self) -> Vec<(String, Option<String>)> {
        self.manifest_packages
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Clears every index. Used before a full workspace reload.
    pub fn clear(&self) {
        self.elements.clear();
        self.definitions.clear();
        self.manifest_packages
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{CustomElementDeclaration, Module};

    fn pkg_with_tag(tag: &str, class_name: &str) -> Package {
        Package {
            schema_version: "2.0.0".into(),
            modules: vec![Module {
                kind: "javascript-module".into(),
                path: format!("{tag}.js"),
                declarations: vec![Declaration::Class(CustomElementDeclaration {
                    name: class_name.into(),
                    tag_name: Some(tag.into()),
                    description: None,
                    summary: None,
                    attributes: vec![],
                    slots: vec![],
                    events: vec![],
                    source: None,
                    custom_element: true,
                })],
                exports: vec![],
            }],
            readme: None,
        }
    }

    #[test]
    fn add_manifest_indexes_elements() {
        let registry = Registry::new();
        registry.add_manifest(&pkg_with_tag("my-button", "MyButton"), Some("my-pkg"), "manifest.json");
        assert!(registry.contains("my-button"));
        let def = registry.element_definition("my-button").unwrap();
        assert_eq!(def.package_name.as_deref(), Some("my-pkg"));
    }

    #[test]
    fn later_manifest_wins_on_tag_collision() {
        let registry = Registry::new();
        registry.add_manifest(&pkg_with_tag("my-button", "First"), Some("pkg-a"), "a.json");
        registry.add_manifest(&pkg_with_tag("my-button", "Second"), Some("pkg-b"), "b.json");
        let el = registry.element("my-button").unwrap();
        assert_eq!(el.class_name, "Second");
        let def = registry.element_definition("my-button").unwrap();
        assert_eq!(def.package_name.as_deref(), Some("pkg-b"));
    }

    #[test]
    fn unknown_tag_returns_none() {
        let registry = Registry::new();
        assert!(registry.element("missing-tag").is_none());
        assert!(!registry.contains("missing-tag"));
    }

    #[test]
    fn manifest_entries_preserves_package_names() {
        let registry = Registry::new();
        registry.add_manifest(&pkg_with_tag("my-button", "MyButton"), Some("my-pkg"), "m.json");
        let entries = registry.manifest_entries();
        assert_eq!(entries, vec![("m.json".to_string(), Some("my-pkg".to_string()))]);
    }

    #[test]
    fn clear_resets_all_indexes() {
        let registry = Registry::new();
        registry.add_manifest(&pkg_with_tag("my-button", "MyButton"), None, "m.json");
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.manifest_paths().is_empty());
    }
}
