//! Lazy, cycle-safe graph of module imports, used to answer "is this tag
//! transitively imported by this document" for the missing-import
//! diagnostic.

use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::RwLock;

/// One node in the graph: a normalized module path, its locally defined
/// custom-element tags, and the modules it imports.
#[derive(Debug, Clone, Default)]
struct ModuleNode {
    local_tags: HashSet<String>,
    imports: HashSet<String>,
}

/// Directed graph of module imports plus a memoized transitive-closure
/// cache, invalidated whenever the graph's edges or tag sets change.
pub struct ModuleGraph {
    nodes: DashMap<String, ModuleNode>,
    closure_cache: RwLock<std::collections::HashMap<String, HashSet<String>>>,
}

impl std::fmt::Debug for ModuleGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleGraph")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            closure_cache: RwLock::new(std::collections::HashMap::new()),
        }
    }

    /// Normalizes a module path: strips a leading `./`, maps `.ts` to `.js`
    /// (manifests always reference generated `.js`).
    #[must_use]
    pub fn normalize(path: &str) -> String {
        let stripped = path.strip_prefix("./").unwrap_or(path);
        if let Some(base) = stripped.strip_suffix(".ts") {
            format!("{base}.js")
        } else if let Some(base) = stripped.strip_suffix(".tsx") {
            format!("{base}.js")
        } else {
            stripped.to_string()
        }
    }

    /// Registers `tag` as locally defined by `module_path`, creating the
    /// node if necessary. Invalidates the closure cache.
    pub fn add_local_tag(&self, module_path: &str, tag: &str) {
        let key = Self::normalize(module_path);
        self.nodes.entry(key).or_default().local_tags.insert(tag.to_string());
        self.invalidate();
    }

    /// Records that `importer` imports `imported`. Both are normalized and
    /// created as nodes if absent (the imported node may be populated later
    /// via lazy discovery). Invalidates the closure cache.
    pub fn add_import(&self, importer: &str, imported: &str) {
        let from = Self::normalize(importer);
        let to = Self::normalize(imported);
        self.nodes.entry(from).or_default().imports.insert(to.clone());
        self.nodes.entry(to).or_default();
        self.invalidate();
    }

    fn invalidate(&self) {
        self.closure_cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// All tags locally defined on `module_path`.
    #[must_use]
    pub fn local_elements(&self, module_path: &str) -> HashSet<String> {
        let key = Self::normalize(module_path);
        self.nodes.get(&key).map(|n| n.local_tags.clone()).unwrap_or_default()
    }

    /// Every module path that defines `tag` locally.
    #[must_use]
    pub fn elements_sources(&self, tag: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|entry| entry.value().local_tags.contains(tag))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Set of all tags reachable from `module_path` by following imports,
    /// including tags it defines locally. Memoized; tolerates cycles via a
    /// visited-set guarded BFS.
    #[must_use]
    pub fn transitive_elements(&self, module_path: &str) -> HashSet<String> {
        let key = Self::normalize(module_path);
        if let Some(cached) = self
            .closure_cache
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key)
        {
            return cached.clone();
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(key.clone());
        let mut tags = HashSet::new();

        while let Some(node_key) = queue.pop_front() {
            if !visited.insert(node_key.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&node_key) {
                tags.extend(node.local_tags.iter().cloned());
                for next in &node.imports {
                    if !visited.contains(next) {
                        queue.push_back(next.clone());
                    }
                }
            }
        }

        self.closure_cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key, tags.clone());
        tags
    }

    /// Resolves an import specifier to candidate manifest module keys using
    /// a loosening sequence of heuristics: exact normalized match, suffix
    /// match in either direction, then filename-only match.
    #[must_use]
    pub fn find_manifest_modules_for_import(&self, specifier: &str) -> Vec<String> {
        let normalized = Self::normalize(specifier);

        let exact: Vec<String> = self
            .nodes
            .iter()
            .filter(|e| *e.key() == normalized)
            .map(|e| e.key().clone())
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let suffix: Vec<String> = self
            .nodes
            .iter()
            .filter(|e| e.key().ends_with(&normalized) || normalized.ends_with(e.key().as_str()))
            .map(|e| e.key().clone())
            .collect();
        if !suffix.is_empty() {
            return suffix;
        }

        let filename = normalized.rsplit('/').next().unwrap_or(&normalized);
        self.nodes
            .iter()
            .filter(|e| e.key().rsplit('/').next() == Some(filename))
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn clear(&self) {
        self.nodes.clear();
        self.invalidate();
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_relative_prefix_and_maps_extension() {
        assert_eq!(ModuleGraph::normalize("./foo.ts"), "foo.js");
        assert_eq!(ModuleGraph::normalize("bar.tsx"), "bar.js");
        assert_eq!(ModuleGraph::normalize("baz.js"), "baz.js");
    }

    #[test]
    fn transitive_includes_local_and_imported_tags() {
        let graph = ModuleGraph::new();
        graph.add_local_tag("c.js", "my-icon");
        graph.add_import("b.js", "c.js");
        graph.add_import("a.js", "b.js");

        let tags = graph.transitive_elements("a.js");
        assert!(tags.contains("my-icon"));
    }

    #[test]
    fn cycles_do_not_cause_infinite_loop() {
        let graph = ModuleGraph::new();
        graph.add_import("a.js", "b.js");
        graph.add_import("b.js", "a.js");
        graph.add_local_tag("a.js", "my-a");
        graph.add_local_tag("b.js", "my-b");

        let tags = graph.transitive_elements("a.js");
        assert!(tags.contains("my-a"));
        assert!(tags.contains("my-b"));
    }

    #[test]
    fn cache_invalidates_on_new_edge() {
        let graph = ModuleGraph::new();
        graph.add_local_tag("b.js", "my-b");
        graph.add_import("a.js", "b.js");
        let first = graph.transitive_elements("a.js");
        assert!(first.contains("my-b"));

        graph.add_local_tag("c.js", "my-c");
        graph.add_import("a.js", "c.js");
        let second = graph.transitive_elements("a.js");
        assert!(second.contains("my-c"));
    }

    #[test]
    fn elements_sources_finds_defining_modules() {
        let graph = ModuleGraph::new();
        graph.add_local_tag("a.js", "my-shared");
        graph.add_local_tag("b.js", "my-shared");
        let mut sources = graph.elements_sources("my-shared");
        sources.sort();
        assert_eq!(sources, vec!["a.js".to_string(), "b.js".to_string()]);
    }

    #[test]
    fn find_manifest_modules_matches_by_suffix_then_filename() {
        let graph = ModuleGraph::new();
        graph.add_local_tag("components/my-button.js", "my-button");
        let matches = graph.find_manifest_modules_for_import("./my-button.js");
        assert!(matches.contains(&"components/my-button.js".to_string()));
    }
}
