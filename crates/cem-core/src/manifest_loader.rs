//! Discovery and loading of Custom Elements Manifests from a workspace:
//! the declared root manifest, workspace packages (npm/yarn/pnpm layouts),
//! and `node_modules` dependencies.

use crate::error::Result;
use crate::manifest::Package;
use globset::{Glob, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A manifest file discovered somewhere in the workspace, with the package
/// name it belongs to (from the nearest `package.json#name`) when known.
#[derive(Debug, Clone)]
pub struct DiscoveredManifest {
    pub path: PathBuf,
    pub package_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageJson {
    name: Option<String>,
    #[serde(rename = "customElements")]
    custom_elements: Option<String>,
    workspaces: Option<WorkspacesField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkspacesField {
    List(Vec<String>),
    Object { packages: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct PnpmWorkspaceYaml {
    #[serde(default)]
    packages: Vec<String>,
}

/// Reads `package.json` at `dir`, if present.
fn read_package_json(dir: &Path) -> Option<PackageJson> {
    let path = dir.join("package.json");
    let content = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(pkg) => Some(pkg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse package.json");
            None
        }
    }
}

/// Loads the workspace's root manifest. `declared_path` is the path to the
/// CEM file as configured (relative to `workspace_root`); if it does not
/// exist on disk, returns `Ok(None)` so the caller can fall back to a
/// [`crate::synth::ManifestSynthesizer`].
pub fn load_root_manifest(workspace_root: &Path, declared_path: &str) -> Result<Option<(Package, DiscoveredManifest)>> {
    let full_path = workspace_root.join(declared_path);
    if !full_path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&full_path)?;
    let pkg: Package = serde_json::from_str(&content)?;
    let package_name = read_package_json(workspace_root).and_then(|p| p.name);
    Ok(Some((
        pkg,
        DiscoveredManifest {
            path: full_path,
            package_name,
        },
    )))
}

/// Which package manager governs this workspace's `workspaces` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

/// Detects the package manager in use at `workspace_root` by probing for
/// its characteristic lockfile/config.
#[must_use]
pub fn detect_package_manager(workspace_root: &Path) -> Option<PackageManager> {
    if workspace_root.join("pnpm-workspace.yaml").exists() {
        return Some(PackageManager::Pnpm);
    }
    if workspace_root.join("yarn.lock").exists() {
        return Some(PackageManager::Yarn);
    }
    if workspace_root.join("package.json").exists() {
        return Some(PackageManager::Npm);
    }
    None
}

/// Returns the glob patterns (as configured by the workspace layout) that
/// define which directories are workspace packages.
fn workspace_patterns(workspace_root: &Path, manager: PackageManager) -> Result<Vec<String>> {
    match manager {
        PackageManager::Pnpm => {
            let yaml_path = workspace_root.join("pnpm-workspace.yaml");
            let content = std::fs::read_to_string(&yaml_path)?;
            let parsed: PnpmWorkspaceYaml = serde_yaml::from_str(&content)?;
            Ok(parsed.packages)
        }
        PackageManager::Npm | PackageManager::Yarn => {
            let Some(pkg) = read_package_json(workspace_root) else {
                return Ok(Vec::new());
            };
            Ok(match pkg.workspaces {
                Some(WorkspacesField::List(list)) => list,
                Some(WorkspacesField::Object { packages }) => packages,
                None => Vec::new(),
            })
        }
    }
}

/// Expands `patterns` (which may include `**` doublestar globs and leading
/// `!` negations) against the directory tree rooted at `workspace_root`,
/// returning directories that contain a `package.json`. Negations are
/// applied as a set-minus over the positive matches.
pub fn expand_workspace_packages(workspace_root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut positive = GlobSetBuilder::new();
    let mut negative = GlobSetBuilder::new();
    let mut has_negative = false;

    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            negative.add(Glob::new(negated)?);
            has_negative = true;
        } else {
            positive.add(Glob::new(pattern)?);
        }
    }

    let positive_set = positive.build()?;
    let negative_set = negative.build()?;

    let mut matches = Vec::new();
    for entry in walkdir::WalkDir::new(workspace_root)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules")
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(workspace_root) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        if positive_set.is_match(relative) && (!has_negative || !negative_set.is_match(relative)) {
            matches.push(entry.path().to_path_buf());
        }
    }

    Ok(matches
        .into_iter()
        .filter(|dir| dir.join("package.json").exists())
        .collect())
}

/// Expands `patterns` against files (not directories) under `root`,
/// applying the same set-minus negation semantics as
/// [`expand_workspace_packages`]. Used by the generate watcher to select
/// which source files to watch for regeneration.
pub fn expand_source_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut positive = GlobSetBuilder::new();
    let mut negative = GlobSetBuilder::new();
    let mut has_negative = false;

    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            negative.add(Glob::new(negated)?);
            has_negative = true;
        } else {
            positive.add(Glob::new(pattern)?);
        }
    }

    let positive_set = positive.build()?;
    let negative_set = negative.build()?;

    let mut matches = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules")
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if positive_set.is_match(relative) && (!has_negative || !negative_set.is_match(relative)) {
            matches.push(entry.path().to_path_buf());
        }
    }

    Ok(matches)
}

/// Loads every manifest declared by workspace packages under
/// `workspace_root`, according to the detected package manager's layout.
pub fn load_workspace_package_manifests(workspace_root: &Path) -> Result<Vec<(Package, DiscoveredManifest)>> {
    let Some(manager) = detect_package_manager(workspace_root) else {
        return Ok(Vec::new());
    };
    let patterns = workspace_patterns(workspace_root, manager)?;
    if patterns.is_empty() {
        return Ok(Vec::new());
    }
    let packages = expand_workspace_packages(workspace_root, &patterns)?;

    let mut results = Vec::new();
    for package_dir in packages {
        let Some(pkg_json) = read_package_json(&package_dir) else {
            continue;
        };
        let Some(manifest_rel) = pkg_json.custom_elements else {
            continue;
        };
        let manifest_path = package_dir.join(&manifest_rel);
        let Ok(content) = std::fs::read_to_string(&manifest_path) else {
            debug!(path = %manifest_path.display(), "workspace package declares customElements but file is missing");
            continue;
        };
        match serde_json::from_str::<Package>(&content) {
            Ok(pkg) => results.push((
                pkg,
                DiscoveredManifest {
                    path: manifest_path,
                    package_name: pkg_json.name,
                },
            )),
            Err(e) => warn!(path = %manifest_rel, error = %e, "failed to parse workspace package manifest"),
        }
    }
    Ok(results)
}

/// Loads manifests declared by top-level and scoped (`@scope/...`) packages
/// under `node_modules`.
pub fn load_node_modules_manifests(workspace_root: &Path) -> Result<Vec<(Package, DiscoveredManifest)>> {
    let node_modules = workspace_root.join("node_modules");
    if !node_modules.is_dir() {
        return Ok(Vec::new());
    }

    let mut candidate_dirs = Vec::new();
    let entries = std::fs::read_dir(&node_modules)?;
    for entry in entries.filter_map(std::result::Result::ok) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(scope) = name.strip_prefix('@') {
            let _ = scope;
            if let Ok(scoped_entries) = std::fs::read_dir(&path) {
                for scoped in scoped_entries.filter_map(std::result::Result::ok) {
                    if scoped.path().is_dir() {
                        candidate_dirs.push(scoped.path());
                    }
                }
            }
        } else {
            candidate_dirs.push(path);
        }
    }

    let mut results = Vec::new();
    for dir in candidate_dirs {
        let Some(pkg_json) = read_package_json(&dir) else {
            continue;
        };
        let Some(manifest_rel) = pkg_json.custom_elements else {
            continue;
        };
        let manifest_path = dir.join(&manifest_rel);
        let Ok(content) = std::fs::read_to_string(&manifest_path) else {
            continue;
        };
        match serde_json::from_str::<Package>(&content) {
            Ok(pkg) => results.push((
                pkg,
                DiscoveredManifest {
                    path: manifest_path,
                    package_name: pkg_json.name,
                },
            )),
            Err(e) => warn!(dir = %dir.display(), error = %e, "failed to parse node_modules package manifest"),
        }
    }
    Ok(results)
}

/// Aggregate result of a full workspace discovery pass, preserving the
/// order manifests were loaded in (root, then packages, then
/// `node_modules`) since later insertions win on tag collisions.
#[derive(Debug, Default)]
pub struct WorkspaceManifests {
    pub manifests: Vec<(Package, DiscoveredManifest)>,
}

/// Performs the full layered discovery described for the Manifest Loader:
/// root manifest (or `None` if absent, leaving synthesis to the caller),
/// workspace packages, then `node_modules`.
pub fn load_workspace(workspace_root: &Path, declared_root_manifest: &str) -> Result<WorkspaceManifests> {
    let mut manifests = Vec::new();

    if let Some(root) = load_root_manifest(workspace_root, declared_root_manifest)? {
        manifests.push(root);
    }
    manifests.extend(load_workspace_package_manifests(workspace_root)?);
    manifests.extend(load_node_modules_manifests(workspace_root)?);

    Ok(WorkspaceManifests { manifests })
}

/// Re-reads every manifest at `paths` directly from disk, bypassing any
/// caching layer, preserving the package-name association already on
/// record in `known_package_names`.
pub fn reload_manifests(
    paths: &[String],
    known_package_names: &HashMap<String, Option<String>>,
) -> Vec<(Package, DiscoveredManifest)> {
    let mut out = Vec::new();
    for path in paths {
        let Ok(content) = std::fs::read_to_string(path) else {
            warn!(path, "manifest disappeared during reload");
            continue;
        };
        match serde_json::from_str::<Package>(&content) {
            Ok(pkg) => out.push((
                pkg,
                DiscoveredManifest {
                    path: PathBuf::from(path),
                    package_name: known_package_names.get(path).cloned().flatten(),
                },
            )),
            Err(e) => warn!(path, error = %e, "failed to parse manifest during reload"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn detects_pnpm_workspace() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pnpm-workspace.yaml"), "packages:\n  - 'packages/*'\n").unwrap();
        assert_eq!(detect_package_manager(dir.path()), Some(PackageManager::Pnpm));
    }

    #[test]
    fn detects_yarn_over_npm_when_lockfile_present() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("yarn.lock"), "").unwrap();
        assert_eq!(detect_package_manager(dir.path()), Some(PackageManager::Yarn));
    }

    #[test]
    fn falls_back_to_npm_with_only_package_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(detect_package_manager(dir.path()), Some(PackageManager::Npm));
    }

    #[test]
    fn expand_workspace_packages_respects_negation() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("packages/a")).unwrap();
        fs::create_dir_all(dir.path().join("packages/b")).unwrap();
        fs::write(dir.path().join("packages/a/package.json"), "{}").unwrap();
        fs::write(dir.path().join("packages/b/package.json"), "{}").unwrap();

        let patterns = vec!["packages/*".to_string(), "!packages/b".to_string()];
        let matches = expand_workspace_packages(dir.path(), &patterns).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].ends_with("a"));
    }

    #[test]
    fn expand_source_files_matches_extension_glob() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "").unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        let matches = expand_source_files(dir.path(), &["*.ts".to_string()]).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].ends_with("a.ts"));
    }

    #[test]
    fn load_root_manifest_returns_none_when_missing() {
        let dir = tempdir().unwrap();
        let result = load_root_manifest(dir.path(), "custom-elements.json").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_root_manifest_reads_existing_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("custom-elements.json"),
            r#"{"schemaVersion":"2.0.0","modules":[]}"#,
        )
        .unwrap();
        let (pkg, _) = load_root_manifest(dir.path(), "custom-elements.json").unwrap().unwrap();
        assert_eq!(pkg.schema_version, "2.0.0");
    }
}
