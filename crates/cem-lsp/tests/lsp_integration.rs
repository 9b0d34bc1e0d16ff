//! End-to-end tests that spawn the compiled `cem-lsp` binary and speak raw
//! `Content-Length`-framed JSON-RPC over its stdio pipes.

mod common;

use common::LspClient;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn workspace_with_manifest() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("custom-elements.json"),
        r#"{
            "schemaVersion": "2.0.0",
            "modules": [{
                "kind": "javascript-module",
                "path": "my-button.js",
                "declarations": [{
                    "kind": "class",
                    "name": "MyButton",
                    "tagName": "my-button",
                    "description": "A clickable button.",
                    "customElement": true,
                    "attributes": [{
                        "name": "variant",
                        "type": {"text": "\"primary\" | \"secondary\""}
                    }]
                }],
                "exports": []
            }]
        }"#,
    )
    .unwrap();
    dir
}

/// Manifest discovery runs on a background task kicked off from
/// `initialized`; give it a moment to land before issuing requests.
fn wait_for_manifest_load() {
    std::thread::sleep(Duration::from_millis(200));
}

#[test]
fn hover_reports_element_description() {
    let dir = workspace_with_manifest();
    let root_uri = format!("file://{}", dir.path().display());
    let mut client = LspClient::spawn();
    client.initialize(&root_uri);
    wait_for_manifest_load();

    let doc_uri = format!("file://{}/index.html", dir.path().display());
    client.did_open(&doc_uri, "html", "<my-button></my-button>");

    let response = client.hover(2, &doc_uri, 0, 3);
    let value = response["result"]["contents"]["value"].as_str().unwrap_or_default();
    assert!(value.contains("clickable button"));

    client.shutdown();
}

#[test]
fn completion_suggests_registered_tag() {
    let dir = workspace_with_manifest();
    let root_uri = format!("file://{}", dir.path().display());
    let mut client = LspClient::spawn();
    client.initialize(&root_uri);
    wait_for_manifest_load();

    let doc_uri = format!("file://{}/index.html", dir.path().display());
    client.did_open(&doc_uri, "html", "<my-but");

    let response = client.completion(2, &doc_uri, 0, 7);
    let items = response["result"].as_array().cloned().unwrap_or_default();
    assert!(items.iter().any(|item| item["label"] == "my-button"));

    client.shutdown();
}

#[test]
fn diagnostic_flags_unknown_tag() {
    let dir = workspace_with_manifest();
    let root_uri = format!("file://{}", dir.path().display());
    let mut client = LspClient::spawn();
    client.initialize(&root_uri);
    wait_for_manifest_load();

    let doc_uri = format!("file://{}/index.html", dir.path().display());
    client.did_open(&doc_uri, "html", "<my-buttom></my-buttom>");

    let response = client.diagnostic(2, &doc_uri);
    let items = response["result"]["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 1);

    client.shutdown();
}

#[test]
fn workspace_symbol_lists_registered_element() {
    let dir = workspace_with_manifest();
    let root_uri = format!("file://{}", dir.path().display());
    let mut client = LspClient::spawn();
    client.initialize(&root_uri);
    wait_for_manifest_load();

    let response = client.workspace_symbol(2, "button");
    let items = response["result"].as_array().cloned().unwrap_or_default();
    assert!(items.iter().any(|item| item["name"] == "my-button"));

    client.shutdown();
}
