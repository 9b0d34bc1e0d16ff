use cem_core::manifest::{Attribute, AttributeType, CustomElementDeclaration, Declaration, Module, Package};
use cem_core::ServerState;
use cem_lsp::config::DiagnosticsConfig;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::str::FromStr;
use tower_lsp_server::lsp_types::{Position, TextDocumentIdentifier, TextDocumentPositionParams, Uri};

fn state_with_elements(count: usize) -> ServerState {
    let state = ServerState::new().unwrap();
    for i in 0..count {
        let tag = format!("my-element-{i}");
        let pkg = Package {
            schema_version: "2.0.0".into(),
            modules: vec![Module {
                kind: "javascript-module".into(),
                path: format!("{tag}.js"),
                declarations: vec![Declaration::Class(CustomElementDeclaration {
                    name: "MyElement".into(),
                    tag_name: Some(tag.clone()),
                    description: Some("A benchmark element.".into()),
                    summary: None,
                    attributes: vec![Attribute {
                        name: "variant".into(),
                        description: None,
                        attr_type: Some(AttributeType {
                            text: "\"a\" | \"b\" | \"c\"".into(),
                        }),
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
        state.registry.add_manifest(&pkg, Some("bench-pkg"), &format!("{tag}.json"));
    }
    state
}

fn bench_completion_tag_name(c: &mut Criterion) {
    let state = state_with_elements(500);
    let uri = Uri::from_str("file:///bench.html").unwrap();
    state.documents.open(uri.clone(), "<my-elem".into(), 1);

    let params = tower_lsp_server::lsp_types::CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position: Position { line: 0, character: 8 },
        },
        work_done_progress_params: Default::default(),
        partial_result_params: Default::default(),
        context: None,
    };

    c.bench_function("completion/tag_name_500_elements", |b| {
        b.iter(|| black_box(cem_lsp::handlers::completion::handle_completion(&state, params.clone())));
    });
}

fn bench_diagnostics_unknown_tag(c: &mut Criterion) {
    let state = state_with_elements(500);
    let uri = Uri::from_str("file:///bench.html").unwrap();
    state.documents.open(uri.clone(), "<my-elemnt-0></my-elemnt-0>".into(), 1);
    let config = DiagnosticsConfig::default();

    c.bench_function("diagnostics/typo_suggestion_500_elements", |b| {
        b.iter(|| black_box(cem_lsp::handlers::diagnostics::handle_diagnostics(&state, &uri, &config)));
    });
}

criterion_group!(benches, bench_completion_tag_name, bench_diagnostics_unknown_tag);
criterion_main!(benches);
