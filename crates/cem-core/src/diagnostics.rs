//! Validates custom-element usage in a document and produces diagnostics
//! with strongly typed autofix data for the code-action handler.

use crate::document::{CustomElementMatch, Document};
use crate::ephemeral::EphemeralRegistry;
use crate::module_graph::ModuleGraph;
use crate::query::QueryCache;
use crate::registry::Registry;
use tower_lsp_server::lsp_types::Range;

/// Global attributes valid on any HTML element, excluded from "unknown
/// attribute" diagnostics regardless of the target custom element's own
/// attribute set.
const GLOBAL_ATTRIBUTES: &[&str] = &[
    "id", "class", "style", "title", "slot", "hidden", "tabindex", "lang", "dir", "role",
    "draggable", "spellcheck", "translate", "contenteditable", "part", "exportparts", "is",
];

const MAX_SUGGESTION_DISTANCE: usize = 3;
const MAX_SUGGESTION_CANDIDATES: usize = 5;

/// Strongly typed payload a code-action handler uses to build the fix for a
/// diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum AutofixData {
    UnknownTagTypo {
        tag: String,
        suggestion: Option<String>,
    },
    MissingImport {
        tag: String,
        suggested_specifier: String,
        is_package: bool,
    },
    UnknownAttribute {
        tag: String,
        attr: String,
        suggestion: Option<String>,
    },
    UnknownSlotValue {
        tag: String,
        value: String,
        suggestion: Option<String>,
    },
    InvalidAttributeValue {
        tag: String,
        attr: String,
        value: String,
        allowed: Option<Vec<String>>,
    },
}

/// A diagnostic produced by this module, independent of the LSP
/// `Diagnostic` wire type so it can be unit tested without constructing LSP
/// structures.
#[derive(Debug, Clone, PartialEq)]
pub struct CemDiagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
    pub fix: AutofixData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Computes all diagnostics for `document`.
#[must_use]
pub fn compute_diagnostics(
    queries: &QueryCache,
    document: &Document,
    registry: &Registry,
    ephemeral: &EphemeralRegistry,
    module_graph: &ModuleGraph,
    document_module_path: &str,
) -> Vec<CemDiagnostic> {
    let elements = document.custom_elements(queries);
    let mut diagnostics = Vec::new();

    let all_tags = registry.all_tag_names();
    let imported_tags = imported_tag_set(document, module_graph, document_module_path);

    for element in &elements {
        if registry.contains(&element.tag_name) {
            check_missing_import(element, registry, ephemeral, &imported_tags, &mut diagnostics);
            check_attributes(element, registry, &mut diagnostics);
            continue;
        }
        if ephemeral.contains(&element.tag_name) {
            check_attributes_ephemeral(element, ephemeral, &mut diagnostics);
            continue;
        }
        check_unknown_tag(element, &all_tags, &mut diagnostics);
    }

    check_slot_values(&elements, registry, &mut diagnostics);

    diagnostics
}

fn imported_tag_set(
    document: &Document,
    module_graph: &ModuleGraph,
    document_module_path: &str,
) -> std::collections::HashSet<String> {
    let mut tags = module_graph.local_elements(document_module_path);
    for script in &document.script_tags {
        for import in &script.imports {
            for module in module_graph.find_manifest_modules_for_import(&import.specifier) {
                tags.extend(module_graph.transitive_elements(&module));
            }
        }
    }
    tags
}

fn check_unknown_tag(
    element: &CustomElementMatch,
    all_tags: &[String],
    diagnostics: &mut Vec<CemDiagnostic>,
) {
    let suggestion = if all_tags.len() > MAX_SUGGESTION_CANDIDATES {
        None
    } else {
        best_suggestion(&element.tag_name, all_tags)
    };

    let message = match &suggestion {
        Some(s) => format!("Unknown custom element '{}'. Did you mean '{s}'?", element.tag_name),
        None if all_tags.len() > MAX_SUGGESTION_CANDIDATES => {
            format!(
                "Unknown custom element '{}'. See your project's component documentation.",
                element.tag_name
            )
        }
        None => format!("Unknown custom element '{}'.", element.tag_name),
    };

    diagnostics.push(CemDiagnostic {
        range: element.tag_name_range,
        message,
        severity: Severity::Warning,
        fix: AutofixData::UnknownTagTypo {
            tag: element.tag_name.clone(),
            suggestion,
        },
    });
}

fn check_missing_import(
    element: &CustomElementMatch,
    registry: &Registry,
    ephemeral: &EphemeralRegistry,
    imported_tags: &std::collections::HashSet<String>,
    diagnostics: &mut Vec<CemDiagnostic>,
) {
    if imported_tags.contains(&element.tag_name) || ephemeral.contains(&element.tag_name) {
        return;
    }
    let Some(def) = registry.element_definition(&element.tag_name) else {
        return;
    };
    let specifier = def.import_specifier();
    diagnostics.push(CemDiagnostic {
        range: element.tag_name_range,
        message: format!(
            "Custom element '{}' is not imported by this file. Add `import '{specifier}'`.",
            element.tag_name
        ),
        severity: Severity::Warning,
        fix: AutofixData::MissingImport {
            tag: element.tag_name.clone(),
            suggested_specifier: specifier,
            is_package: def.is_package_specifier(),
        },
    });
}

fn check_attributes(element: &CustomElementMatch, registry: &Registry, diagnostics: &mut Vec<CemDiagnostic>) {
    let Some(known_attrs) = registry.attributes(&element.tag_name) else {
        return;
    };
    let attr_names: Vec<String> = known_attrs.iter().map(|a| a.name.clone()).collect();

    for attr in &element.attributes {
        if GLOBAL_ATTRIBUTES.contains(&attr.name.as_str()) {
            continue;
        }
        // Lit binding sigils (@event, .prop, ?bool) are not plain attribute
        // names; they are out of scope for plain-attribute validation here.
        if attr.name.starts_with(['@', '.', '?']) {
            continue;
        }
        let Some(known) = known_attrs.iter().find(|a| a.name == attr.name) else {
            let suggestion = best_suggestion(&attr.name, &attr_names);
            diagnostics.push(CemDiagnostic {
                range: attr.name_range,
                message: match &suggestion {
                    Some(s) => format!(
                        "Unknown attribute '{}' on <{}>. Did you mean '{s}'?",
                        attr.name, element.tag_name
                    ),
                    None => format!("Unknown attribute '{}' on <{}>.", attr.name, element.tag_name),
                },
                severity: Severity::Warning,
                fix: AutofixData::UnknownAttribute {
                    tag: element.tag_name.clone(),
                    attr: attr.name.clone(),
                    suggestion,
                },
            });
            continue;
        };

        if let (Some(value), Some(value_range), Some(attr_type)) =
            (&attr.value, attr.value_range, &known.attr_type)
        {
            validate_attribute_value(element, &attr.name, value, value_range, attr_type, diagnostics);
        }
    }
}

fn check_attributes_ephemeral(
    element: &CustomElementMatch,
    ephemeral: &EphemeralRegistry,
    diagnostics: &mut Vec<CemDiagnostic>,
) {
    let Some(known) = ephemeral.find(&element.tag_name) else {
        return;
    };
    let attr_names: Vec<String> = known.attributes.iter().map(|a| a.name.clone()).collect();
    for attr in &element.attributes {
        if GLOBAL_ATTRIBUTES.contains(&attr.name.as_str()) || attr.name.starts_with(['@', '.', '?']) {
            continue;
        }
        if known.attribute(&attr.name).is_none() {
            let suggestion = best_suggestion(&attr.name, &attr_names);
            diagnostics.push(CemDiagnostic {
                range: attr.name_range,
                message: format!("Unknown attribute '{}' on <{}>.", attr.name, element.tag_name),
                severity: Severity::Warning,
                fix: AutofixData::UnknownAttribute {
                    tag: element.tag_name.clone(),
                    attr: attr.name.clone(),
                    suggestion,
                },
            });
        }
    }
}

fn validate_attribute_value(
    element: &CustomElementMatch,
    attr_name: &str,
    value: &str,
    value_range: Range,
    attr_type: &crate::manifest::AttributeType,
    diagnostics: &mut Vec<CemDiagnostic>,
) {
    if attr_type.is_boolean() || attr_type.is_number() {
        return;
    }
    let Some(allowed) = attr_type.literal_values() else {
        return;
    };
    if allowed.iter().any(|v| v == value) {
        return;
    }
    diagnostics.push(CemDiagnostic {
        range: value_range,
        message: format!(
            "Invalid value '{value}' for attribute '{attr_name}' on <{}>. Allowed: {}.",
            element.tag_name,
            allowed.join(", ")
        ),
        severity: Severity::Error,
        fix: AutofixData::InvalidAttributeValue {
            tag: element.tag_name.clone(),
            attr: attr_name.to_string(),
            value: value.to_string(),
            allowed: Some(allowed),
        },
    });
}

fn check_slot_values(
    elements: &[CustomElementMatch],
    registry: &Registry,
    diagnostics: &mut Vec<CemDiagnostic>,
) {
    for element in elements {
        let Some(slots) = registry.slots(&element.tag_name) else {
            continue;
        };
        let slot_names: Vec<String> = slots.iter().map(|s| s.name.clone()).collect();
        for child in elements {
            // A direct child relationship is approximated here by range
            // containment; the precise parent/child link lives in the tree
            // but this module works off the flattened CustomElementMatch
            // list for simplicity.
            if child.tag_name == element.tag_name {
                continue;
            }
            if !range_within(child.element_range, element.element_range) {
                continue;
            }
            if let Some(slot_attr) = child.attributes.iter().find(|a| a.name == "slot") {
                if let Some(value) = &slot_attr.value {
                    if !slot_names.iter().any(|n| n == value) {
                        let suggestion = best_suggestion(value, &slot_names);
                        diagnostics.push(CemDiagnostic {
                            range: slot_attr.value_range.unwrap_or(slot_attr.name_range),
                            message: format!(
                                "Unknown slot '{value}' for <{}>.",
                                element.tag_name
                            ),
                            severity: Severity::Warning,
                            fix: AutofixData::UnknownSlotValue {
                                tag: element.tag_name.clone(),
                                value: value.clone(),
                                suggestion,
                            },
                        });
                    }
                }
            }
        }
    }
}

fn range_within(inner: Range, outer: Range) -> bool {
    let after_start = inner.start.line > outer.start.line
        || (inner.start.line == outer.start.line && inner.start.character >= outer.start.character);
    let before_end = inner.end.line < outer.end.line
        || (inner.end.line == outer.end.line && inner.end.character <= outer.end.character);
    after_start && before_end && inner != outer
}

fn best_suggestion(target: &str, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (c, strsim::levenshtein(target, c)))
        .filter(|(_, dist)| *dist <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(c, _)| c.clone())
}
