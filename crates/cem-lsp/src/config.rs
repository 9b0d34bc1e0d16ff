use serde::Deserialize;
use tower_lsp_server::lsp_types::DiagnosticSeverity;

/// Root configuration for the `cem-lsp` server.
///
/// Parsed once from `initialize`'s `initializationOptions` and updatable
/// afterwards via `workspace/didChangeConfiguration`. Every field has a
/// default, so an empty `{}` (or entirely missing `initializationOptions`)
/// is a fully valid configuration.
///
/// # Examples
///
/// ```
/// use cem_lsp::config::CemConfig;
///
/// let json = r#"{
///     "watcher": { "debounceMs": 750 }
/// }"#;
///
/// let config: CemConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.watcher.debounce_ms, 750);
/// assert!(config.diagnostics.missing_import_severity == cem_lsp::config::default_warning_severity());
/// ```
#[derive(Debug, Deserialize, Default)]
pub struct CemConfig {
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

/// Per-kind diagnostic severity overrides.
///
/// # Defaults
///
/// - `unknown_element_severity`: `WARNING`
/// - `missing_import_severity`: `WARNING`
/// - `unknown_attribute_severity`: `WARNING`
/// - `unknown_slot_severity`: `WARNING`
/// - `invalid_attribute_value_severity`: `ERROR`
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_warning_severity")]
    pub unknown_element_severity: DiagnosticSeverity,
    #[serde(default = "default_warning_severity")]
    pub missing_import_severity: DiagnosticSeverity,
    #[serde(default = "default_warning_severity")]
    pub unknown_attribute_severity: DiagnosticSeverity,
    #[serde(default = "default_warning_severity")]
    pub unknown_slot_severity: DiagnosticSeverity,
    #[serde(default = "default_error_severity")]
    pub invalid_attribute_value_severity: DiagnosticSeverity,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            unknown_element_severity: default_warning_severity(),
            missing_import_severity: default_warning_severity(),
            unknown_attribute_severity: default_warning_severity(),
            unknown_slot_severity: default_warning_severity(),
            invalid_attribute_value_severity: default_error_severity(),
        }
    }
}

/// Completion-analyzer tuning.
///
/// # Defaults
///
/// - `enabled`: `true`
/// - `standard_elements_override`: `None` (use the built-in list)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CompletionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Replaces the hard-coded standard-HTML-elements short-circuit list
    /// when set, letting a client scope which bare tag names are excluded
    /// from custom-element completion.
    #[serde(default)]
    pub standard_elements_override: Option<Vec<String>>,
}

/// File-watcher and generate-watcher tuning.
///
/// # Defaults
///
/// - `debounce_ms`: `500`
/// - `grace_period_ms`: `2000`
/// - `max_watched_files`: `1000`
/// - `generate_globs`: `["**/*.ts", "**/*.js"]`
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_debounce_ms", rename = "debounceMs")]
    pub debounce_ms: u64,
    #[serde(default = "default_grace_period_ms", rename = "gracePeriodMs")]
    pub grace_period_ms: u64,
    #[serde(default = "default_max_watched_files", rename = "maxWatchedFiles")]
    pub max_watched_files: usize,
    #[serde(default = "default_generate_globs", rename = "generateGlobs")]
    pub generate_globs: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            grace_period_ms: default_grace_period_ms(),
            max_watched_files: default_max_watched_files(),
            generate_globs: default_generate_globs(),
        }
    }
}

/// Manifest-discovery tuning.
///
/// # Defaults
///
/// - `declared_path`: `"custom-elements.json"`
/// - `include_node_modules`: `true`
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_declared_path", rename = "declaredPath")]
    pub declared_path: String,
    #[serde(default = "default_true", rename = "includeNodeModules")]
    pub include_node_modules: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            declared_path: default_declared_path(),
            include_node_modules: true,
        }
    }
}

/// Server-side trace verbosity, independent of the LSP `$/setTrace`
/// notification (which governs what the client asks to *see*; this governs
/// what the server bothers to *compute* for its noisier call sites).
///
/// # Defaults
///
/// - `level`: `"info"`. Accepts the same strings as `RUST_LOG`'s top-level
///   filter: `error`, `warn`, `info`, `debug`, `trace`.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceConfig {
    #[serde(default = "default_trace_level", deserialize_with = "deserialize_trace_level")]
    pub level: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            level: default_trace_level(),
        }
    }
}

const VALID_TRACE_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

fn deserialize_trace_level<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let level = String::deserialize(deserializer)?;
    if VALID_TRACE_LEVELS.contains(&level.as_str()) {
        Ok(level)
    } else {
        tracing::warn!(level, "unrecognized trace level, falling back to 'info'");
        Ok(default_trace_level())
    }
}

const fn default_true() -> bool {
    true
}

#[must_use]
pub const fn default_warning_severity() -> DiagnosticSeverity {
    DiagnosticSeverity::WARNING
}

const fn default_error_severity() -> DiagnosticSeverity {
    DiagnosticSeverity::ERROR
}

const fn default_debounce_ms() -> u64 {
    500
}

const fn default_grace_period_ms() -> u64 {
    2000
}

const fn default_max_watched_files() -> usize {
    1000
}

fn default_generate_globs() -> Vec<String> {
    vec!["**/*.ts".to_string(), "**/*.js".to_string()]
}

fn default_declared_path() -> String {
    "custom-elements.json".to_string()
}

fn default_trace_level() -> String {
    "info".to_string()
}

/// Parses `initializationOptions` into a [`CemConfig`], falling back to
/// defaults (logged at `warn`) on malformed JSON rather than failing
/// `initialize` outright.
#[must_use]
pub fn parse_initialization_options(value: Option<serde_json::Value>) -> CemConfig {
    match value {
        None => CemConfig::default(),
        Some(serde_json::Value::Null) => CemConfig::default(),
        Some(v) => serde_json::from_value(v).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid initializationOptions, using defaults");
            CemConfig::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CemConfig::default();
        assert_eq!(config.watcher.debounce_ms, 500);
        assert_eq!(config.watcher.grace_period_ms, 2000);
        assert_eq!(config.manifest.declared_path, "custom-elements.json");
        assert_eq!(config.diagnostics.missing_import_severity, DiagnosticSeverity::WARNING);
        assert_eq!(
            config.diagnostics.invalid_attribute_value_severity,
            DiagnosticSeverity::ERROR
        );
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: CemConfig = serde_json::from_str("{}").unwrap();
        assert!(config.completion.enabled);
        assert!(config.completion.standard_elements_override.is_none());
    }

    #[test]
    fn test_partial_watcher_override() {
        let config: CemConfig = serde_json::from_str(r#"{"watcher":{"debounceMs":750}}"#).unwrap();
        assert_eq!(config.watcher.debounce_ms, 750);
        assert_eq!(config.watcher.grace_period_ms, 2000);
    }

    #[test]
    fn test_invalid_trace_level_falls_back() {
        let config: CemConfig = serde_json::from_str(r#"{"trace":{"level":"verbose"}}"#).unwrap();
        assert_eq!(config.trace.level, "info");
    }

    #[test]
    fn test_parse_initialization_options_none_returns_default() {
        let config = parse_initialization_options(None);
        assert_eq!(config.watcher.debounce_ms, 500);
    }

    #[test]
    fn test_parse_initialization_options_invalid_falls_back() {
        let value = serde_json::json!({"watcher": "not an object"});
        let config = parse_initialization_options(Some(value));
        assert_eq!(config.watcher.debounce_ms, 500);
    }

    #[test]
    fn test_standard_elements_override_round_trips() {
        let config: CemConfig =
            serde_json::from_str(r#"{"completion":{"standard_elements_override":["div","span"]}}"#).unwrap();
        assert_eq!(
            config.completion.standard_elements_override,
            Some(vec!["div".to_string(), "span".to_string()])
        );
    }
}
