use thiserror::Error;

/// Crate-wide error type for `cem-core`.
///
/// Feature handlers never propagate these to the LSP client as protocol
/// errors; they log and degrade to an empty/default response instead. See
/// the error-handling design for the taxonomy this maps to.
///
/// # Examples
///
/// ```
/// use cem_core::error::{CemError, Result};
///
/// fn load(content: &str) -> Result<()> {
///     if content.is_empty() {
///         return Err(CemError::Synthesis("empty manifest source".into()));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum CemError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("failed to load tree-sitter grammar: {0}")]
    TreeSitterLanguage(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("watcher error: {0}")]
    Watcher(String),

    #[error("manifest synthesis failed: {0}")]
    Synthesis(String),

    #[error("no manifest found at {0}")]
    ManifestNotFound(String),
}

/// Convenience alias for `Result<T, CemError>` used throughout `cem-core`.
///
/// # Examples
///
/// ```
/// use cem_core::error::Result;
///
/// fn tag_name() -> Result<String> {
///     Ok("my-element".into())
/// }
/// ```
pub type Result<T> = std::result::Result<T, CemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_synthesis() {
        let error = CemError::Synthesis("no producer configured".into());
        assert_eq!(
            error.to_string(),
            "manifest synthesis failed: no producer configured"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: CemError = io_err.into();
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: CemError = json_err.into();
        assert!(error.to_string().contains("JSON error"));
    }

    #[test]
    fn test_manifest_not_found() {
        let error = CemError::ManifestNotFound("custom-elements.json".into());
        assert_eq!(
            error.to_string(),
            "no manifest found at custom-elements.json"
        );
    }

    #[test]
    fn test_invalid_uri() {
        let error = CemError::InvalidUri("not a uri".into());
        assert_eq!(error.to_string(), "invalid URI: not a uri");
    }
}
