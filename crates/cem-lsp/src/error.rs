use thiserror::Error;

/// Error types for the `cem-lsp` server process.
///
/// Feature handlers generally recover from these internally (log a warning,
/// return an empty/default LSP response) rather than letting them surface
/// as a JSON-RPC error; this type exists for the small number of call sites
/// — configuration parsing, transport setup — where propagating up to
/// `main` is the right behavior.
///
/// # Examples
///
/// ```
/// use cem_lsp::error::{LspError, Result};
///
/// fn bind(port: u16) -> Result<()> {
///     if port == 0 {
///         return Err(LspError::Transport("port 0 is not bindable".into()));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum LspError {
    #[error("core error: {0}")]
    Core(#[from] cem_core::error::CemError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid initialization options: {0}")]
    InvalidConfig(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Convenience alias for `Result<T, LspError>`.
///
/// # Examples
///
/// ```
/// use cem_lsp::error::Result;
///
/// fn server_name() -> Result<String> {
///     Ok("cem-lsp".into())
/// }
/// ```
pub type Result<T> = std::result::Result<T, LspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let error = LspError::InvalidConfig("bad json".into());
        assert_eq!(error.to_string(), "invalid initialization options: bad json");
    }

    #[test]
    fn test_transport_display() {
        let error = LspError::Transport("address in use".into());
        assert_eq!(error.to_string(), "transport error: address in use");
    }

    #[test]
    fn test_core_error_conversion() {
        let core_err = cem_core::error::CemError::ManifestNotFound("x.json".into());
        let error: LspError = core_err.into();
        assert!(error.to_string().contains("core error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: LspError = io_err.into();
        assert!(error.to_string().contains("I/O error"));
    }
}
