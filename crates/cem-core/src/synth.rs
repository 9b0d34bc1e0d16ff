//! The external manifest-synthesis collaborator contract.
//!
//! When a workspace declares a CEM file that doesn't exist on disk, the
//! server asks a [`ManifestSynthesizer`] to either hand back an in-memory
//! manifest or generate a fresh one by scanning source. The default
//! [`NullSynthesizer`] always reports no manifest available, keeping the
//! server fully functional (and testable) with no external producer wired
//! in.

use crate::manifest::Package;
use std::path::Path;

/// Context passed to a synthesizer describing the workspace being scanned.
#[derive(Debug, Clone)]
pub struct SynthesisContext {
    pub workspace_root: std::path::PathBuf,
}

/// A long-lived synthesis session for one workspace.
pub trait SynthesisSession: Send + Sync {
    /// Returns an already-computed in-memory manifest, if one exists,
    /// without triggering a fresh scan.
    fn in_memory_manifest(&self) -> Option<Package>;

    /// Performs a full scan of the workspace and returns the resulting
    /// manifest.
    fn generate_full(&self, ctx: &SynthesisContext) -> crate::error::Result<Package>;
}

/// Producer of [`SynthesisSession`]s, one per workspace root.
pub trait ManifestSynthesizer: Send + Sync {
    fn new_session(&self, workspace_root: &Path) -> Box<dyn SynthesisSession>;
}

/// Default synthesizer used when no external manifest-generation pipeline
/// is configured. Every session reports no manifest available, so the
/// server degrades to "no custom elements known" rather than failing.
#[derive(Debug, Default)]
pub struct NullSynthesizer;

impl ManifestSynthesizer for NullSynthesizer {
    fn new_session(&self, _workspace_root: &Path) -> Box<dyn SynthesisSession> {
        Box::new(NullSession)
    }
}

struct NullSession;

impl SynthesisSession for NullSession {
    fn in_memory_manifest(&self) -> Option<Package> {
        None
    }

    fn generate_full(&self, _ctx: &SynthesisContext) -> crate::error::Result<Package> {
        Err(crate::error::CemError::Synthesis(
            "no manifest synthesis producer configured".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_synthesizer_has_no_in_memory_manifest() {
        let synth = NullSynthesizer;
        let session = synth.new_session(Path::new("/workspace"));
        assert!(session.in_memory_manifest().is_none());
    }

    #[test]
    fn null_synthesizer_generate_full_errors() {
        let synth = NullSynthesizer;
        let session = synth.new_session(Path::new("/workspace"));
        let ctx = SynthesisContext {
            workspace_root: std::path::PathBuf::from("/workspace"),
        };
        assert!(session.generate_full(&ctx).is_err());
    }
}
