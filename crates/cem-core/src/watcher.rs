//! File watcher (manifest + `package.json` paths) and debounced generate
//! watcher (source files feeding manifest regeneration), built on `notify`.

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Debounce window for the generate watcher: rapid successive file changes
/// collapse into a single regeneration.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Grace period before the generate watcher starts reacting to events, to
/// ride out the burst of changes that often accompanies initial checkout or
/// editor startup.
const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Refuse to start the generate watcher above this many matched files.
const MAX_WATCHED_FILES: usize = 1000;

/// A running watcher. Dropping the handle stops the watcher; `stop` is also
/// callable directly and is idempotent.
pub struct WatcherHandle {
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Stops the watcher and waits for its worker task to finish. Safe to
    /// call more than once; the second call is a no-op.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Starts a watcher over `paths` that invokes `on_change` (a callback
/// producing no return value beyond triggering the caller's own reload
/// logic) whenever any of them is written or created.
pub fn start_file_watcher<F>(paths: Vec<PathBuf>, on_change: F) -> Result<WatcherHandle, crate::error::CemError>
where
    F: Fn() + Send + Sync + 'static,
{
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        let _ = event_tx.send(res);
    })
    .map_err(|e| crate::error::CemError::Watcher(e.to_string()))?;

    for path in &paths {
        if let Some(parent) = path.parent() {
            if let Err(e) = watcher.watch(parent, RecursiveMode::NonRecursive) {
                warn!(path = %parent.display(), error = %e, "failed to watch manifest parent directory");
            }
        }
    }

    let watched: std::collections::HashSet<PathBuf> = paths.into_iter().collect();
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

    let worker = tokio::spawn(async move {
        let _watcher = watcher;
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("file watcher shutting down");
                    break;
                }
                event = event_rx.recv() => {
                    match event {
                        Some(Ok(event)) => {
                            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                                && event.paths.iter().any(|p| watched.contains(p))
                            {
                                on_change();
                            }
                        }
                        Some(Err(e)) => warn!(error = %e, "file watcher error"),
                        None => break,
                    }
                }
            }
        }
    });

    Ok(WatcherHandle {
        shutdown: Some(shutdown_tx),
        worker: Some(worker),
    })
}

/// Starts the generate watcher: watches source files matched by `globs`
/// under `root`, debouncing 500ms before invoking `on_regenerate`. Refuses
/// to start if more than [`MAX_WATCHED_FILES`] files would be watched.
/// Waits [`GRACE_PERIOD`] before the first event is acted on.
pub fn start_generate_watcher<F>(
    root: &Path,
    globs: &[String],
    on_regenerate: Arc<F>,
) -> Result<WatcherHandle, crate::error::CemError>
where
    F: Fn() + Send + Sync + 'static,
{
    let matched_files = crate::manifest_loader::expand_source_files(root, globs).unwrap_or_default();
    if matched_files.len() > MAX_WATCHED_FILES {
        return Err(crate::error::CemError::Watcher(format!(
            "refusing to watch {} files, exceeds limit of {MAX_WATCHED_FILES}",
            matched_files.len()
        )));
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        let _ = event_tx.send(res);
    })
    .map_err(|e| crate::error::CemError::Watcher(e.to_string()))?;

    if let Err(e) = watcher.watch(root, RecursiveMode::Recursive) {
        warn!(root = %root.display(), error = %e, "failed to watch workspace root for regeneration");
    }

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

    let worker = tokio::spawn(async move {
        let _watcher = watcher;
        tokio::time::sleep(GRACE_PERIOD).await;

        let mut pending = false;
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("generate watcher shutting down");
                    break;
                }
                event = event_rx.recv() => {
                    match event {
                        Some(Ok(_)) => {
                            pending = true;
                        }
                        Some(Err(e)) => warn!(error = %e, "generate watcher error"),
                        None => break,
                    }
                }
                () = tokio::time::sleep(DEBOUNCE), if pending => {
                    pending = false;
                    on_regenerate();
                }
            }
        }
    });

    Ok(WatcherHandle {
        shutdown: Some(shutdown_tx),
        worker: Some(worker),
    })
}
