use std::io::Write;
use std::path::Path;

use tracing::warn;

/// Receives the path of every newly written message artifact.
///
/// Printing these paths on stdout is mm's integration point for shell
/// tooling (file-watcher chat frontends, `xargs cat`, ...).
pub trait ArtifactSink: Send + Sync {
    fn artifact_written(&self, path: &Path);
}

/// Prints one path per line on standard output.
pub struct StdoutSink;

impl ArtifactSink for StdoutSink {
    fn artifact_written(&self, path: &Path) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", path.display()).and_then(|_| out.flush()) {
            warn!("Failed to print artifact path {}: {}", path.display(), e);
        }
    }
}

/// Discards notifications.
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn artifact_written(&self, _path: &Path) {}
}
