use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use mm_types::Event;

use crate::error::StoreError;
use crate::layout::component;
use crate::render::render;
use crate::sink::ArtifactSink;

/// Outcome of [`Materializer::materialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    /// A new artifact was written.
    Written(PathBuf),
    /// The artifact already existed and was left untouched.
    AlreadyPresent(PathBuf),
    /// The event is not a renderable message.
    Skipped,
}

/// Writes message events as files: `<room_dir>/<sender>/<event_id>`.
///
/// The artifact path is the idempotence key. A file is created with
/// `create_new`, so an event re-delivered after a crash or a replayed batch
/// never rewrites an existing artifact.
pub struct Materializer {
    homeserver: Url,
    sink: Arc<dyn ArtifactSink>,
}

impl Materializer {
    pub fn new(homeserver: Url, sink: Arc<dyn ArtifactSink>) -> Self {
        Self { homeserver, sink }
    }

    pub fn artifact_path(room_dir: &Path, event: &Event) -> Result<PathBuf, StoreError> {
        Ok(room_dir
            .join(component(&event.sender)?)
            .join(component(&event.event_id)?))
    }

    pub async fn materialize(&self, event: &Event, room_dir: &Path) -> Result<Materialized, StoreError> {
        let Some(content) = event.message() else {
            return Ok(Materialized::Skipped);
        };

        let path = Self::artifact_path(room_dir, event)?;
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Materialized::AlreadyPresent(path));
        }

        let Some(text) = render(&content, &self.homeserver) else {
            debug!("Not materializing {} ({:?})", event.event_id, content);
            return Ok(Materialized::Skipped);
        };

        if let Some(sender_dir) = path.parent() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(sender_dir)
                .await
                .map_err(StoreError::io("create sender directory", sender_dir))?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(Materialized::AlreadyPresent(path));
            }
            Err(e) => return Err(StoreError::io("create artifact", &path)(e)),
        };

        let written = async {
            file.write_all(text.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            // a partial artifact would otherwise block every later attempt
            let _ = fs::remove_file(&path).await;
            return Err(StoreError::io("write artifact", &path)(e));
        }

        let stamp = FileTime::from_unix_time(event.timestamp.div_euclid(1000), 0);
        if let Err(e) = filetime::set_file_times(&path, stamp, stamp) {
            warn!("Failed to set mtime on {}: {}", path.display(), e);
        }

        self.sink.artifact_written(&path);
        Ok(Materialized::Written(path))
    }
}
