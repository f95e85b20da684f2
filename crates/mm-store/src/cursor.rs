use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;

/// The persisted `next_batch` token.
///
/// Written to a sibling temp file and renamed into place, so a crash leaves
/// either the old or the new cursor, never a truncated one.
#[derive(Debug, Clone)]
pub struct CursorFile {
    path: PathBuf,
}

impl CursorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Stored cursor, or `None` when there is none yet.
    pub async fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => {
                let token = s.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io("read cursor", &self.path)(e)),
        }
    }

    pub async fn save(&self, batch: &str) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)
            .await
            .map_err(StoreError::io("write cursor", &tmp))?;
        file.write_all(batch.as_bytes())
            .await
            .map_err(StoreError::io("write cursor", &tmp))?;
        file.sync_all()
            .await
            .map_err(StoreError::io("write cursor", &tmp))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .await
            .map_err(StoreError::io("replace cursor", &self.path))
    }
}
