use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::error::StoreError;

/// Name of the outbound pipe inside every room directory.
pub const PIPE_NAME: &str = "in";
/// Name of the persisted cursor file inside the account directory.
pub const CURSOR_NAME: &str = "next_batch";

/// Paths for one logged-in account: `<root>/<home_server>/<user_id>`.
#[derive(Debug, Clone)]
pub struct AccountLayout {
    dir: PathBuf,
}

impl AccountLayout {
    pub fn new(root: &Path, home_server: &str, user_id: &str) -> Result<Self, StoreError> {
        let dir = root.join(component(home_server)?).join(component(user_id)?);
        Ok(Self { dir })
    }

    /// Use an existing account directory as-is.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the account directory (mode 0700) if missing.
    pub async fn ensure(&self) -> Result<(), StoreError> {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&self.dir)
            .await
            .map_err(StoreError::io("create account directory", &self.dir))?;
        info!("Account directory: {}", self.dir.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn room_dir(&self, room_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(component(room_id)?))
    }

    pub fn pipe_path(&self, room_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.room_dir(room_id)?.join(PIPE_NAME))
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.dir.join(CURSOR_NAME)
    }

    /// Room ids that already have a directory on disk.
    pub async fn existing_rooms(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(StoreError::io("list account directory", &self.dir))?;

        let mut rooms = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::io("list account directory", &self.dir))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // file_type() does not follow symlinks, so name links are skipped
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && name.starts_with('!') {
                rooms.push(name);
            }
        }
        rooms.sort();
        Ok(rooms)
    }
}

/// Validate a server-supplied string for use as one path component.
pub fn component(raw: &str) -> Result<&OsStr, StoreError> {
    if raw.is_empty() || raw == "." || raw == ".." || raw.contains('/') || raw.contains('\0') {
        return Err(StoreError::InvalidComponent(raw.to_string()));
    }
    Ok(OsStr::new(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_account_layout() {
        let layout = AccountLayout::new(Path::new("/data/mm"), "example.org", "@bob:example.org").unwrap();
        assert_eq!(layout.dir(), Path::new("/data/mm/example.org/@bob:example.org"));
        assert_eq!(
            layout.pipe_path("!room:example.org").unwrap(),
            Path::new("/data/mm/example.org/@bob:example.org/!room:example.org/in")
        );
        assert_eq!(
            layout.cursor_path(),
            Path::new("/data/mm/example.org/@bob:example.org/next_batch")
        );
    }

    #[test]
    fn traversal_components_are_rejected() {
        for bad in ["", ".", "..", "a/b", "../etc"] {
            assert!(component(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(component("$event:host").is_ok());
    }

    #[tokio::test]
    async fn existing_rooms_lists_only_room_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = AccountLayout::at(tmp.path());
        std::fs::create_dir(tmp.path().join("!a:host")).unwrap();
        std::fs::create_dir(tmp.path().join("!b:host")).unwrap();
        std::fs::create_dir(tmp.path().join("notes")).unwrap();
        std::fs::write(tmp.path().join("next_batch"), "s1").unwrap();
        std::os::unix::fs::symlink("!a:host", tmp.path().join("Lounge")).unwrap();

        let rooms = layout.existing_rooms().await.unwrap();
        assert_eq!(rooms, ["!a:host", "!b:host"]);
    }
}
