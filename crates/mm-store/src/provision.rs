use std::io::ErrorKind;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::stat::Mode;
use tokio::fs;
use tracing::{debug, info};

use mm_types::Event;

use crate::error::StoreError;
use crate::layout::component;

/// Create a room directory. Returns `true` if it did not exist before.
pub async fn create_room_dir(room_dir: &Path) -> Result<bool, StoreError> {
    match fs::DirBuilder::new().mode(0o700).create(room_dir).await {
        Ok(()) => {
            info!("New room directory {}", room_dir.display());
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StoreError::io("create room directory", room_dir)(e)),
    }
}

/// Create the outbound named pipe (mode 0600). Returns `true` if a new pipe
/// was made, `false` if one is already there. Anything else occupying the
/// path is an error.
pub async fn create_pipe(path: &Path) -> Result<bool, StoreError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || mkfifo(&owned))
        .await
        .map_err(|e| StoreError::io("create pipe", path)(std::io::Error::other(e)))?
}

fn mkfifo(path: &Path) -> Result<bool, StoreError> {
    match nix::unistd::mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR) {
        Ok(()) => {
            debug!("Created pipe {}", path.display());
            Ok(true)
        }
        Err(Errno::EEXIST) if is_fifo(path) => Ok(false),
        Err(errno) => Err(StoreError::io("create pipe", path)(errno.into())),
    }
}

fn is_fifo(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_fifo())
        .unwrap_or(false)
}

/// Human-readable name for a room: the first `m.room.name` event, else the
/// first member other than ourselves. State events are searched before the
/// timeline.
pub fn room_display_name<'a>(
    state: &'a [Event],
    timeline: &'a [Event],
    own_user_id: &str,
) -> Option<&'a str> {
    let events = || state.iter().chain(timeline);
    events()
        .find_map(Event::room_name)
        .or_else(|| events().find_map(|e| e.member_name(own_user_id)))
}

/// Symlink `<account_dir>/<name>` to the room directory (relative target).
/// Returns the link path, or `None` if the name is unusable or a link/file
/// with that name already exists.
pub async fn link_room_name(
    account_dir: &Path,
    name: &str,
    room_id: &str,
) -> Result<Option<PathBuf>, StoreError> {
    let name = name.trim().replace('/', "_");
    if component(&name).is_err() || name.starts_with('!') {
        debug!("Unusable room name {:?} for {}", name, room_id);
        return Ok(None);
    }

    let link = account_dir.join(&name);
    match fs::symlink(component(room_id)?, &link).await {
        Ok(()) => {
            info!("Linked {} -> {}", link.display(), room_id);
            Ok(Some(link))
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(StoreError::io("link room name", link)(e)),
    }
}
