use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Pipes that already have a watcher (or whose watcher could not be
/// started and stays disabled).
///
/// `claim` is an atomic check-and-insert, so a room that shows up in two
/// batches, or at startup and again in the first sync, gets exactly one
/// watcher. The lock is never held across I/O.
#[derive(Default)]
pub struct PipeRegistry {
    pipes: Mutex<HashSet<PathBuf>>,
}

impl PipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first caller only.
    pub fn claim(&self, pipe: &Path) -> bool {
        self.pipes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pipe.to_path_buf())
    }
}
