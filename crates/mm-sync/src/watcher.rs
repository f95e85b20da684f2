use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mm_client::Homeserver;
use mm_store::create_pipe;

use crate::sender::send_message;
use crate::session::Session;

/// Pause after a pipe error that would otherwise fail again immediately
/// (permissions, pipe replaced by a regular file, ...).
const ERROR_PAUSE: Duration = Duration::from_secs(1);

/// Outbound worker for one room.
///
/// Each open of the pipe yields one message: everything written until the
/// last writer closes it. Writers must therefore open, write and close per
/// message; two writes under one open are sent as one message.
pub struct PipeWatcher<H: Homeserver> {
    homeserver: Arc<H>,
    session: Arc<Session>,
    room_id: String,
    pipe: PathBuf,
}

impl<H: Homeserver> PipeWatcher<H> {
    pub fn new(homeserver: Arc<H>, session: Arc<Session>, room_id: String, pipe: PathBuf) -> Self {
        Self {
            homeserver,
            session,
            room_id,
            pipe,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the process exits. Errors are logged, never returned.
    pub async fn run(self) {
        info!(room_id = %self.room_id, "Watching {}", self.pipe.display());

        loop {
            match self.read_message().await {
                Ok(Some(text)) => {
                    debug!(room_id = %self.room_id, "Read {} bytes from pipe", text.len());
                    let _ = send_message(&*self.homeserver, &self.session, &self.room_id, &text).await;
                }
                Ok(None) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(room_id = %self.room_id, "Pipe {} vanished, recreating", self.pipe.display());
                    if let Err(e) = create_pipe(&self.pipe).await {
                        warn!(room_id = %self.room_id, "{}", e);
                        tokio::time::sleep(ERROR_PAUSE).await;
                    }
                }
                Err(e) => {
                    warn!(room_id = %self.room_id, "Could not read {}: {}", self.pipe.display(), e);
                    tokio::time::sleep(ERROR_PAUSE).await;
                }
            }
        }
    }

    async fn read_message(&self) -> std::io::Result<Option<String>> {
        let mut rx = pipe::OpenOptions::new().open_receiver(&self.pipe)?;
        let mut buf = Vec::new();
        rx.read_to_end(&mut buf).await?;
        Ok(message_text(&buf))
    }
}

/// Message body for one pipe read: lossy UTF-8 with a single trailing
/// newline removed. `None` for an empty read.
pub fn message_text(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    (!text.is_empty()).then(|| text.to_string())
}
