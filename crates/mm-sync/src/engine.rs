use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use mm_client::{ClientError, Homeserver};
use mm_store::{
    AccountLayout, CursorFile, Materialized, Materializer, StoreError, create_pipe,
    create_room_dir, link_room_name, room_display_name,
};
use mm_types::{JoinedRoom, SyncResponse};

use crate::registry::PipeRegistry;
use crate::session::Session;
use crate::watcher::PipeWatcher;

/// Long-poll timeout asked of the server.
pub const DEFAULT_LONG_POLL: Duration = Duration::from_secs(30);
/// Fixed pause after a failed sync.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub long_poll: Duration,
    pub retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            long_poll: DEFAULT_LONG_POLL,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("sync response without next_batch")]
    MissingNextBatch,

    #[error("batch not stored: {0}")]
    Store(#[from] StoreError),
}

/// What one processed batch did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub rooms: usize,
    pub new_rooms: usize,
    pub written: usize,
    pub receipts: usize,
}

/// The long-poll loop.
///
/// One iteration: sync → for every joined room provision it (directory,
/// pipe, watcher, name link), materialize its message events, send a read
/// receipt for the last event → advance and persist the cursor. A failed or
/// malformed sync, or a batch that could not be written to disk, leaves the
/// cursor untouched and is retried after a fixed delay, forever.
pub struct SyncEngine<H: Homeserver> {
    homeserver: Arc<H>,
    session: Arc<Session>,
    layout: AccountLayout,
    cursor_file: CursorFile,
    materializer: Materializer,
    registry: PipeRegistry,
    watchers: AtomicUsize,
    config: EngineConfig,
}

impl<H: Homeserver> SyncEngine<H> {
    pub fn new(
        homeserver: Arc<H>,
        session: Arc<Session>,
        layout: AccountLayout,
        materializer: Materializer,
        config: EngineConfig,
    ) -> Self {
        let cursor_file = CursorFile::new(layout.cursor_path());
        Self {
            homeserver,
            session,
            layout,
            cursor_file,
            materializer,
            registry: PipeRegistry::new(),
            watchers: AtomicUsize::new(0),
            config,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Number of pipe watchers started so far.
    pub fn watcher_count(&self) -> usize {
        self.watchers.load(Ordering::Relaxed)
    }

    /// Pick up state from a previous run: the persisted cursor and a watcher
    /// for every room directory already on disk.
    pub async fn resume(&self) -> Result<(), StoreError> {
        match self.cursor_file.load().await {
            Ok(Some(batch)) => {
                info!("Resuming sync from {}", batch);
                self.session.advance(&batch);
            }
            Ok(None) => info!("No saved cursor, starting with an initial sync"),
            Err(e) => warn!("Ignoring unreadable cursor: {}", e),
        }

        for room_id in self.layout.existing_rooms().await? {
            self.start_watcher(&room_id).await;
        }
        Ok(())
    }

    /// Sync forever.
    pub async fn run(&self) {
        loop {
            match self.sync_once().await {
                Ok(report) => debug!(?report, "Batch processed"),
                Err(e) => {
                    warn!("Sync failed: {}; retrying in {:?}", e, self.config.retry_delay);
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    /// One sync request and, on success, one fully processed batch.
    pub async fn sync_once(&self) -> Result<BatchReport, SyncError> {
        let since = self.session.cursor();
        let resp = self
            .homeserver
            .sync(since.as_deref(), self.config.long_poll)
            .await?;

        if resp.next_batch.is_empty() {
            return Err(SyncError::MissingNextBatch);
        }

        let report = self.process_batch(&resp).await?;

        self.session.advance(&resp.next_batch);
        if let Err(e) = self.cursor_file.save(&resp.next_batch).await {
            warn!("Failed to persist cursor: {}", e);
        }
        Ok(report)
    }

    /// Apply every joined room of a batch.
    ///
    /// Store I/O failures abort the batch so the caller keeps the cursor and
    /// the batch is re-delivered. Unusable ids, pipe and link problems and
    /// receipt failures are logged and do not stop the batch.
    pub async fn process_batch(&self, resp: &SyncResponse) -> Result<BatchReport, StoreError> {
        let mut report = BatchReport::default();

        for (room_id, room) in &resp.rooms.join {
            report.rooms += 1;

            let room_dir = match self.layout.room_dir(room_id) {
                Ok(dir) => dir,
                Err(e) => {
                    warn!(room_id = %room_id, "Skipping room: {}", e);
                    continue;
                }
            };

            if self.provision_room(room_id, room, &room_dir).await? {
                report.new_rooms += 1;
            }

            report.written += self.materialize_timeline(room_id, room, &room_dir).await?;

            if let Some(event_id) = room.timeline.last_event_id() {
                match self.homeserver.send_receipt(room_id, event_id).await {
                    Ok(()) => report.receipts += 1,
                    Err(e) => warn!(room_id = %room_id, event_id, "Read receipt failed: {}", e),
                }
            }
        }

        Ok(report)
    }

    /// Make sure the room has a directory, a pipe and a watcher. The name
    /// link is only attempted when the directory is new. Returns whether
    /// the directory was created.
    async fn provision_room(
        &self,
        room_id: &str,
        room: &JoinedRoom,
        room_dir: &Path,
    ) -> Result<bool, StoreError> {
        let created = create_room_dir(room_dir).await?;
        self.start_watcher(room_id).await;

        if created {
            let name = room_display_name(
                &room.state.events,
                &room.timeline.events,
                self.session.user_id(),
            );
            if let Some(name) = name {
                if let Err(e) = link_room_name(self.layout.dir(), name, room_id).await {
                    warn!(room_id, "Could not link room name {:?}: {}", name, e);
                }
            }
        }
        Ok(created)
    }

    /// Start the room's watcher unless one was already claimed. If the pipe
    /// cannot be created the claim stays, leaving the room without an
    /// outbound path for the rest of the run.
    async fn start_watcher(&self, room_id: &str) -> bool {
        let pipe = match self.layout.pipe_path(room_id) {
            Ok(pipe) => pipe,
            Err(e) => {
                warn!(room_id, "No outbound pipe: {}", e);
                return false;
            }
        };
        if !self.registry.claim(&pipe) {
            return false;
        }

        if let Err(e) = create_pipe(&pipe).await {
            warn!(room_id, "Outbound disabled for this room: {}", e);
            return false;
        }

        PipeWatcher::new(
            self.homeserver.clone(),
            self.session.clone(),
            room_id.to_string(),
            pipe,
        )
        .spawn();
        self.watchers.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Write the room's message events. Events whose ids cannot name a file
    /// are skipped; any I/O failure is returned.
    async fn materialize_timeline(
        &self,
        room_id: &str,
        room: &JoinedRoom,
        room_dir: &Path,
    ) -> Result<usize, StoreError> {
        let mut written = 0;
        for event in &room.timeline.events {
            match self.materializer.materialize(event, room_dir).await {
                Ok(Materialized::Written(_)) => written += 1,
                Ok(Materialized::AlreadyPresent(path)) => {
                    debug!(room_id, "Already have {}", path.display());
                }
                Ok(Materialized::Skipped) => {}
                Err(e @ StoreError::InvalidComponent(_)) => {
                    warn!(room_id, event_id = %event.event_id, "Not materialized: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }
}
