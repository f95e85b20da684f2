//! The sync-and-materialize loop and the per-room outbound pipe watchers.

pub mod engine;
pub mod registry;
pub mod sender;
pub mod session;
pub mod watcher;

pub use engine::{BatchReport, EngineConfig, SyncEngine, SyncError};
pub use registry::PipeRegistry;
pub use sender::send_message;
pub use session::Session;
pub use watcher::PipeWatcher;
