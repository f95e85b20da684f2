//! Wire types for the subset of the Matrix client-server API that mm speaks.

pub mod api;
pub mod events;
pub mod sync;

pub use api::{ErrorResponse, LoginRequest, LoginResponse, SendResponse};
pub use events::{Event, EventKind, MediaContent, MediaInfo, MessageContent};
pub use sync::{JoinedRoom, Rooms, StateEvents, SyncResponse, Timeline};
