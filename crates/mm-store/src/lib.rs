//! On-disk side of mm.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<home_server>/<user_id>/
//!     next_batch                     persisted sync cursor
//!     <display name> -> <room_id>    symlink, best effort
//!     <room_id>/
//!         in                         named pipe, write to send
//!         <sender>/<event_id>        one file per message, mtime = server time
//! ```

pub mod cursor;
pub mod error;
pub mod layout;
pub mod materialize;
pub mod provision;
pub mod render;
pub mod sink;

pub use cursor::CursorFile;
pub use error::StoreError;
pub use layout::AccountLayout;
pub use materialize::{Materialized, Materializer};
pub use provision::{create_pipe, create_room_dir, link_room_name, room_display_name};
pub use render::render;
pub use sink::{ArtifactSink, NullSink, StdoutSink};
