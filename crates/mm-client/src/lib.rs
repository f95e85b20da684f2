//! HTTP side of mm: authenticated requests against a Matrix homeserver.
//!
//! Every authenticated call carries the access token as the `access_token`
//! query parameter rather than an `Authorization` header.

pub mod auth;
pub mod error;
pub mod homeserver;
pub mod http;

pub use auth::{login, normalize_homeserver_url};
pub use error::ClientError;
pub use homeserver::{Homeserver, MatrixClient};
pub use http::{build_http_client, media_download_url};
