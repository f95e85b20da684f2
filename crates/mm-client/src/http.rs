use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use url::Url;

use mm_types::ErrorResponse;

use crate::error::ClientError;

const CLIENT_API: [&str; 3] = ["_matrix", "client", "r0"];
const MEDIA_API: [&str; 4] = ["_matrix", "media", "r0", "download"];

/// Build the shared HTTP client.
///
/// `request_timeout` must exceed the long-poll timeout handed to the server,
/// otherwise every quiet sync would end in a client-side timeout. An extra
/// PEM root (self-signed homeservers) is added when `certificate` is set; a
/// certificate that cannot be read or parsed is logged and skipped.
pub fn build_http_client(
    certificate: Option<&Path>,
    request_timeout: Duration,
) -> Result<Client, ClientError> {
    let builder = || {
        Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("mm/", env!("CARGO_PKG_VERSION")))
    };

    if let Some(path) = certificate {
        if let Some(cert) = load_certificate(path) {
            // rustls only parses the PEM at build time
            match builder().add_root_certificate(cert).build() {
                Ok(client) => {
                    info!("Trusting extra root certificate {}", path.display());
                    return Ok(client);
                }
                Err(e) => warn!("Failed to parse certificate {}: {}", path.display(), e),
            }
        }
    }

    Ok(builder().build()?)
}

fn load_certificate(path: &Path) -> Option<reqwest::Certificate> {
    let pem = std::fs::read(path)
        .map_err(|e| warn!("Failed to read certificate {}: {}", path.display(), e))
        .ok()?;
    reqwest::Certificate::from_pem(&pem)
        .map_err(|e| warn!("Failed to parse certificate {}: {}", path.display(), e))
        .ok()
}

/// `{base}/_matrix/client/r0/{segments...}`, each segment percent-encoded.
pub fn client_endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(CLIENT_API).extend(segments);
    }
    url
}

/// Set the `access_token` query parameter, replacing any previous value.
pub fn authenticate(mut url: Url, access_token: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "access_token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("access_token", access_token);
    url
}

/// Sync endpoint. The initial sync omits both `since` and `timeout`.
pub fn sync_url(base: &Url, since: Option<&str>, timeout: Duration) -> Url {
    let mut url = client_endpoint(base, &["sync"]);
    if let Some(since) = since.filter(|s| !s.is_empty()) {
        url.query_pairs_mut()
            .append_pair("since", since)
            .append_pair("timeout", &timeout.as_millis().to_string());
    }
    url
}

pub fn send_message_url(base: &Url, room_id: &str, txn_id: &str) -> Url {
    client_endpoint(base, &["rooms", room_id, "send", "m.room.message", txn_id])
}

pub fn receipt_url(base: &Url, room_id: &str, event_id: &str) -> Url {
    client_endpoint(base, &["rooms", room_id, "receipt", "m.read", event_id])
}

/// Plain HTTP download link for an `mxc://server/media-id` URI. Anything
/// that is not an mxc URI is appended as-is.
pub fn media_download_url(base: &Url, mxc: &str) -> String {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(MEDIA_API);
    }
    let media = mxc.strip_prefix("mxc://").unwrap_or(mxc);
    format!("{}/{}", url.as_str().trim_end_matches('/'), media)
}

/// Turn a non-success response into [`ClientError::Status`], keeping the
/// homeserver's `errcode`/`error` when the body carries them.
pub async fn check_status(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.bytes().await.unwrap_or_default();
    let err: ErrorResponse = serde_json::from_slice(&body).unwrap_or_default();
    Err(ClientError::Status {
        status,
        errcode: err.errcode,
        message: err.error,
    })
}

/// Check the status and decode a JSON body.
///
/// The body is read fully before decoding so a truncated or malformed
/// payload surfaces as [`ClientError::Decode`], not as a transport error.
pub async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let resp = check_status(resp).await?;
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
