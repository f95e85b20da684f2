use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use mm_types::{MessageContent, SendResponse, SyncResponse};

use crate::error::ClientError;
use crate::http::{
    authenticate, check_status, client_endpoint, read_json, receipt_url, send_message_url,
    sync_url,
};

/// Authenticated operations the sync engine and pipe watchers need from a
/// homeserver. [`MatrixClient`] talks HTTP; tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait Homeserver: Send + Sync + 'static {
    /// Homeserver base URL.
    fn base_url(&self) -> &Url;

    /// One sync request. `since = None` performs the initial sync.
    async fn sync(&self, since: Option<&str>, timeout: Duration)
    -> Result<SyncResponse, ClientError>;

    /// Send a plain-text message. Returns the new event id.
    async fn send_text(&self, room_id: &str, txn_id: &str, body: &str)
    -> Result<String, ClientError>;

    /// Mark `event_id` as read in `room_id`.
    async fn send_receipt(&self, room_id: &str, event_id: &str) -> Result<(), ClientError>;

    /// Revoke the access token.
    async fn logout(&self) -> Result<(), ClientError>;
}

/// HTTP implementation of [`Homeserver`] for one logged-in session.
#[derive(Clone)]
pub struct MatrixClient {
    http: Client,
    base: Url,
    access_token: String,
}

impl MatrixClient {
    pub fn new(http: Client, base: Url, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base,
            access_token: access_token.into(),
        }
    }

    fn authed(&self, url: Url) -> Url {
        authenticate(url, &self.access_token)
    }
}

#[async_trait]
impl Homeserver for MatrixClient {
    fn base_url(&self) -> &Url {
        &self.base
    }

    async fn sync(
        &self,
        since: Option<&str>,
        timeout: Duration,
    ) -> Result<SyncResponse, ClientError> {
        let url = sync_url(&self.base, since, timeout);
        debug!("GET {} since={:?}", url.path(), since);

        let resp = self.http.get(self.authed(url)).send().await?;
        read_json(resp).await
    }

    async fn send_text(
        &self,
        room_id: &str,
        txn_id: &str,
        body: &str,
    ) -> Result<String, ClientError> {
        let url = send_message_url(&self.base, room_id, txn_id);
        debug!("PUT {}", url.path());

        let resp = self
            .http
            .put(self.authed(url))
            .json(&MessageContent::text(body))
            .send()
            .await?;
        let sent: SendResponse = read_json(resp).await?;
        Ok(sent.event_id)
    }

    async fn send_receipt(&self, room_id: &str, event_id: &str) -> Result<(), ClientError> {
        let url = receipt_url(&self.base, room_id, event_id);
        debug!("POST {}", url.path());

        let resp = self
            .http
            .post(self.authed(url))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let url = client_endpoint(&self.base, &["logout"]);
        debug!("POST {}", url.path());

        let resp = self
            .http
            .post(self.authed(url))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
