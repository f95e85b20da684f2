#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use url::Url;

use mm_client::{ClientError, Homeserver};
use mm_store::{AccountLayout, ArtifactSink, Materializer};
use mm_sync::{EngineConfig, Session, SyncEngine};
use mm_types::{LoginResponse, SyncResponse};

pub const USER: &str = "@bob:example.org";

/// In-memory homeserver: sync results are served from a queue, everything
/// else is recorded. Sends and receipts succeed unless failures were armed
/// with `fail_next_sends` / `fail_next_receipts`.
#[derive(Default)]
pub struct FakeHomeserver {
    base: Option<Url>,
    batches: Mutex<VecDeque<Result<SyncResponse, ClientError>>>,
    pub syncs: Mutex<Vec<Option<String>>>,
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub receipts: Mutex<Vec<(String, String)>>,
    pub logouts: Mutex<usize>,
    send_attempts: Mutex<usize>,
    send_failures: Mutex<usize>,
    receipt_failures: Mutex<usize>,
}

impl FakeHomeserver {
    pub fn new() -> Self {
        Self {
            base: Some(Url::parse("https://example.org").unwrap()),
            ..Default::default()
        }
    }

    pub fn push(&self, resp: Result<SyncResponse, ClientError>) {
        self.batches.lock().unwrap().push_back(resp);
    }

    pub fn push_batch(&self, body: Value) {
        self.push(Ok(serde_json::from_value(body).unwrap()));
    }

    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn receipts(&self) -> Vec<(String, String)> {
        self.receipts.lock().unwrap().clone()
    }

    pub fn syncs(&self) -> Vec<Option<String>> {
        self.syncs.lock().unwrap().clone()
    }

    /// Sends attempted so far, failed ones included.
    pub fn send_attempts(&self) -> usize {
        *self.send_attempts.lock().unwrap()
    }

    pub fn fail_next_sends(&self, n: usize) {
        *self.send_failures.lock().unwrap() = n;
    }

    pub fn fail_next_receipts(&self, n: usize) {
        *self.receipt_failures.lock().unwrap() = n;
    }
}

/// Consume one armed failure, if any.
fn take_failure(armed: &Mutex<usize>) -> bool {
    let mut left = armed.lock().unwrap();
    if *left == 0 {
        return false;
    }
    *left -= 1;
    true
}

#[async_trait]
impl Homeserver for FakeHomeserver {
    fn base_url(&self) -> &Url {
        self.base.as_ref().unwrap()
    }

    async fn sync(
        &self,
        since: Option<&str>,
        _timeout: Duration,
    ) -> Result<SyncResponse, ClientError> {
        self.syncs.lock().unwrap().push(since.map(str::to_string));
        let next = self.batches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(decode_error()))
    }

    async fn send_text(
        &self,
        room_id: &str,
        txn_id: &str,
        body: &str,
    ) -> Result<String, ClientError> {
        *self.send_attempts.lock().unwrap() += 1;
        if take_failure(&self.send_failures) {
            return Err(server_error());
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((room_id.into(), txn_id.into(), body.into()));
        Ok(format!("$sent{}", sent.len()))
    }

    async fn send_receipt(&self, room_id: &str, event_id: &str) -> Result<(), ClientError> {
        if take_failure(&self.receipt_failures) {
            return Err(server_error());
        }
        self.receipts
            .lock()
            .unwrap()
            .push((room_id.into(), event_id.into()));
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        *self.logouts.lock().unwrap() += 1;
        Ok(())
    }
}

/// What a truncated or non-JSON sync body turns into.
pub fn decode_error() -> ClientError {
    serde_json::from_str::<SyncResponse>("{\"next_batch\": ").unwrap_err().into()
}

pub fn server_error() -> ClientError {
    ClientError::Status {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        errcode: "M_UNKNOWN".into(),
        message: "try again".into(),
    }
}

/// Collects printed artifact paths.
#[derive(Default)]
pub struct RecordingSink {
    pub paths: Mutex<Vec<PathBuf>>,
}

impl RecordingSink {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

impl ArtifactSink for RecordingSink {
    fn artifact_written(&self, path: &Path) {
        self.paths.lock().unwrap().push(path.to_path_buf());
    }
}

pub struct Harness {
    pub tmp: tempfile::TempDir,
    pub homeserver: Arc<FakeHomeserver>,
    pub sink: Arc<RecordingSink>,
    pub engine: SyncEngine<FakeHomeserver>,
}

impl Harness {
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        Self::in_dir(tmp).await
    }

    /// A fresh engine over an existing storage directory, as after a restart.
    pub async fn in_dir(tmp: tempfile::TempDir) -> Self {
        let homeserver = Arc::new(FakeHomeserver::new());
        let sink = Arc::new(RecordingSink::default());

        let layout = AccountLayout::new(tmp.path(), "example.org", USER).unwrap();
        layout.ensure().await.unwrap();

        let login = LoginResponse {
            access_token: "secret".into(),
            user_id: USER.into(),
            home_server: Some("example.org".into()),
            device_id: Some("TESTDEV".into()),
        };
        let session = Arc::new(Session::new(&login));
        let materializer = Materializer::new(homeserver.base_url().clone(), sink.clone());
        let config = EngineConfig {
            long_poll: Duration::from_millis(10),
            retry_delay: Duration::from_millis(10),
        };

        let engine = SyncEngine::new(homeserver.clone(), session, layout, materializer, config);
        Self {
            tmp,
            homeserver,
            sink,
            engine,
        }
    }

    pub fn account_dir(&self) -> PathBuf {
        self.tmp.path().join("example.org").join(USER)
    }

    pub fn room_dir(&self, room_id: &str) -> PathBuf {
        self.account_dir().join(room_id)
    }
}

pub fn text_event(event_id: &str, sender: &str, ts: i64, body: &str) -> Value {
    json!({
        "type": "m.room.message",
        "event_id": event_id,
        "sender": sender,
        "origin_server_ts": ts,
        "content": {"msgtype": "m.text", "body": body}
    })
}

pub fn name_event(name: &str) -> Value {
    json!({
        "type": "m.room.name",
        "event_id": "$name",
        "sender": "@alice:example.org",
        "state_key": "",
        "content": {"name": name}
    })
}

pub fn batch(next_batch: &str, rooms: Vec<(&str, Vec<Value>, Vec<Value>)>) -> Value {
    let join: serde_json::Map<String, Value> = rooms
        .into_iter()
        .map(|(id, state, timeline)| {
            (
                id.to_string(),
                json!({"state": {"events": state}, "timeline": {"events": timeline}}),
            )
        })
        .collect();
    json!({"next_batch": next_batch, "rooms": {"join": join}})
}
