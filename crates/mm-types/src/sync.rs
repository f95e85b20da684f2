use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::events::Event;

/// Body of `GET /_matrix/client/r0/sync`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: Rooms,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rooms {
    /// Joined rooms keyed by room id. Ordered so that processing within a
    /// batch is deterministic.
    #[serde(default)]
    pub join: BTreeMap<String, JoinedRoom>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub state: StateEvents,
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateEvents {
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Timeline slice for one room, oldest event first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_batch: Option<String>,
    /// Set by the server when the slice was capped and older events exist.
    #[serde(default)]
    pub limited: bool,
}

impl Timeline {
    /// Id of the newest event in this slice, skipping events without one.
    pub fn last_event_id(&self) -> Option<&str> {
        self.events
            .iter()
            .rev()
            .map(|e| e.event_id.as_str())
            .find(|id| !id.is_empty())
    }
}
