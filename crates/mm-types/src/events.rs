use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single room event, from either the state or the timeline section of a
/// sync response.
///
/// `content` is kept as raw JSON so that one odd event (redacted, custom
/// type, missing `msgtype`) can never fail the parse of a whole sync batch.
/// Typed views are available through [`Event::message`], [`Event::room_name`]
/// and [`Event::member_name`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "origin_server_ts", default)]
    pub timestamp: i64,
    #[serde(default)]
    pub event_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(default)]
    pub content: Value,
}

impl Event {
    /// Typed message content, or `None` if this is not an `m.room.message`.
    /// Malformed message content maps to [`MessageContent::Unknown`].
    pub fn message(&self) -> Option<MessageContent> {
        if self.kind != EventKind::Message {
            return None;
        }
        Some(serde_json::from_value(self.content.clone()).unwrap_or(MessageContent::Unknown))
    }

    /// The room name carried by an `m.room.name` event.
    pub fn room_name(&self) -> Option<&str> {
        if self.kind != EventKind::RoomName {
            return None;
        }
        self.content
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Display name (or user id) of the member an `m.room.member` event is
    /// about, unless that member is `own_user_id`.
    pub fn member_name(&self, own_user_id: &str) -> Option<&str> {
        if self.kind != EventKind::RoomMember {
            return None;
        }
        let subject = self.state_key.as_deref().unwrap_or(&self.sender);
        if subject.is_empty() || subject == own_user_id {
            return None;
        }
        self.content
            .get("displayname")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .or(Some(subject))
    }
}

/// Event type discriminant. Only the types mm acts on get their own case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Message,
    RoomName,
    RoomMember,
    Other(String),
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "m.room.message" => Self::Message,
            "m.room.name" => Self::RoomName,
            "m.room.member" => Self::RoomMember,
            _ => Self::Other(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Message => "m.room.message".into(),
            EventKind::RoomName => "m.room.name".into(),
            EventKind::RoomMember => "m.room.member".into(),
            EventKind::Other(other) => other,
        }
    }
}

/// Content of an `m.room.message` event, keyed by `msgtype`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msgtype")]
pub enum MessageContent {
    #[serde(rename = "m.text")]
    Text {
        #[serde(default)]
        body: String,
    },

    #[serde(rename = "m.notice")]
    Notice {
        #[serde(default)]
        body: String,
    },

    #[serde(rename = "m.emote")]
    Emote {
        #[serde(default)]
        body: String,
    },

    #[serde(rename = "m.image")]
    Image(MediaContent),

    #[serde(rename = "m.video")]
    Video(MediaContent),

    #[serde(rename = "m.audio")]
    Audio(MediaContent),

    #[serde(rename = "m.file")]
    File(MediaContent),

    #[serde(rename = "m.location")]
    Location {
        #[serde(default)]
        body: String,
        #[serde(default)]
        geo_uri: String,
    },

    /// Any msgtype mm does not render.
    #[serde(other)]
    Unknown,
}

impl MessageContent {
    /// Outbound plain-text message body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }
}

/// Media reference shared by image, video, audio and file messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub body: String,
    /// `mxc://<server-name>/<media-id>`
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub info: Option<MediaInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(rename = "h", default)]
    pub height: Option<u64>,
    #[serde(rename = "w", default)]
    pub width: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mimetype: Option<String>,
}
