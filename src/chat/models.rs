//! The core models for a chat transcript.
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message. Messages are immutable once created: the
/// controller builds them on send/receive and they only go away when
/// the whole transcript is cleared.
///
/// Serialized with camelCase keys and an ISO-8601 timestamp so the
/// stored history reads the same as the browser app's local storage.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: String,
    text: String,
    is_user: bool,
    #[serde(with = "iso8601_millis")]
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

impl Message {
    pub fn user(id: &str, text: &str, timestamp: DateTime<Utc>) -> Self {
        Message {
            id: id.to_string(),
            text: text.to_string(),
            is_user: true,
            timestamp: timestamp.trunc_subsecs(3),
            model: None,
        }
    }

    pub fn assistant(id: &str, text: &str, model: &str, timestamp: DateTime<Utc>) -> Self {
        Message {
            id: id.to_string(),
            text: text.to_string(),
            is_user: false,
            timestamp: timestamp.trunc_subsecs(3),
            model: Some(model.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_user(&self) -> bool {
        self.is_user
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

// Millisecond precision with a `Z` suffix, e.g. 2024-05-01T12:00:00.123Z
mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Messages in the order they were sent.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self(messages)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.0.clone()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }

    pub fn push(&mut self, msg: Message) {
        self.0.push(msg)
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }

    /// Id for the next message: epoch milliseconds of `now`, bumped
    /// past the last id so ids stay unique and increasing even when two
    /// messages land in the same millisecond. A stored id that can't
    /// be bumped without overflowing is ignored.
    pub fn next_id(&self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        let last = self.last().and_then(|m| m.id.parse::<i64>().ok());
        match last.and_then(|last| last.checked_add(1)) {
            Some(next) if millis < next => next.to_string(),
            _ => millis.to_string(),
        }
    }
}
