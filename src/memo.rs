//! Memos webhook payload types.
//!
//! Mirrors the JSON body Memos posts to a webhook endpoint. Every field is
//! defaulted so partial payloads still deserialize; the only field the relay
//! truly depends on is `memo`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Display format for memo timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inbound webhook body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub url: String,
    /// Activity tag, e.g. `memo.created`.
    #[serde(default, rename = "activityType")]
    pub activity_type: String,
    /// Creator resource name, e.g. `users/1`.
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub memo: Option<MemoRecord>,
}

/// The memo carried by a webhook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoRecord {
    #[serde(default)]
    pub state: i64,
    /// Resource name, `memos/<id>`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub create_time: Option<EpochSeconds>,
    #[serde(default)]
    pub update_time: Option<EpochSeconds>,
    #[serde(default)]
    pub display_time: Option<EpochSeconds>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl MemoRecord {
    /// Canonical memo id: the segment after the last `/` of the name.
    pub fn id(&self) -> &str {
        last_segment(&self.name)
    }
}

/// Protobuf-style `{ "seconds": n }` timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EpochSeconds {
    #[serde(default, deserialize_with = "int_or_string")]
    pub seconds: i64,
}

impl EpochSeconds {
    pub fn new(seconds: i64) -> Self {
        Self { seconds }
    }

    pub fn to_timestamp(self) -> Option<DateTime<Utc>> {
        seconds_to_timestamp(self.seconds)
    }
}

/// Convert epoch seconds to a UTC timestamp. `None` if out of range.
pub fn seconds_to_timestamp(epoch_seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(epoch_seconds, 0)
}

/// Render an optional memo timestamp for display; empty when absent.
pub fn format_timestamp(ts: Option<EpochSeconds>) -> String {
    ts.and_then(EpochSeconds::to_timestamp)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Memo visibility level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "i64")]
pub enum Visibility {
    #[default]
    Private,
    Protected,
    Public,
    Other(i64),
}

impl From<i64> for Visibility {
    fn from(value: i64) -> Self {
        match value {
            0 => Self::Private,
            1 => Self::Protected,
            2 => Self::Public,
            n => Self::Other(n),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("PRIVATE"),
            Self::Protected => f.write_str("PROTECTED"),
            Self::Public => f.write_str("PUBLIC"),
            Self::Other(n) => write!(f, "{n}"),
        }
    }
}

/// Trailing path segment: `users/12` -> `12`, `12` -> `12`.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

// protojson encodes int64 as a string; accept either form.
fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
