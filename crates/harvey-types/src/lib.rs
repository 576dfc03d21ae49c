//! Core types shared by the harvey chat client crates
//!
//! Conversations, messages and staged attachments as the client sees them,
//! plus the JSON payloads exchanged with the server (see [`protocol`]).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub mod protocol;

pub use protocol::{
    ClientPrompt, ConversationList, ErrorBody, MessagePage, ProtocolError, ServerReply,
    UploadResponse,
};

// ============================================================================
// Constants
// ============================================================================

/// Number of messages requested per history page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Reply text the server sends while it is still generating an answer
pub const PENDING_REPLY_SENTINEL: &str = "Thinking...";

/// Label of the machine-readable marker appended to a prompt per attachment
pub const ATTACHMENT_MARKER_LABEL: &str = "Attached Resume";

// ============================================================================
// Conversations
// ============================================================================

/// Opaque conversation identifier.
///
/// Servers hand these out either as JSON strings or as integers; both are
/// kept as their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Self(s)),
            serde_json::Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "conversation id must be a string or an integer, got {}",
                other
            ))),
        }
    }
}

/// Entry of the conversation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub title: String,
}

impl Conversation {
    pub fn new(id: impl Into<ConversationId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Short badge shown next to the title in collapsed lists
    pub fn initials(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            "NC".to_string()
        } else {
            title.chars().take(5).collect::<String>().to_uppercase()
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "ai",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Harvey",
        }
    }
}

/// A single transcript message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    #[serde(deserialize_with = "deserialize_string_or_null", default)]
    pub text: String,
    #[serde(
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp,
        }
    }

    pub fn user(text: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self::new(Sender::User, text, timestamp)
    }

    pub fn assistant(text: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self::new(Sender::Assistant, text, timestamp)
    }
}

// ============================================================================
// Attachments
// ============================================================================

/// File uploaded to the server and staged for the next prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub display_name: String,
    pub server_path: String,
}

impl Attachment {
    pub fn new(display_name: impl Into<String>, server_path: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            server_path: server_path.into(),
        }
    }

    /// Marker the server side parses out of the prompt text
    pub fn prompt_marker(&self) -> String {
        format!(" [{}: {}]", ATTACHMENT_MARKER_LABEL, self.server_path)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Helper function to deserialize string or null values
pub fn deserialize_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// Deserialize an optional timestamp, treating malformed values as absent
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(raw) => Ok(parse_timestamp(&raw)),
        _ => Ok(None),
    }
}

/// Parse an RFC 3339 timestamp; naive ISO timestamps are read as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    log::warn!("Ignoring unparseable timestamp: {}", raw);
    None
}

/// Format a message timestamp for display next to a bubble
pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M").to_string()
}
