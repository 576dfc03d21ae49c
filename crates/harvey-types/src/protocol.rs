use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    deserialize_string_or_null, deserialize_timestamp, Attachment, Conversation, ConversationId,
    Message, PENDING_REPLY_SENTINEL,
};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Prompt sent from client to server over the chat channel.
///
/// A `null` conversation id asks the server to start a new conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPrompt {
    pub prompt: String,
    pub conversation_id: Option<ConversationId>,
}

impl ClientPrompt {
    pub fn new(prompt: impl Into<String>, conversation_id: Option<ConversationId>) -> Self {
        Self {
            prompt: prompt.into(),
            conversation_id,
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Reply pushed by the server over the chat channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerReply {
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(deserialize_with = "deserialize_string_or_null", default)]
    pub response: String,
    #[serde(deserialize_with = "deserialize_timestamp", default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ServerReply {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    /// True when this reply only says the answer is still being generated
    pub fn is_pending(&self) -> bool {
        self.response == PENDING_REPLY_SENTINEL
    }
}

/// Body of `GET /api/conversations/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationList {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

/// Body of `GET /api/conversations/{id}/messages/`, oldest message first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub has_more: bool,
}

/// Body of the attachment upload endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadResponse {
    /// Turn the response into a staged attachment, or the server's error text
    pub fn into_attachment(self, fallback_name: &str) -> Result<Attachment, String> {
        match self.file_path {
            Some(path) if !path.is_empty() => Ok(Attachment::new(
                self.filename.unwrap_or_else(|| fallback_name.to_string()),
                path,
            )),
            _ => Err(self.error.unwrap_or_else(|| "Unknown error".to_string())),
        }
    }
}

/// Error body returned by the REST endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref().or(self.detail.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sender;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_conversation_prompt_serializes_null_id() {
        let prompt = ClientPrompt::new("Hello", None);
        assert_eq!(prompt.to_json().unwrap(), r#"{"prompt":"Hello","conversation_id":null}"#);
    }

    #[test]
    fn test_reply_without_conversation_id() {
        let reply = ServerReply::from_json(r#"{"response": "Thinking..."}"#).unwrap();
        assert!(reply.is_pending());
        assert_eq!(reply.conversation_id, None);
        assert_eq!(reply.timestamp, None);
    }

    #[test]
    fn test_reply_with_numeric_conversation_id() {
        let reply = ServerReply::from_json(
            r#"{"conversation_id": 7, "response": "Hi there", "timestamp": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!reply.is_pending());
        assert_eq!(reply.conversation_id, Some(ConversationId::new("7")));
        assert!(reply.timestamp.is_some());
    }

    #[test]
    fn test_reply_decode_error() {
        assert!(matches!(
            ServerReply::from_json("not json"),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_message_page_defaults() {
        let page: MessagePage = serde_json::from_str(r#"{"messages": [{"sender": "user", "text": "q"}]}"#).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].sender, Sender::User);
        assert!(!page.has_more);
    }

    #[test]
    fn test_upload_response() {
        let ok = UploadResponse {
            file_path: Some("/media/resumes/a.pdf".to_string()),
            filename: None,
            error: None,
        };
        assert_eq!(
            ok.into_attachment("a.pdf").unwrap(),
            Attachment::new("a.pdf", "/media/resumes/a.pdf")
        );

        let failed = UploadResponse {
            error: Some("No file provided".to_string()),
            ..Default::default()
        };
        assert_eq!(failed.into_attachment("a.pdf").unwrap_err(), "No file provided");
    }

    #[test]
    fn test_error_body_prefers_error_field() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "Not found."}"#).unwrap();
        assert_eq!(body.message(), Some("Not found."));
        let body: ErrorBody = serde_json::from_str(r#"{"error": "Denied", "detail": "x"}"#).unwrap();
        assert_eq!(body.message(), Some("Denied"));
    }
}
