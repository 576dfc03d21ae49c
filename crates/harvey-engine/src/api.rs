use async_trait::async_trait;
use harvey_types::{Attachment, Conversation, ConversationId, MessagePage};

use crate::error::ApiError;

/// File picked by the user, ready to be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Request/response side of the chat server.
///
/// The engine runs on a single task, so implementations do not need to be
/// `Send`; the browser client relies on that.
#[async_trait(?Send)]
pub trait ChatApi {
    /// Full conversation list, in display order
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// One page of history; `offset` counts back from the newest message
    async fn fetch_page(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        offset: usize,
    ) -> Result<MessagePage, ApiError>;

    async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<(), ApiError>;

    async fn upload_attachment(&self, upload: UploadRequest) -> Result<Attachment, ApiError>;
}
