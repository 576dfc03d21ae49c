use std::rc::Rc;

use futures::FutureExt;
use harvey_types::{Conversation, ConversationId};

use crate::api::ChatApi;
use crate::error::ApiError;
use crate::event::{EngineEvent, PendingEvent};
use crate::view::{Severity, TranscriptView};

/// Cached conversation list.
///
/// Refreshes replace the cache wholesale; a response is applied only if no
/// newer refresh has been applied already.
#[derive(Debug, Default)]
pub struct ConversationDirectory {
    conversations: Vec<Conversation>,
    issued: u64,
    applied: u64,
}

impl ConversationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn contains(&self, conversation_id: &ConversationId) -> bool {
        self.conversations.iter().any(|c| &c.id == conversation_id)
    }

    pub fn find(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == conversation_id)
    }

    pub(crate) fn refresh(&mut self, api: &Rc<dyn ChatApi>) -> PendingEvent {
        self.issued += 1;
        let ticket = self.issued;
        let api = Rc::clone(api);
        log::debug!("Refreshing conversation list (ticket {})", ticket);
        async move {
            let result = api.list_conversations().await;
            EngineEvent::ConversationsLoaded { ticket, result }
        }
        .boxed_local()
    }

    /// Apply a refresh result; returns true when the list was replaced
    pub(crate) fn on_refreshed(
        &mut self,
        ticket: u64,
        result: Result<Vec<Conversation>, ApiError>,
        active: Option<&ConversationId>,
        view: &dyn TranscriptView,
    ) -> bool {
        match result {
            Ok(conversations) => {
                if ticket <= self.applied {
                    log::debug!(
                        "Dropping conversation list for ticket {} (already applied {})",
                        ticket,
                        self.applied
                    );
                    return false;
                }
                self.applied = ticket;
                self.conversations = conversations;
                self.render(active, view);
                true
            }
            Err(e) => {
                log::error!("Failed to load conversations: {}", e);
                view.show_error(
                    Severity::Transient,
                    &format!("Could not refresh conversations: {}", e.user_message()),
                );
                false
            }
        }
    }

    pub(crate) fn remove(&self, api: &Rc<dyn ChatApi>, conversation_id: ConversationId) -> PendingEvent {
        let api = Rc::clone(api);
        log::info!("Deleting conversation {}", conversation_id);
        async move {
            let result = api.delete_conversation(&conversation_id).await;
            EngineEvent::ConversationDeleted {
                conversation_id,
                result,
            }
        }
        .boxed_local()
    }

    /// Drop a deleted conversation from the cache ahead of the next refresh
    pub(crate) fn forget(&mut self, conversation_id: &ConversationId) {
        self.conversations.retain(|c| &c.id != conversation_id);
    }

    pub(crate) fn render(&self, active: Option<&ConversationId>, view: &dyn TranscriptView) {
        view.render_conversation_list(&self.conversations, active);
    }
}
