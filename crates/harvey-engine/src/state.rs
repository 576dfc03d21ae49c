use harvey_types::{Attachment, ConversationId};

/// Identity of one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub id: u64,
    pub conversation_id: ConversationId,
    pub offset: usize,
}

impl PageRequest {
    pub fn is_initial(&self) -> bool {
        self.offset == 0
    }
}

/// What the user is looking at right now.
///
/// Only the controller, the paginator and the channel client mutate this.
#[derive(Debug, Default)]
pub struct SessionState {
    active_conversation: Option<ConversationId>,
    page_cursor: usize,
    has_more_older: bool,
    page_fetch: Option<PageRequest>,
    pending_attachments: Vec<Attachment>,
    awaiting_new_conversation: bool,
    next_request_id: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.active_conversation.as_ref()
    }

    pub fn is_active(&self, conversation_id: &ConversationId) -> bool {
        self.active_conversation.as_ref() == Some(conversation_id)
    }

    pub fn page_cursor(&self) -> usize {
        self.page_cursor
    }

    pub fn has_more_older(&self) -> bool {
        self.has_more_older
    }

    pub fn is_page_fetch_in_flight(&self) -> bool {
        self.page_fetch.is_some()
    }

    pub fn in_flight_page(&self) -> Option<&PageRequest> {
        self.page_fetch.as_ref()
    }

    pub fn pending_attachments(&self) -> &[Attachment] {
        &self.pending_attachments
    }

    pub fn is_awaiting_new_conversation(&self) -> bool {
        self.awaiting_new_conversation
    }

    /// Switch to `conversation` (or to a blank new conversation).
    ///
    /// Pagination starts over and any outstanding page request becomes stale.
    pub fn activate(&mut self, conversation: Option<ConversationId>) {
        self.active_conversation = conversation;
        self.page_cursor = 0;
        self.has_more_older = false;
        self.page_fetch = None;
        self.awaiting_new_conversation = false;
    }

    /// Take over the id the server assigned to the conversation we just started
    pub fn adopt_conversation(&mut self, conversation_id: ConversationId) {
        self.active_conversation = Some(conversation_id);
        self.awaiting_new_conversation = false;
    }

    pub fn mark_awaiting_new_conversation(&mut self) {
        self.awaiting_new_conversation = true;
    }

    /// Register a new page request; it replaces whatever was in flight
    pub fn begin_page_fetch(&mut self, conversation_id: ConversationId, offset: usize) -> PageRequest {
        self.next_request_id += 1;
        let request = PageRequest {
            id: self.next_request_id,
            conversation_id,
            offset,
        };
        self.page_fetch = Some(request.clone());
        request
    }

    /// Clear the in-flight flag if `request` is the one outstanding.
    ///
    /// Returns false for superseded requests, whose responses must be dropped.
    pub fn finish_page_fetch(&mut self, request: &PageRequest) -> bool {
        match &self.page_fetch {
            Some(current) if current.id == request.id => {
                self.page_fetch = None;
                self.is_active(&request.conversation_id)
            }
            _ => false,
        }
    }

    pub fn advance_cursor(&mut self, count: usize) {
        self.page_cursor += count;
    }

    pub fn set_has_more_older(&mut self, has_more: bool) {
        self.has_more_older = has_more;
    }

    pub fn stage_attachment(&mut self, attachment: Attachment) {
        self.pending_attachments.push(attachment);
    }

    pub fn unstage_attachment(&mut self, index: usize) -> Option<Attachment> {
        if index < self.pending_attachments.len() {
            Some(self.pending_attachments.remove(index))
        } else {
            None
        }
    }

    /// Hand over the staged attachments, leaving none behind
    pub fn take_attachments(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.pending_attachments)
    }
}
