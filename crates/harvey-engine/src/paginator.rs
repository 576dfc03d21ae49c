use std::rc::Rc;

use futures::FutureExt;
use harvey_types::{ConversationId, MessagePage, DEFAULT_PAGE_SIZE};

use crate::api::ChatApi;
use crate::error::ApiError;
use crate::event::{EngineEvent, PendingEvent};
use crate::state::{PageRequest, SessionState};
use crate::transcript::Transcript;
use crate::view::{Severity, TranscriptView};

/// Loads conversation history page by page
#[derive(Debug, Clone)]
pub struct HistoryPaginator {
    page_size: usize,
}

impl Default for HistoryPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl HistoryPaginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Issue a page request.
    ///
    /// Offset 0 always goes out and supersedes anything in flight. Older
    /// pages are refused (`None`) while another page request is outstanding.
    pub(crate) fn fetch_page(
        &self,
        state: &mut SessionState,
        api: &Rc<dyn ChatApi>,
        view: &dyn TranscriptView,
        conversation_id: &ConversationId,
        offset: usize,
    ) -> Option<PendingEvent> {
        if offset > 0 && state.is_page_fetch_in_flight() {
            log::debug!(
                "Page fetch already in flight, ignoring request for offset {} of {}",
                offset,
                conversation_id
            );
            return None;
        }

        let request = state.begin_page_fetch(conversation_id.clone(), offset);
        if !request.is_initial() {
            view.show_history_loading_indicator();
        }
        log::debug!(
            "Fetching page of {} at offset {} (request {})",
            conversation_id,
            offset,
            request.id
        );

        let api = Rc::clone(api);
        let limit = self.page_size;
        Some(
            async move {
                let result = api
                    .fetch_page(&request.conversation_id, limit, request.offset)
                    .await;
                EngineEvent::PageLoaded { request, result }
            }
            .boxed_local(),
        )
    }

    /// Apply a page response, or drop it if it no longer matches the session
    pub(crate) fn on_page_loaded(
        &self,
        state: &mut SessionState,
        transcript: &mut Transcript,
        view: &dyn TranscriptView,
        request: PageRequest,
        result: Result<MessagePage, ApiError>,
    ) {
        let accepted = state.finish_page_fetch(&request);
        // A newer backward load still owns the loader
        let older_in_flight = state
            .in_flight_page()
            .map_or(false, |current| !current.is_initial());
        if !request.is_initial() && !older_in_flight {
            view.hide_history_loading_indicator();
        }

        if !accepted {
            log::warn!(
                "Discarding stale page for {} at offset {} (request {})",
                request.conversation_id,
                request.offset,
                request.id
            );
            return;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::error!("Error fetching messages for {}: {}", request.conversation_id, e);
                view.show_error(
                    Severity::Transient,
                    &format!("Could not load messages: {}", e.user_message()),
                );
                return;
            }
        };

        let count = page.messages.len();
        if request.is_initial() {
            transcript.reset_with_page(page.messages);
        } else {
            transcript.prepend_page(page.messages);
        }
        state.advance_cursor(count);
        state.set_has_more_older(page.has_more);
        log::debug!(
            "Applied {} messages for {} (cursor {}, more: {})",
            count,
            request.conversation_id,
            state.page_cursor(),
            page.has_more
        );
    }
}
