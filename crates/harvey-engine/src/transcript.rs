use std::collections::VecDeque;
use std::rc::Rc;

use harvey_types::Message;

use crate::view::TranscriptView;

/// Whether the server has acknowledged a message yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Shown optimistically, no server echo so far
    Pending,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub message: Message,
    pub delivery: Delivery,
}

/// Engine-side mirror of the visible transcript.
///
/// Every directive to the view goes through here so the two never disagree.
pub struct Transcript {
    entries: VecDeque<TranscriptEntry>,
    pending_indicator: bool,
    welcome_visible: bool,
    view: Rc<dyn TranscriptView>,
}

impl Transcript {
    pub fn new(view: Rc<dyn TranscriptView>) -> Self {
        Self {
            entries: VecDeque::new(),
            pending_indicator: false,
            welcome_visible: false,
            view,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(|entry| &entry.message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending_indicator(&self) -> bool {
        self.pending_indicator
    }

    pub fn is_welcome_visible(&self) -> bool {
        self.welcome_visible
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending_indicator = false;
        self.welcome_visible = false;
        self.view.clear_transcript();
    }

    pub fn show_welcome(&mut self) {
        if !self.welcome_visible {
            self.welcome_visible = true;
            self.view.show_welcome();
        }
    }

    pub fn hide_welcome(&mut self) {
        if self.welcome_visible {
            self.welcome_visible = false;
            self.view.hide_welcome();
        }
    }

    /// Add a live message at the newest position
    pub fn append(&mut self, message: Message, delivery: Delivery) {
        self.view
            .append_message(message.sender, &message.text, message.timestamp.as_ref());
        self.entries.push_back(TranscriptEntry { message, delivery });
        self.view.scroll_to_bottom();
    }

    /// Replace the transcript with the newest page of a conversation.
    ///
    /// Live messages added while the page was loading stay below it.
    pub fn reset_with_page(&mut self, page: Vec<Message>) {
        let live: Vec<TranscriptEntry> = self.entries.drain(..).collect();
        let pending_indicator = self.pending_indicator;
        self.pending_indicator = false;
        self.welcome_visible = false;
        self.view.clear_transcript();

        for message in page {
            self.view
                .append_message(message.sender, &message.text, message.timestamp.as_ref());
            self.entries.push_back(TranscriptEntry {
                message,
                delivery: Delivery::Confirmed,
            });
        }
        for entry in live {
            self.view.append_message(
                entry.message.sender,
                &entry.message.text,
                entry.message.timestamp.as_ref(),
            );
            self.entries.push_back(entry);
        }
        if pending_indicator {
            self.show_pending_indicator();
        }
        self.view.scroll_to_bottom();
    }

    /// Splice an older page above the current content, oldest message on top.
    ///
    /// The view's scroll offset is shifted by the inserted height so the
    /// messages the user was reading do not move.
    pub fn prepend_page(&mut self, page: Vec<Message>) {
        if page.is_empty() {
            return;
        }
        let anchor = self.view.capture_scroll_anchor();
        for message in page.into_iter().rev() {
            self.view
                .prepend_message(message.sender, &message.text, message.timestamp.as_ref());
            self.entries.push_front(TranscriptEntry {
                message,
                delivery: Delivery::Confirmed,
            });
        }
        self.view.restore_scroll_anchor(anchor);
    }

    /// Mark every optimistic message as acknowledged by the server
    pub fn confirm_pending(&mut self) -> usize {
        let mut confirmed = 0;
        for entry in self.entries.iter_mut() {
            if entry.delivery == Delivery::Pending {
                entry.delivery = Delivery::Confirmed;
                confirmed += 1;
            }
        }
        confirmed
    }

    /// Show the typing indicator; a second call while it is visible does nothing
    pub fn show_pending_indicator(&mut self) {
        if !self.pending_indicator {
            self.pending_indicator = true;
            self.view.show_pending_indicator();
            self.view.scroll_to_bottom();
        }
    }

    pub fn remove_pending_indicator(&mut self) {
        if self.pending_indicator {
            self.pending_indicator = false;
            self.view.remove_pending_indicator();
        }
    }
}
