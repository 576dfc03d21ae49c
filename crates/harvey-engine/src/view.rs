use chrono::{DateTime, Utc};
use harvey_types::{Attachment, Conversation, ConversationId, Sender};

/// How loudly an error should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network hiccup; state was left untouched
    Transient,
    /// The user asked for something that cannot be done right now
    Warning,
    /// Error text reported by the server
    Server,
    /// The chat channel is gone for this session
    Fatal,
}

/// Scroll geometry captured before history is inserted above the viewport
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollAnchor {
    pub scroll_height: f64,
    pub scroll_top: f64,
}

impl ScrollAnchor {
    /// Scroll offset that keeps the previously visible content in place
    pub fn restored_offset(&self, new_scroll_height: f64) -> f64 {
        self.scroll_top + (new_scroll_height - self.scroll_height).max(0.0)
    }
}

/// Rendering contract the engine drives.
///
/// All calls happen on the engine's task; implementations keep whatever
/// widget state they need behind interior mutability.
pub trait TranscriptView {
    /// Redraw the sidebar, highlighting `active` if present
    fn render_conversation_list(&self, conversations: &[Conversation], active: Option<&ConversationId>);

    fn clear_transcript(&self);

    fn append_message(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>);

    /// Insert above everything currently shown
    fn prepend_message(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>);

    fn show_pending_indicator(&self);

    fn remove_pending_indicator(&self);

    fn show_history_loading_indicator(&self);

    fn hide_history_loading_indicator(&self);

    fn render_attachment_chips(&self, attachments: &[Attachment]);

    /// Ask the user to confirm; `on_confirm` runs only on approval
    fn show_confirmation(&self, message: &str, on_confirm: Box<dyn FnOnce()>);

    fn show_error(&self, severity: Severity, message: &str);

    /// Empty the input once a prompt has been handed to the channel
    fn clear_composer(&self) {}

    fn scroll_to_bottom(&self) {}

    fn capture_scroll_anchor(&self) -> ScrollAnchor {
        ScrollAnchor::default()
    }

    fn restore_scroll_anchor(&self, _anchor: ScrollAnchor) {}

    /// Placeholder shown for a conversation that has not started yet
    fn show_welcome(&self) {}

    fn hide_welcome(&self) {}
}
