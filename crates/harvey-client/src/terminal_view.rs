use std::cell::{Cell, RefCell};

use chrono::{DateTime, Utc};
use colored::Colorize;
use harvey_engine::{ScrollAnchor, Severity, TranscriptView};
use harvey_types::{format_time, Attachment, Conversation, ConversationId, Sender};

/// Heading line of one message
pub fn message_header(sender: Sender, timestamp: Option<&DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => format!("{} · {}", sender.display_name(), format_time(ts)),
        None => sender.display_name().to_string(),
    }
}

/// One sidebar row: `* [PAYRO] payroll question (42)`
pub fn conversation_line(conversation: &Conversation, active: bool) -> String {
    format!(
        "{} [{}] {} ({})",
        if active { "*" } else { " " },
        conversation.initials(),
        if conversation.title.is_empty() { "New conversation" } else { conversation.title.as_str() },
        conversation.id
    )
}

pub fn attachment_line(attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return "No files attached".to_string();
    }
    let chips: Vec<String> = attachments
        .iter()
        .enumerate()
        .map(|(i, a)| format!("[{}] {}", i + 1, a.display_name))
        .collect();
    format!("Attached: {}", chips.join("  "))
}

/// Line-oriented transcript for a terminal.
///
/// A terminal cannot insert above what it already printed, so older history
/// is collected between the scroll anchor calls and printed as one block.
#[derive(Default)]
pub struct TerminalView {
    older: RefCell<Option<Vec<String>>>,
    confirmation: RefCell<Option<Box<dyn FnOnce()>>>,
    thinking: Cell<bool>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the callback of an open confirmation prompt, if any
    pub fn take_confirmation(&self) -> Option<Box<dyn FnOnce()>> {
        self.confirmation.borrow_mut().take()
    }

    fn render(sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) -> String {
        let header = message_header(sender, timestamp);
        let header = match sender {
            Sender::User => header.bright_cyan().bold(),
            Sender::Assistant => header.bright_green().bold(),
        };
        format!("{}\n{}\n", header, text)
    }
}

impl TranscriptView for TerminalView {
    fn render_conversation_list(&self, conversations: &[Conversation], active: Option<&ConversationId>) {
        println!("{}", "Conversations".bright_black().bold());
        if conversations.is_empty() {
            println!("{}", "  (none yet)".bright_black());
        }
        for conversation in conversations {
            let is_active = active == Some(&conversation.id);
            let line = conversation_line(conversation, is_active);
            if is_active {
                println!("{}", line.bright_white());
            } else {
                println!("{}", line.bright_black());
            }
        }
        println!();
    }

    fn clear_transcript(&self) {
        self.thinking.set(false);
        println!("{}", "────────────────────────────────────────".bright_black());
    }

    fn append_message(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) {
        println!("{}", Self::render(sender, text, timestamp));
    }

    fn prepend_message(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) {
        let rendered = Self::render(sender, text, timestamp);
        match self.older.borrow_mut().as_mut() {
            Some(block) => block.insert(0, rendered),
            None => println!("{}", rendered),
        }
    }

    fn show_pending_indicator(&self) {
        if !self.thinking.replace(true) {
            println!("{}", "Harvey is thinking...".bright_black().italic());
        }
    }

    fn remove_pending_indicator(&self) {
        self.thinking.set(false);
    }

    fn show_history_loading_indicator(&self) {
        println!("{}", "Loading earlier messages...".bright_black());
    }

    fn hide_history_loading_indicator(&self) {}

    fn render_attachment_chips(&self, attachments: &[Attachment]) {
        println!("{}", attachment_line(attachments).yellow());
    }

    fn show_confirmation(&self, message: &str, on_confirm: Box<dyn FnOnce()>) {
        println!("{} {}", message.yellow().bold(), "[y/N]".bright_black());
        *self.confirmation.borrow_mut() = Some(on_confirm);
    }

    fn show_error(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Transient | Severity::Warning => eprintln!("{} {}", "⚠".yellow(), message.yellow()),
            Severity::Server => eprintln!("{} {}", "✖".red(), message.red()),
            Severity::Fatal => eprintln!("{} {}", "✖".red().bold(), message.red().bold()),
        }
    }

    fn capture_scroll_anchor(&self) -> ScrollAnchor {
        *self.older.borrow_mut() = Some(Vec::new());
        ScrollAnchor::default()
    }

    fn restore_scroll_anchor(&self, _anchor: ScrollAnchor) {
        let block = self.older.borrow_mut().take().unwrap_or_default();
        if block.is_empty() {
            return;
        }
        println!("{}", "── earlier messages ──".bright_black());
        for rendered in block {
            println!("{}", rendered);
        }
        println!("{}", "── end of earlier messages ──".bright_black());
    }

    fn show_welcome(&self) {
        println!(
            "{}",
            "Hi, I'm Harvey. Ask me anything about HR policies, leave or payroll."
                .bright_green()
        );
        println!(
            "{}",
            "Type /help for commands.\n".bright_black()
        );
    }
}
