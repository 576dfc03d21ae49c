use std::cell::RefCell;

use chrono::{DateTime, Utc};
use harvey_engine::{Command, CommandSender, ScrollAnchor, Severity, TranscriptView};
use harvey_types::{format_time, Attachment, Conversation, ConversationId, Sender};
use wasm_bindgen::JsValue;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement};

use crate::{dom, markdown, utils};

const WELCOME_ID: &str = "welcome-placeholder";
const HISTORY_LOADER_ID: &str = "history-loader";
const THINKING_SELECTOR: &str = ".thinking-bubble";

/// Element ids the chat page template provides
pub struct PageElements {
    pub chat_box: HtmlElement,
    pub conversation_list: Element,
    pub file_previews: Element,
    pub user_input: HtmlInputElement,
}

impl PageElements {
    pub fn find(document: &Document) -> Result<Self, JsValue> {
        Ok(Self {
            chat_box: dom::get_html_element_by_id(document, "chat-box")?,
            conversation_list: dom::get_element_by_id(document, "conversation-list")?,
            file_previews: dom::get_element_by_id(document, "file-previews")?,
            user_input: dom::get_input_by_id(document, "user-input")?,
        })
    }
}

/// Renders the session into the chat page
pub struct DomView {
    document: Document,
    elements: PageElements,
    username: String,
    commands: RefCell<Option<CommandSender>>,
}

impl DomView {
    pub fn new(document: Document, elements: PageElements, username: Option<String>) -> Self {
        Self {
            document,
            elements,
            username: username
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "User".to_string()),
            commands: RefCell::new(None),
        }
    }

    /// Route clicks on rendered items (sidebar rows, chip buttons) to the engine
    pub fn bind(&self, commands: CommandSender) {
        *self.commands.borrow_mut() = Some(commands);
    }

    fn sender_handle(&self) -> Option<CommandSender> {
        self.commands.borrow().clone()
    }

    fn bubble(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) -> Result<Element, JsValue> {
        let row_class = match sender {
            Sender::User => "flex flex-row-reverse items-start gap-3 animate-fade-in-up mb-4",
            Sender::Assistant => "flex items-start gap-3 animate-fade-in-up mb-4",
        };
        let row = dom::create_element_with_class(&self.document, "div", row_class)?;

        let icon = dom::create_element_with_class(
            &self.document,
            "div",
            "w-8 h-8 rounded-full flex-shrink-0 flex items-center justify-center text-xs font-bold shadow-md",
        )?;
        match sender {
            Sender::User => {
                icon.class_list().add_2("bg-indigo-600", "text-white")?;
                icon.set_text_content(Some("ME"));
            }
            Sender::Assistant => {
                icon.class_list()
                    .add_3("bg-gradient-to-br", "from-indigo-500", "to-purple-600")?;
                icon.set_inner_html(r#"<i class="fas fa-robot"></i>"#);
            }
        }

        let bubble_class = match sender {
            Sender::User => "chat-bubble-user text-white p-4 rounded-2xl max-w-2xl leading-relaxed text-sm shadow-sm",
            Sender::Assistant => "chat-bubble-ai p-4 rounded-2xl max-w-2xl leading-relaxed text-sm shadow-sm",
        };
        let bubble = dom::create_element_with_class(&self.document, "div", bubble_class)?;
        let body = match sender {
            Sender::User => utils::format_plain(text),
            Sender::Assistant => markdown::render_reply(text),
        };
        let time = timestamp
            .map(|ts| {
                format!(
                    r#"<div class="text-[10px] opacity-50 mt-2">{}</div>"#,
                    format_time(ts)
                )
            })
            .unwrap_or_default();
        bubble.set_inner_html(&format!("{}{}", body, time));

        row.append_child(&icon)?;
        row.append_child(&bubble)?;
        Ok(row)
    }

    fn conversation_row(&self, conversation: &Conversation, active: bool) -> Result<Element, JsValue> {
        let class = if active {
            "p-3 rounded-lg cursor-pointer text-sm flex items-center gap-3 overflow-hidden bg-white/10 text-white"
        } else {
            "p-3 rounded-lg cursor-pointer text-sm flex items-center gap-3 overflow-hidden text-gray-400 hover:text-white hover:bg-white/5"
        };
        let row = dom::create_element_with_class(&self.document, "div", class)?;

        let badge = dom::create_element_with_class(
            &self.document,
            "div",
            "w-8 min-w-[2rem] text-xs font-bold tracking-wide uppercase",
        )?;
        badge.set_text_content(Some(&conversation.initials()));
        let title = dom::create_element_with_class(
            &self.document,
            "span",
            "whitespace-nowrap truncate sidebar-text font-medium flex-1",
        )?;
        title.set_text_content(Some(&conversation.title));
        let delete = dom::create_element_with_class(
            &self.document,
            "button",
            "delete-conversation text-gray-500 hover:text-red-400",
        )?;
        delete.set_inner_html(r#"<i class="fas fa-trash"></i>"#);

        row.append_child(&badge)?;
        row.append_child(&title)?;
        row.append_child(&delete)?;

        if let Some(commands) = self.sender_handle() {
            let id = conversation.id.clone();
            let open = commands.clone();
            dom::add_listener(&row, "click", move |_| {
                open.send(Command::SwitchTo(id.clone()));
            })?;

            let id = conversation.id.clone();
            dom::add_listener(&delete, "click", move |event| {
                event.stop_propagation();
                commands.send(Command::RequestDelete(id.clone()));
            })?;
        }
        Ok(row)
    }

    fn chip(&self, index: usize, attachment: &Attachment) -> Result<Element, JsValue> {
        let chip = dom::create_element_with_class(
            &self.document,
            "div",
            "flex items-center gap-2 bg-indigo-500/20 border border-indigo-500/30 px-3 py-1.5 rounded-lg text-xs text-indigo-200",
        )?;
        let name = dom::create_element_with_class(&self.document, "span", "max-w-[150px] truncate")?;
        name.set_text_content(Some(&attachment.display_name));
        let remove = dom::create_element_with_class(&self.document, "button", "hover:text-white ml-1")?;
        remove.set_inner_html(r#"<i class="fas fa-times"></i>"#);
        if let Some(commands) = self.sender_handle() {
            dom::add_listener(&remove, "click", move |_| {
                commands.send(Command::Detach(index));
            })?;
        }
        chip.append_child(&name)?;
        chip.append_child(&remove)?;
        Ok(chip)
    }

    fn notice(&self, class: &str, text: &str) -> Result<(), JsValue> {
        let div = dom::create_element_with_class(&self.document, "div", class)?;
        div.set_text_content(Some(text));
        self.elements.chat_box.append_child(&div)?;
        Ok(())
    }

    fn report(&self, result: Result<(), JsValue>) {
        if let Err(e) = result {
            log::error!("DOM update failed: {:?}", e);
        }
    }
}

impl TranscriptView for DomView {
    fn render_conversation_list(&self, conversations: &[Conversation], active: Option<&ConversationId>) {
        let list = &self.elements.conversation_list;
        list.set_inner_html("");
        for conversation in conversations {
            let is_active = active == Some(&conversation.id);
            let result = self
                .conversation_row(conversation, is_active)
                .and_then(|row| list.append_child(&row).map(|_| ()));
            self.report(result);
        }
    }

    fn clear_transcript(&self) {
        self.elements.chat_box.set_inner_html("");
    }

    fn append_message(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) {
        let result = self
            .bubble(sender, text, timestamp)
            .and_then(|b| self.elements.chat_box.append_child(&b).map(|_| ()));
        self.report(result);
    }

    fn prepend_message(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) {
        let chat_box = &self.elements.chat_box;
        let result = self.bubble(sender, text, timestamp).and_then(|b| {
            let first = chat_box.first_child();
            chat_box.insert_before(&b, first.as_ref()).map(|_| ())
        });
        self.report(result);
    }

    fn show_pending_indicator(&self) {
        if let Ok(Some(_)) = self.elements.chat_box.query_selector(THINKING_SELECTOR) {
            return;
        }
        let result = dom::create_element_with_class(
            &self.document,
            "div",
            "flex items-start gap-3 thinking-bubble animate-pulse mb-4",
        )
        .and_then(|bubble| {
            bubble.set_inner_html(
                r#"<div class="w-8 h-8 rounded-full bg-gradient-to-br from-indigo-500 to-purple-600 flex items-center justify-center text-white text-xs shadow-md"><i class="fas fa-robot"></i></div>
<div class="chat-bubble-ai px-4 py-3 rounded-2xl flex gap-1 items-center h-10">
<div class="w-1.5 h-1.5 bg-gray-400 rounded-full animate-bounce"></div>
<div class="w-1.5 h-1.5 bg-gray-400 rounded-full animate-bounce delay-100"></div>
<div class="w-1.5 h-1.5 bg-gray-400 rounded-full animate-bounce delay-200"></div>
</div>"#,
            );
            self.elements.chat_box.append_child(&bubble).map(|_| ())
        });
        self.report(result);
    }

    fn remove_pending_indicator(&self) {
        if let Ok(Some(bubble)) = self.elements.chat_box.query_selector(THINKING_SELECTOR) {
            bubble.remove();
        }
    }

    fn show_history_loading_indicator(&self) {
        dom::remove_by_id(&self.document, HISTORY_LOADER_ID);
        let chat_box = &self.elements.chat_box;
        let result = dom::create_element_with_class(
            &self.document,
            "div",
            "text-center text-xs text-gray-500 py-2",
        )
        .and_then(|loader| {
            loader.set_id(HISTORY_LOADER_ID);
            loader.set_text_content(Some("Loading history..."));
            let first = chat_box.first_child();
            chat_box.insert_before(&loader, first.as_ref()).map(|_| ())
        });
        self.report(result);
    }

    fn hide_history_loading_indicator(&self) {
        dom::remove_by_id(&self.document, HISTORY_LOADER_ID);
    }

    fn render_attachment_chips(&self, attachments: &[Attachment]) {
        let previews = &self.elements.file_previews;
        previews.set_inner_html("");
        dom::set_hidden(previews, attachments.is_empty());
        for (index, attachment) in attachments.iter().enumerate() {
            let result = self
                .chip(index, attachment)
                .and_then(|chip| previews.append_child(&chip).map(|_| ()));
            self.report(result);
        }
    }

    fn show_confirmation(&self, message: &str, on_confirm: Box<dyn FnOnce()>) {
        let confirmed = web_sys::window()
            .map(|w| w.confirm_with_message(message).unwrap_or(false))
            .unwrap_or(false);
        if confirmed {
            on_confirm();
        }
    }

    fn show_error(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Transient => log::warn!("{}", message),
            Severity::Warning | Severity::Server => {
                log::error!("{}", message);
                if let Some(window) = web_sys::window() {
                    let _ = window.alert_with_message(message);
                }
            }
            Severity::Fatal => {
                log::error!("{}", message);
                let result = self.notice("text-center text-xs text-red-400 py-2", message);
                self.report(result);
                self.scroll_to_bottom();
            }
        }
    }

    fn clear_composer(&self) {
        self.elements.user_input.set_value("");
    }

    fn scroll_to_bottom(&self) {
        let chat_box = &self.elements.chat_box;
        chat_box.set_scroll_top(chat_box.scroll_height());
    }

    fn capture_scroll_anchor(&self) -> ScrollAnchor {
        ScrollAnchor {
            scroll_height: self.elements.chat_box.scroll_height() as f64,
            scroll_top: self.elements.chat_box.scroll_top() as f64,
        }
    }

    fn restore_scroll_anchor(&self, anchor: ScrollAnchor) {
        let chat_box = &self.elements.chat_box;
        let offset = anchor.restored_offset(chat_box.scroll_height() as f64);
        chat_box.set_scroll_top(offset.round() as i32);
    }

    fn show_welcome(&self) {
        if self.document.get_element_by_id(WELCOME_ID).is_some() {
            return;
        }
        let result = dom::create_element_with_class(
            &self.document,
            "div",
            "flex flex-col items-center justify-center h-full opacity-60",
        )
        .and_then(|welcome| {
            welcome.set_id(WELCOME_ID);
            welcome.set_inner_html(&format!(
                r#"<h3 class="text-2xl font-bold mb-2">Hello, {}</h3>
<div class="text-center text-gray-400 max-w-sm text-sm leading-relaxed">How can I assist you with your HR tasks or policy questions today?</div>"#,
                utils::escape_html(&self.username)
            ));
            self.elements.chat_box.append_child(&welcome).map(|_| ())
        });
        self.report(result);
    }

    fn hide_welcome(&self) {
        dom::remove_by_id(&self.document, WELCOME_ID);
    }
}
