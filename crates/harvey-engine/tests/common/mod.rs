//! Test doubles for driving a `SessionController` without a server or a screen
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::channel::{mpsc, oneshot};
use futures::StreamExt;
use harvey_engine::{
    ApiError, ChannelError, ChannelTransport, ChatApi, Connection, EngineConfig, InboundFrame,
    ScrollAnchor, SessionController, Severity, TranscriptView, UploadRequest,
};
use harvey_engine::types::{
    format_time, Attachment, ClientPrompt, Conversation, ConversationId, Message, MessagePage,
    Sender, ServerReply,
};

pub const LINE_HEIGHT: f64 = 40.0;

pub fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}

/// `count` alternating messages numbered from 1, oldest first
pub fn numbered_history(prefix: &str, count: usize) -> Vec<Message> {
    (1..=count)
        .map(|n| {
            let sender = if n % 2 == 1 { Sender::User } else { Sender::Assistant };
            Message::new(sender, format!("{} {}", prefix, n), None)
        })
        .collect()
}

// ============================================================================
// API
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    List,
    Page { id: String, limit: usize, offset: usize },
    Delete(String),
    Upload(String),
}

/// In-memory server holding whole histories and paging them like the real one
#[derive(Default)]
pub struct MockApi {
    conversations: RefCell<Vec<Conversation>>,
    histories: RefCell<HashMap<String, Vec<Message>>>,
    page_gates: RefCell<HashMap<(String, usize), oneshot::Receiver<()>>>,
    page_failures: RefCell<HashMap<String, ApiError>>,
    list_failure: RefCell<Option<ApiError>>,
    delete_failure: RefCell<Option<ApiError>>,
    upload_failure: RefCell<Option<ApiError>>,
    calls: RefCell<Vec<ApiCall>>,
}

impl MockApi {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn add_conversation(&self, id: &str, title: &str, history: Vec<Message>) {
        self.conversations.borrow_mut().push(Conversation::new(id, title));
        self.histories.borrow_mut().insert(id.to_string(), history);
    }

    /// Keep the page at `offset` of `id` from resolving until the sender fires
    pub fn hold_page(&self, id: &str, offset: usize) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.page_gates.borrow_mut().insert((id.to_string(), offset), rx);
        tx
    }

    pub fn fail_pages(&self, id: &str, error: ApiError) {
        self.page_failures.borrow_mut().insert(id.to_string(), error);
    }

    pub fn fail_list(&self, error: ApiError) {
        *self.list_failure.borrow_mut() = Some(error);
    }

    pub fn fail_delete(&self, error: ApiError) {
        *self.delete_failure.borrow_mut() = Some(error);
    }

    pub fn fail_upload(&self, error: ApiError) {
        *self.upload_failure.borrow_mut() = Some(error);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.borrow().clone()
    }

    pub fn page_calls(&self) -> Vec<(String, usize)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ApiCall::Page { id, offset, .. } => Some((id.clone(), *offset)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &ApiCall) -> usize {
        self.calls.borrow().iter().filter(|call| *call == wanted).count()
    }

    fn page_of(&self, id: &str, limit: usize, offset: usize) -> MessagePage {
        let histories = self.histories.borrow();
        let history = histories.get(id).cloned().unwrap_or_default();
        let end = history.len().saturating_sub(offset);
        let start = end.saturating_sub(limit);
        MessagePage {
            messages: history[start..end].to_vec(),
            has_more: start > 0,
        }
    }
}

#[async_trait(?Send)]
impl ChatApi for MockApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.calls.borrow_mut().push(ApiCall::List);
        if let Some(err) = self.list_failure.borrow().clone() {
            return Err(err);
        }
        Ok(self.conversations.borrow().clone())
    }

    async fn fetch_page(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        offset: usize,
    ) -> Result<MessagePage, ApiError> {
        let id = conversation_id.as_str().to_string();
        self.calls.borrow_mut().push(ApiCall::Page {
            id: id.clone(),
            limit,
            offset,
        });
        let gate = self.page_gates.borrow_mut().remove(&(id.clone(), offset));
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(err) = self.page_failures.borrow().get(&id).cloned() {
            return Err(err);
        }
        Ok(self.page_of(&id, limit, offset))
    }

    async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<(), ApiError> {
        let id = conversation_id.as_str().to_string();
        self.calls.borrow_mut().push(ApiCall::Delete(id.clone()));
        if let Some(err) = self.delete_failure.borrow().clone() {
            return Err(err);
        }
        self.conversations.borrow_mut().retain(|c| c.id.as_str() != id);
        self.histories.borrow_mut().remove(&id);
        Ok(())
    }

    async fn upload_attachment(&self, upload: UploadRequest) -> Result<Attachment, ApiError> {
        self.calls
            .borrow_mut()
            .push(ApiCall::Upload(upload.file_name.clone()));
        if let Some(err) = self.upload_failure.borrow().clone() {
            return Err(err);
        }
        let path = format!("/media/resumes/{}", upload.file_name);
        Ok(Attachment::new(upload.file_name, path))
    }
}

// ============================================================================
// View
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ViewCall {
    RenderList(Vec<String>, Option<String>),
    Clear,
    Append(Sender, String),
    Prepend(Sender, String),
    ShowPending,
    RemovePending,
    ShowLoader,
    HideLoader,
    Chips(Vec<String>),
    Confirm(String),
    Error(Severity, String),
    ShowWelcome,
    HideWelcome,
    ClearComposer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub sender: Sender,
    pub text: String,
    pub time: Option<String>,
}

/// Records every directive and simulates a scrolling message box
#[derive(Default)]
pub struct RecordingView {
    calls: RefCell<Vec<ViewCall>>,
    bubbles: RefCell<VecDeque<Bubble>>,
    pending_indicator: Cell<bool>,
    scroll_top: Cell<f64>,
    confirmation: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl RecordingView {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, wanted: &ViewCall) -> usize {
        self.calls.borrow().iter().filter(|call| *call == wanted).count()
    }

    pub fn clear_log(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn bubbles(&self) -> Vec<Bubble> {
        self.bubbles.borrow().iter().cloned().collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.bubbles.borrow().iter().map(|b| b.text.clone()).collect()
    }

    pub fn errors(&self) -> Vec<(Severity, String)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ViewCall::Error(severity, message) => Some((*severity, message.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last_list(&self) -> Option<(Vec<String>, Option<String>)> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            ViewCall::RenderList(ids, active) => Some((ids.clone(), active.clone())),
            _ => None,
        })
    }

    pub fn last_chips(&self) -> Option<Vec<String>> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            ViewCall::Chips(names) => Some(names.clone()),
            _ => None,
        })
    }

    pub fn has_pending_indicator(&self) -> bool {
        self.pending_indicator.get()
    }

    pub fn scroll_height(&self) -> f64 {
        self.bubbles.borrow().len() as f64 * LINE_HEIGHT
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top.get()
    }

    pub fn set_scroll_top(&self, top: f64) {
        self.scroll_top.set(top);
    }

    pub fn has_confirmation(&self) -> bool {
        self.confirmation.borrow().is_some()
    }

    /// Answer the open confirmation dialog with "yes"
    pub fn approve(&self) {
        let callback = self.confirmation.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn decline(&self) {
        self.confirmation.borrow_mut().take();
    }

    fn record(&self, call: ViewCall) {
        self.calls.borrow_mut().push(call);
    }

    fn bubble(sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) -> Bubble {
        Bubble {
            sender,
            text: text.to_string(),
            time: timestamp.map(format_time),
        }
    }
}

impl TranscriptView for RecordingView {
    fn render_conversation_list(&self, conversations: &[Conversation], active: Option<&ConversationId>) {
        self.record(ViewCall::RenderList(
            conversations.iter().map(|c| c.id.to_string()).collect(),
            active.map(|id| id.to_string()),
        ));
    }

    fn clear_transcript(&self) {
        self.record(ViewCall::Clear);
        self.bubbles.borrow_mut().clear();
        self.pending_indicator.set(false);
        self.scroll_top.set(0.0);
    }

    fn append_message(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) {
        self.record(ViewCall::Append(sender, text.to_string()));
        self.bubbles
            .borrow_mut()
            .push_back(Self::bubble(sender, text, timestamp));
    }

    fn prepend_message(&self, sender: Sender, text: &str, timestamp: Option<&DateTime<Utc>>) {
        self.record(ViewCall::Prepend(sender, text.to_string()));
        self.bubbles
            .borrow_mut()
            .push_front(Self::bubble(sender, text, timestamp));
    }

    fn show_pending_indicator(&self) {
        self.record(ViewCall::ShowPending);
        self.pending_indicator.set(true);
    }

    fn remove_pending_indicator(&self) {
        self.record(ViewCall::RemovePending);
        self.pending_indicator.set(false);
    }

    fn show_history_loading_indicator(&self) {
        self.record(ViewCall::ShowLoader);
    }

    fn hide_history_loading_indicator(&self) {
        self.record(ViewCall::HideLoader);
    }

    fn render_attachment_chips(&self, attachments: &[Attachment]) {
        self.record(ViewCall::Chips(
            attachments.iter().map(|a| a.display_name.clone()).collect(),
        ));
    }

    fn show_confirmation(&self, message: &str, on_confirm: Box<dyn FnOnce()>) {
        self.record(ViewCall::Confirm(message.to_string()));
        *self.confirmation.borrow_mut() = Some(on_confirm);
    }

    fn show_error(&self, severity: Severity, message: &str) {
        self.record(ViewCall::Error(severity, message.to_string()));
    }

    fn clear_composer(&self) {
        self.record(ViewCall::ClearComposer);
    }

    fn scroll_to_bottom(&self) {
        self.scroll_top.set(self.scroll_height());
    }

    fn capture_scroll_anchor(&self) -> ScrollAnchor {
        ScrollAnchor {
            scroll_height: self.scroll_height(),
            scroll_top: self.scroll_top.get(),
        }
    }

    fn restore_scroll_anchor(&self, anchor: ScrollAnchor) {
        self.scroll_top.set(anchor.restored_offset(self.scroll_height()));
    }

    fn show_welcome(&self) {
        self.record(ViewCall::ShowWelcome);
    }

    fn hide_welcome(&self) {
        self.record(ViewCall::HideWelcome);
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Server side of one mock chat connection
pub struct ServerEnd {
    prompts: mpsc::UnboundedReceiver<ClientPrompt>,
    replies: mpsc::UnboundedSender<InboundFrame>,
}

impl ServerEnd {
    /// Next prompt the client wrote, if any
    pub fn next_prompt(&mut self) -> Option<ClientPrompt> {
        match self.prompts.try_next() {
            Ok(Some(prompt)) => Some(prompt),
            _ => None,
        }
    }

    pub fn reply(&self, conversation_id: Option<&str>, response: &str, timestamp: Option<DateTime<Utc>>) {
        let reply = ServerReply {
            conversation_id: conversation_id.map(ConversationId::new),
            response: response.to_string(),
            timestamp,
        };
        self.push(Ok(reply));
    }

    /// Deliver raw JSON exactly as it would arrive on the socket
    pub fn reply_json(&self, json: &str) {
        self.push(ServerReply::from_json(json).map_err(ChannelError::from));
    }

    pub fn push(&self, frame: InboundFrame) {
        let _ = self.replies.unbounded_send(frame);
    }

    /// Close the socket from the server side
    pub fn hang_up(&self) {
        self.replies.close_channel();
    }
}

#[derive(Default)]
pub struct MockTransport {
    fail_next: Cell<bool>,
    opened: Cell<usize>,
    servers: RefCell<Vec<ServerEnd>>,
}

impl MockTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn fail_next_open(&self) {
        self.fail_next.set(true);
    }

    pub fn opened(&self) -> usize {
        self.opened.get()
    }

    /// Server end of the most recent connection
    pub fn server(&self) -> ServerEnd {
        self.servers
            .borrow_mut()
            .pop()
            .expect("no connection has been opened")
    }
}

#[async_trait(?Send)]
impl ChannelTransport for MockTransport {
    async fn open(&self) -> Result<Connection, ChannelError> {
        self.opened.set(self.opened.get() + 1);
        if self.fail_next.replace(false) {
            return Err(ChannelError::Connect("connection refused".to_string()));
        }
        let (outbound, prompts) = mpsc::unbounded();
        let (replies, inbound) = mpsc::unbounded();
        self.servers.borrow_mut().push(ServerEnd { prompts, replies });
        Ok(Connection {
            outbound,
            inbound: inbound.boxed_local(),
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: SessionController,
    pub api: Rc<MockApi>,
    pub view: Rc<RecordingView>,
    pub transport: Rc<MockTransport>,
}

impl Harness {
    pub fn new(api: Rc<MockApi>) -> Self {
        Self::with_page_size(api, 20)
    }

    pub fn with_page_size(api: Rc<MockApi>, page_size: usize) -> Self {
        let view = RecordingView::new();
        let transport = MockTransport::new();
        let controller = SessionController::new(
            api.clone(),
            transport.clone(),
            view.clone(),
            EngineConfig { page_size },
        );
        Self {
            controller,
            api,
            view,
            transport,
        }
    }

    /// Boot, let the connection open and return its server end
    pub fn booted(api: Rc<MockApi>) -> (Self, ServerEnd) {
        let mut harness = Self::new(api);
        harness.controller.boot().expect("boot");
        harness.settle();
        let server = harness.transport.server();
        (harness, server)
    }

    pub fn settle(&mut self) -> usize {
        self.controller.run_until_stalled()
    }

    pub fn open(&mut self, id: &str) {
        self.controller.switch_to(ConversationId::new(id));
        self.settle();
    }
}
