use std::rc::Rc;

use chrono::Utc;
use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use harvey_types::{ClientPrompt, ConversationId, Message, DEFAULT_PAGE_SIZE};

use crate::api::{ChatApi, UploadRequest};
use crate::channel::{next_frame, ChannelClient, ChannelTransport, ConnectionState, InboundFrame, InboundStream};
use crate::command::{Command, CommandSender};
use crate::directory::ConversationDirectory;
use crate::error::{ApiError, ChannelError, EngineError};
use crate::event::{EngineEvent, PendingEvent};
use crate::paginator::HistoryPaginator;
use crate::state::SessionState;
use crate::transcript::{Delivery, Transcript};
use crate::view::{Severity, TranscriptView};

const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this conversation?";

/// Engine tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Whether the event loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Orchestrates the session: every user intent and every server response
/// is handled here, one at a time, on the task that runs [`run`](Self::run).
pub struct SessionController {
    state: SessionState,
    directory: ConversationDirectory,
    paginator: HistoryPaginator,
    channel: ChannelClient,
    transcript: Transcript,
    api: Rc<dyn ChatApi>,
    view: Rc<dyn TranscriptView>,
    commands: CommandSender,
    pending: FuturesUnordered<PendingEvent>,
}

impl SessionController {
    pub fn new(
        api: Rc<dyn ChatApi>,
        transport: Rc<dyn ChannelTransport>,
        view: Rc<dyn TranscriptView>,
        config: EngineConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded();
        let pending = FuturesUnordered::new();
        pending.push(next_command(rx));

        Self {
            state: SessionState::new(),
            directory: ConversationDirectory::new(),
            paginator: HistoryPaginator::new(config.page_size),
            channel: ChannelClient::new(transport),
            transcript: Transcript::new(Rc::clone(&view)),
            api,
            view,
            commands: CommandSender::new(tx),
            pending,
        }
    }

    /// Handle for posting commands from UI callbacks
    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn directory(&self) -> &ConversationDirectory {
        &self.directory
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Process events until a [`Command::Shutdown`] arrives
    pub async fn run(mut self) {
        log::info!("Session engine started");
        while self.step().await {}
        log::info!("Session engine stopped");
    }

    /// Wait for and handle the next event; false once the engine has stopped
    pub async fn step(&mut self) -> bool {
        match self.pending.next().await {
            Some(event) => self.dispatch(event) == Flow::Continue,
            None => false,
        }
    }

    /// Handle every event that is ready without waiting; returns how many ran
    pub fn run_until_stalled(&mut self) -> usize {
        let mut handled = 0;
        let mut idle_polls = 0;
        while idle_polls < 2 {
            match self.pending.next().now_or_never() {
                Some(Some(event)) => {
                    idle_polls = 0;
                    handled += 1;
                    if self.dispatch(event) == Flow::Stop {
                        break;
                    }
                }
                Some(None) => break,
                // FuturesUnordered may yield once before draining its ready queue
                None => idle_polls += 1,
            }
        }
        handled
    }

    fn dispatch(&mut self, event: EngineEvent) -> Flow {
        match event {
            EngineEvent::Command(Some(command), inbox) => {
                self.pending.push(next_command(inbox));
                return self.handle_command(command);
            }
            EngineEvent::Command(None, _) => {
                log::info!("Command inbox closed");
                return Flow::Stop;
            }
            EngineEvent::PageLoaded { request, result } => {
                self.paginator.on_page_loaded(
                    &mut self.state,
                    &mut self.transcript,
                    self.view.as_ref(),
                    request,
                    result,
                );
            }
            EngineEvent::ConversationsLoaded { ticket, result } => {
                self.directory.on_refreshed(
                    ticket,
                    result,
                    self.state.active_conversation(),
                    self.view.as_ref(),
                );
            }
            EngineEvent::ConversationDeleted {
                conversation_id,
                result,
            } => self.on_deleted(conversation_id, result),
            EngineEvent::AttachmentUploaded { file_name, result } => match result {
                Ok(attachment) => {
                    log::info!("Uploaded {} as {}", file_name, attachment.server_path);
                    self.state.stage_attachment(attachment);
                    self.view
                        .render_attachment_chips(self.state.pending_attachments());
                }
                Err(e) => {
                    log::error!("Upload of {} failed: {}", file_name, e);
                    self.view.show_error(
                        Severity::Server,
                        &format!("Upload failed: {}", e.user_message()),
                    );
                }
            },
            EngineEvent::Connected(result) => match self.channel.on_connected(result) {
                Ok(first_frame) => self.pending.push(first_frame),
                Err(e) => self.view.show_error(Severity::Fatal, &e.to_string()),
            },
            EngineEvent::Inbound { frame, rest } => self.on_inbound(frame, rest),
        }
        Flow::Continue
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        log::debug!("Command: {:?}", command);
        let result = match command {
            Command::Connect => self.connect(),
            Command::StartNew => {
                self.start_new();
                Ok(())
            }
            Command::SwitchTo(id) => {
                self.switch_to(id);
                Ok(())
            }
            Command::LoadOlder => {
                self.load_older();
                Ok(())
            }
            Command::Send(text) => self.send(&text),
            Command::RequestDelete(id) => {
                self.request_delete(id);
                Ok(())
            }
            Command::Delete(id) => {
                self.delete(id);
                Ok(())
            }
            Command::Attach(upload) => {
                self.attach(upload);
                Ok(())
            }
            Command::Detach(index) => {
                self.detach(index);
                Ok(())
            }
            Command::RefreshConversations => {
                self.refresh_conversations();
                Ok(())
            }
            Command::Shutdown => {
                self.channel.close();
                return Flow::Stop;
            }
        };
        if let Err(e) = result {
            log::warn!("Command failed: {}", e);
        }
        Flow::Continue
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Open the chat channel and show a fresh conversation
    pub fn boot(&mut self) -> Result<(), EngineError> {
        self.start_new();
        self.connect()
    }

    pub fn connect(&mut self) -> Result<(), EngineError> {
        match self.channel.connect() {
            Ok(opening) => {
                self.pending.push(opening);
                Ok(())
            }
            Err(e) => {
                self.view.show_error(Severity::Warning, &e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn refresh_conversations(&mut self) {
        let refresh = self.directory.refresh(&self.api);
        self.pending.push(refresh);
    }

    pub fn start_new(&mut self) {
        log::info!("Starting a new conversation");
        self.state.activate(None);
        self.transcript.clear();
        self.transcript.show_welcome();
        self.refresh_conversations();
    }

    pub fn switch_to(&mut self, conversation_id: ConversationId) {
        log::info!("Switching to conversation {}", conversation_id);
        self.state.activate(Some(conversation_id.clone()));
        self.transcript.clear();
        if let Some(fetch) = self.paginator.fetch_page(
            &mut self.state,
            &self.api,
            self.view.as_ref(),
            &conversation_id,
            0,
        ) {
            self.pending.push(fetch);
        }
        self.refresh_conversations();
    }

    /// Backward-scroll trigger: fetch the next older page if there is one
    pub fn load_older(&mut self) {
        let conversation_id = match self.state.active_conversation() {
            Some(id) if self.state.has_more_older() => id.clone(),
            _ => {
                log::debug!("No older history to load");
                return;
            }
        };
        let offset = self.state.page_cursor();
        if let Some(fetch) = self.paginator.fetch_page(
            &mut self.state,
            &self.api,
            self.view.as_ref(),
            &conversation_id,
            offset,
        ) {
            self.pending.push(fetch);
        }
    }

    /// Send a prompt together with the staged attachments
    pub fn send(&mut self, text: &str) -> Result<(), EngineError> {
        let text = text.trim();
        let attachment_count = self.state.pending_attachments().len();
        if text.is_empty() && attachment_count == 0 {
            log::debug!("Ignoring empty send");
            return Ok(());
        }
        if !self.channel.is_open() {
            self.view.show_error(
                Severity::Warning,
                "Not connected to the chat server. Your message was not sent.",
            );
            return Err(ChannelError::NotConnected.into());
        }

        let mut prompt = text.to_string();
        for attachment in self.state.pending_attachments() {
            prompt.push_str(&attachment.prompt_marker());
        }
        let conversation_id = self.state.active_conversation().cloned();
        if let Err(e) = self
            .channel
            .send(ClientPrompt::new(prompt, conversation_id.clone()))
        {
            self.view.show_error(Severity::Fatal, &e.to_string());
            return Err(e.into());
        }

        let display = if text.is_empty() {
            format!("Sent {} file(s)...", attachment_count)
        } else {
            text.to_string()
        };
        self.state.take_attachments();
        self.view.clear_composer();
        self.transcript.hide_welcome();
        self.transcript.append(
            Message::user(display, Some(Utc::now())),
            Delivery::Pending,
        );
        self.state.advance_cursor(1);
        self.view.render_attachment_chips(self.state.pending_attachments());
        if conversation_id.is_none() {
            self.state.mark_awaiting_new_conversation();
        }
        Ok(())
    }

    /// Ask the user to confirm, then delete
    pub fn request_delete(&mut self, conversation_id: ConversationId) {
        let commands = self.commands.clone();
        self.view.show_confirmation(
            DELETE_CONFIRMATION,
            Box::new(move || {
                commands.send(Command::Delete(conversation_id));
            }),
        );
    }

    pub fn delete(&mut self, conversation_id: ConversationId) {
        let removal = self.directory.remove(&self.api, conversation_id);
        self.pending.push(removal);
    }

    pub fn attach(&mut self, upload: UploadRequest) {
        let api = Rc::clone(&self.api);
        log::info!("Uploading {} ({} bytes)", upload.file_name, upload.bytes.len());
        self.pending.push(
            async move {
                let file_name = upload.file_name.clone();
                let result = api.upload_attachment(upload).await;
                EngineEvent::AttachmentUploaded { file_name, result }
            }
            .boxed_local(),
        );
    }

    pub fn detach(&mut self, index: usize) {
        if self.state.unstage_attachment(index).is_some() {
            self.view
                .render_attachment_chips(self.state.pending_attachments());
        }
    }

    // ------------------------------------------------------------------
    // Completions
    // ------------------------------------------------------------------

    fn on_deleted(
        &mut self,
        conversation_id: ConversationId,
        result: Result<(), ApiError>,
    ) {
        if let Err(e) = result {
            log::error!("Failed to delete conversation {}: {}", conversation_id, e);
            let severity = match &e {
                ApiError::Transport(_) => Severity::Transient,
                _ => Severity::Server,
            };
            self.view.show_error(severity, &e.user_message());
            return;
        }

        log::info!("Deleted conversation {}", conversation_id);
        self.directory.forget(&conversation_id);
        if self.state.is_active(&conversation_id) {
            self.start_new();
        } else {
            self.directory
                .render(self.state.active_conversation(), self.view.as_ref());
            self.refresh_conversations();
        }
    }

    fn on_inbound(&mut self, frame: Option<InboundFrame>, rest: InboundStream) {
        match frame {
            Some(Ok(reply)) => {
                self.pending.push(next_frame(rest));
                let outcome = self
                    .channel
                    .on_message(&mut self.state, &mut self.transcript, reply);
                if outcome.refresh_directory {
                    self.refresh_conversations();
                }
            }
            Some(Err(ChannelError::Protocol(e))) => {
                log::warn!("Ignoring malformed frame: {}", e);
                self.pending.push(next_frame(rest));
            }
            Some(Err(e)) => self.on_channel_closed(&e.to_string()),
            None => self.on_channel_closed("the server closed the connection"),
        }
    }

    fn on_channel_closed(&mut self, reason: &str) {
        let was_closed = self.channel.state() == ConnectionState::Closed;
        self.channel.on_closed();
        self.transcript.remove_pending_indicator();
        if !was_closed {
            self.view.show_error(
                Severity::Fatal,
                &format!("Connection lost: {}. Reload to reconnect.", reason),
            );
        }
    }
}

fn next_command(inbox: UnboundedReceiver<Command>) -> PendingEvent {
    inbox
        .into_future()
        .map(|(command, inbox)| EngineEvent::Command(command, inbox))
        .boxed_local()
}
