use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use futures::stream::LocalBoxStream;
use futures::{FutureExt, StreamExt};
use harvey_types::{ClientPrompt, Message, ServerReply};

use crate::error::ChannelError;
use crate::event::{EngineEvent, PendingEvent};
use crate::state::SessionState;
use crate::transcript::{Delivery, Transcript};

/// One decoded inbound frame
pub type InboundFrame = Result<ServerReply, ChannelError>;

/// Inbound half of a connection; the stream ends when the socket closes
pub type InboundStream = LocalBoxStream<'static, InboundFrame>;

/// An open duplex connection handed out by a [`ChannelTransport`]
pub struct Connection {
    /// Prompts queued here are written to the socket in order
    pub outbound: UnboundedSender<ClientPrompt>,
    pub inbound: InboundStream,
}

/// Opens the persistent chat connection
#[async_trait(?Send)]
pub trait ChannelTransport {
    async fn open(&self) -> Result<Connection, ChannelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// What the controller still has to do after an inbound reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundOutcome {
    pub refresh_directory: bool,
}

/// Owns the chat connection and reconciles what arrives on it
pub struct ChannelClient {
    transport: Rc<dyn ChannelTransport>,
    state: ConnectionState,
    outbound: Option<UnboundedSender<ClientPrompt>>,
}

impl ChannelClient {
    pub fn new(transport: Rc<dyn ChannelTransport>) -> Self {
        Self {
            transport,
            state: ConnectionState::Idle,
            outbound: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub(crate) fn connect(&mut self) -> Result<PendingEvent, ChannelError> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                return Err(ChannelError::AlreadyConnected)
            }
            ConnectionState::Idle | ConnectionState::Closed => {}
        }
        self.state = ConnectionState::Connecting;
        log::info!("Opening chat connection");
        let transport = Rc::clone(&self.transport);
        Ok(async move { EngineEvent::Connected(transport.open().await) }.boxed_local())
    }

    /// Finish connecting; returns the future that yields the first inbound frame
    pub(crate) fn on_connected(
        &mut self,
        result: Result<Connection, ChannelError>,
    ) -> Result<PendingEvent, ChannelError> {
        match result {
            Ok(connection) => {
                log::info!("Chat connection open");
                self.state = ConnectionState::Open;
                self.outbound = Some(connection.outbound);
                Ok(next_frame(connection.inbound))
            }
            Err(e) => {
                log::error!("Chat connection failed: {}", e);
                self.state = ConnectionState::Closed;
                self.outbound = None;
                Err(e)
            }
        }
    }

    /// Queue a prompt for the server. Fails without retrying when not open.
    pub(crate) fn send(&mut self, prompt: ClientPrompt) -> Result<(), ChannelError> {
        let outbound = match (&self.state, &self.outbound) {
            (ConnectionState::Open, Some(outbound)) => outbound,
            _ => return Err(ChannelError::NotConnected),
        };
        log::debug!(
            "Sending prompt ({} chars) for conversation {:?}",
            prompt.prompt.len(),
            prompt.conversation_id
        );
        if outbound.unbounded_send(prompt).is_err() {
            self.on_closed();
            return Err(ChannelError::Closed("writer stopped".to_string()));
        }
        Ok(())
    }

    pub(crate) fn on_closed(&mut self) {
        if self.state != ConnectionState::Closed {
            log::warn!("Chat connection closed");
        }
        self.state = ConnectionState::Closed;
        self.outbound = None;
    }

    /// Drop the writer; the transport closes the socket once it drains
    pub(crate) fn close(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            outbound.close_channel();
        }
        self.state = ConnectionState::Closed;
    }

    /// Reconcile one server reply with the session and the transcript
    pub(crate) fn on_message(
        &mut self,
        state: &mut SessionState,
        transcript: &mut Transcript,
        reply: ServerReply,
    ) -> InboundOutcome {
        let mut outcome = InboundOutcome::default();

        if let Some(conversation_id) = reply.conversation_id.clone() {
            if !state.is_active(&conversation_id) {
                if state.active_conversation().is_none() && state.is_awaiting_new_conversation() {
                    log::info!("Server started conversation {}", conversation_id);
                    state.adopt_conversation(conversation_id);
                    outcome.refresh_directory = true;
                } else {
                    log::warn!(
                        "Discarding reply for inactive conversation {} (active: {:?})",
                        conversation_id,
                        state.active_conversation()
                    );
                    outcome.refresh_directory = true;
                    return outcome;
                }
            }
        }

        transcript.hide_welcome();
        transcript.confirm_pending();

        if reply.is_pending() {
            transcript.show_pending_indicator();
        } else {
            transcript.remove_pending_indicator();
            transcript.append(
                Message::assistant(reply.response, reply.timestamp),
                Delivery::Confirmed,
            );
            state.advance_cursor(1);
        }
        outcome
    }
}

/// Wait for the next inbound frame, handing the rest of the stream back
pub(crate) fn next_frame(inbound: InboundStream) -> PendingEvent {
    inbound
        .into_future()
        .map(|(frame, rest)| EngineEvent::Inbound { frame, rest })
        .boxed_local()
}
