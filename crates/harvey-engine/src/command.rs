use futures::channel::mpsc::UnboundedSender;
use harvey_types::ConversationId;

use crate::api::UploadRequest;

/// User intents fed into the engine's inbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    StartNew,
    SwitchTo(ConversationId),
    /// The transcript was scrolled to its top edge
    LoadOlder,
    Send(String),
    /// Ask for confirmation, then delete
    RequestDelete(ConversationId),
    /// Delete without asking again
    Delete(ConversationId),
    Attach(UploadRequest),
    Detach(usize),
    RefreshConversations,
    Shutdown,
}

/// Cloneable handle UI code uses to post commands
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: UnboundedSender<Command>,
}

impl CommandSender {
    pub(crate) fn new(tx: UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Queue a command; returns false once the engine has stopped
    pub fn send(&self, command: Command) -> bool {
        match self.tx.unbounded_send(command) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Engine stopped, dropping command: {:?}", e.into_inner());
                false
            }
        }
    }
}
