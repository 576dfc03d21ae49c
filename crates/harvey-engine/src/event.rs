use futures::channel::mpsc::UnboundedReceiver;
use futures::future::LocalBoxFuture;
use harvey_types::{Attachment, Conversation, ConversationId, MessagePage};

use crate::channel::{Connection, InboundFrame, InboundStream};
use crate::command::Command;
use crate::error::{ApiError, ChannelError};
use crate::state::PageRequest;

/// Something that happened while the engine was waiting.
///
/// Each outstanding asynchronous operation resolves to exactly one event.
pub(crate) enum EngineEvent {
    Command(Option<Command>, UnboundedReceiver<Command>),
    PageLoaded {
        request: PageRequest,
        result: Result<MessagePage, ApiError>,
    },
    ConversationsLoaded {
        ticket: u64,
        result: Result<Vec<Conversation>, ApiError>,
    },
    ConversationDeleted {
        conversation_id: ConversationId,
        result: Result<(), ApiError>,
    },
    AttachmentUploaded {
        file_name: String,
        result: Result<Attachment, ApiError>,
    },
    Connected(Result<Connection, ChannelError>),
    Inbound {
        frame: Option<InboundFrame>,
        rest: InboundStream,
    },
}

pub(crate) type PendingEvent = LocalBoxFuture<'static, EngineEvent>;
