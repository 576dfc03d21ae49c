//! # harvey-engine
//!
//! Client-side session synchronization for the harvey chat assistant.
//!
//! The engine keeps one conversation on screen consistent with the server:
//! it pages history in from newest to oldest, reconciles replies arriving
//! over the persistent chat channel, and drops responses that arrive after
//! the user has moved on to another conversation.
//!
//! Front-ends supply three things:
//!
//! - a [`ChatApi`] for the request/response endpoints
//! - a [`ChannelTransport`] that opens the chat channel
//! - a [`TranscriptView`] that renders what the engine decides
//!
//! and then post [`Command`]s to a running [`SessionController`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut controller = SessionController::new(api, transport, view, EngineConfig::default());
//! let commands = controller.commands();
//! controller.boot()?;
//! commands.send(Command::Send("Hello".to_string()));
//! controller.run().await;
//! ```

pub mod api;
pub mod channel;
pub mod command;
pub mod controller;
pub mod directory;
pub mod error;
mod event;
pub mod paginator;
pub mod state;
pub mod transcript;
pub mod view;

pub use api::{ChatApi, UploadRequest};
pub use channel::{ChannelTransport, Connection, ConnectionState, InboundFrame, InboundStream};
pub use command::{Command, CommandSender};
pub use controller::{EngineConfig, SessionController};
pub use directory::ConversationDirectory;
pub use error::{ApiError, ChannelError, EngineError};
pub use paginator::HistoryPaginator;
pub use state::{PageRequest, SessionState};
pub use transcript::{Delivery, Transcript, TranscriptEntry};
pub use view::{ScrollAnchor, Severity, TranscriptView};

pub use harvey_types as types;
