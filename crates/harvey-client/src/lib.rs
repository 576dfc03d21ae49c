//! # harvey
//!
//! Terminal client for the Harvey HR assistant: reqwest for the REST
//! endpoints, tokio-tungstenite for the chat channel, and a line-oriented
//! transcript driven by `harvey-engine`.

pub mod cli;
pub mod config;
pub mod http_api;
pub mod repl;
pub mod terminal_view;
pub mod ws_transport;

pub use cli::Cli;
pub use config::{ClientConfig, ConfigError};
pub use http_api::HttpChatApi;
pub use repl::run_repl;
pub use terminal_view::TerminalView;
pub use ws_transport::WsTransport;
