use harvey_types::ProtocolError;
use thiserror::Error;

/// Failures of the REST side (conversation list, history pages, deletes, uploads)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned status {status}: {message}")]
    Status { status: u16, message: String },
    /// Application-level error reported by the server, shown verbatim
    #[error("{0}")]
    Server(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server(message) => message.clone(),
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Failures of the persistent chat channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("not connected to the chat server")]
    NotConnected,
    #[error("a chat connection is already open or opening")]
    AlreadyConnected,
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("connection closed: {0}")]
    Closed(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_is_verbatim_for_server_errors() {
        let err = ApiError::Server("Conversation is locked".to_string());
        assert_eq!(err.user_message(), "Conversation is locked");

        let err = ApiError::Status { status: 404, message: "Not found.".to_string() };
        assert_eq!(err.user_message(), "Not found.");

        let err = ApiError::Status { status: 500, message: String::new() };
        assert_eq!(err.user_message(), "server returned status 500: ");
    }
}
