use harvey_engine::EngineConfig;
use harvey_types::DEFAULT_PAGE_SIZE;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_WS_PATH: &str = "/ws/chat/";

// REST endpoints, relative to the base URL
pub const CONVERSATIONS_PATH: &str = "/api/conversations/";
pub const UPLOAD_PATH: &str = "/upload_resume/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base URL must start with http:// or https://, got '{0}'")]
    InvalidBaseUrl(String),
    #[error("websocket path must start with '/', got '{0}'")]
    InvalidWsPath(String),
    #[error("page size must be at least 1")]
    InvalidPageSize,
}

/// Where the chat server lives and how to authenticate against it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server root without a trailing slash
    pub base_url: String,
    pub ws_path: String,
    pub page_size: usize,
    /// Sent as `X-CSRFToken` on every REST request
    pub csrf_token: Option<String>,
    /// Raw `Cookie` header value, e.g. `sessionid=...; csrftoken=...`
    pub session_cookie: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_path: DEFAULT_WS_PATH.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            csrf_token: None,
            session_cookie: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str, ws_path: &str, page_size: usize) -> Result<Self, ConfigError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
        }
        if !ws_path.starts_with('/') {
            return Err(ConfigError::InvalidWsPath(ws_path.to_string()));
        }
        if page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }

        Ok(Self {
            base_url: base_url.to_string(),
            ws_path: ws_path.to_string(),
            page_size,
            csrf_token: None,
            session_cookie: None,
        })
    }

    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_session_cookie(mut self, cookie: Option<String>) -> Self {
        self.session_cookie = cookie.filter(|c| !c.is_empty());
        self
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn conversation_url(&self, conversation_id: &str) -> String {
        self.api_url(&format!("{}{}/", CONVERSATIONS_PATH, conversation_id))
    }

    pub fn messages_url(&self, conversation_id: &str) -> String {
        self.api_url(&format!("{}{}/messages/", CONVERSATIONS_PATH, conversation_id))
    }

    /// Chat channel URL: same host, `ws` for `http` and `wss` for `https`
    pub fn ws_url(&self) -> String {
        let host = self
            .base_url
            .strip_prefix("https://")
            .map(|rest| format!("wss://{}", rest))
            .or_else(|| {
                self.base_url
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{}", rest))
            })
            .unwrap_or_else(|| self.base_url.clone());
        format!("{}{}", host, self.ws_path)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            page_size: self.page_size,
        }
    }
}
