use clap::Parser;
use harvey_types::DEFAULT_PAGE_SIZE;

use crate::config::{ClientConfig, ConfigError, DEFAULT_BASE_URL, DEFAULT_WS_PATH};

/// CLI arguments for harvey
#[derive(Parser, Debug)]
#[command(name = "harvey")]
#[command(about = "Harvey - terminal client for the Harvey HR assistant")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Chat server root (e.g., https://harvey.example.com)
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL, env = "HARVEY_BASE_URL")]
    pub base_url: String,

    /// Path of the chat WebSocket endpoint
    #[arg(long, value_name = "PATH", default_value = DEFAULT_WS_PATH, env = "HARVEY_WS_PATH")]
    pub ws_path: String,

    /// Messages fetched per history page
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PAGE_SIZE, env = "HARVEY_PAGE_SIZE")]
    pub page_size: usize,

    /// CSRF token sent with REST requests
    #[arg(long, value_name = "TOKEN", env = "HARVEY_CSRF_TOKEN", hide_env_values = true)]
    pub csrf_token: Option<String>,

    /// Cookie header for an authenticated session (e.g., "sessionid=...")
    #[arg(long, value_name = "COOKIE", env = "HARVEY_SESSION_COOKIE", hide_env_values = true)]
    pub session_cookie: Option<String>,

    /// Open this conversation instead of starting a new one
    #[arg(long, value_name = "ID")]
    pub conversation: Option<String>,

    /// Enable verbose debug output (engine decisions, HTTP and socket traffic)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the client configuration; flags win over `HARVEY_*` variables
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        Ok(ClientConfig::new(&self.base_url, &self.ws_path, self.page_size)?
            .with_csrf_token(self.csrf_token.clone())
            .with_session_cookie(self.session_cookie.clone()))
    }
}
