use async_trait::async_trait;
use futures::channel::mpsc;
use futures::future;
use futures_util::{SinkExt, StreamExt};
use harvey_engine::{ChannelError, ChannelTransport, Connection, InboundFrame};
use harvey_types::{ClientPrompt, ServerReply};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ClientConfig;

/// Chat channel over tokio-tungstenite
pub struct WsTransport {
    url: String,
    session_cookie: Option<String>,
}

impl WsTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            url: config.ws_url(),
            session_cookie: config.session_cookie.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn connect_error(e: impl std::fmt::Display) -> ChannelError {
    ChannelError::Connect(e.to_string())
}

/// Map one socket frame to what the engine sees; control frames are dropped
pub fn decode_frame(frame: Result<Message, tokio_tungstenite::tungstenite::Error>) -> Option<InboundFrame> {
    match frame {
        Ok(Message::Text(text)) => Some(ServerReply::from_json(&text).map_err(ChannelError::from)),
        Ok(Message::Close(reason)) => {
            let reason = reason
                .map(|r| r.reason.to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "server closed the connection".to_string());
            Some(Err(ChannelError::Closed(reason)))
        }
        Ok(_) => None,
        Err(e) => Some(Err(ChannelError::Closed(e.to_string()))),
    }
}

#[async_trait(?Send)]
impl ChannelTransport for WsTransport {
    async fn open(&self) -> Result<Connection, ChannelError> {
        let mut request = self.url.as_str().into_client_request().map_err(connect_error)?;
        if let Some(cookie) = &self.session_cookie {
            let value = HeaderValue::from_str(cookie).map_err(connect_error)?;
            request.headers_mut().insert(COOKIE, value);
        }

        log::info!("Connecting to {}", self.url);
        let (socket, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(connect_error)?;
        let (mut sink, source) = socket.split();

        let (outbound, mut prompts) = mpsc::unbounded::<ClientPrompt>();
        tokio::spawn(async move {
            while let Some(prompt) = prompts.next().await {
                let text = match prompt.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        log::error!("Dropping prompt: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    log::error!("Chat socket write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            log::debug!("Chat socket writer finished");
        });

        let inbound = source
            .filter_map(|frame| future::ready(decode_frame(frame)))
            .boxed_local();
        Ok(Connection { outbound, inbound })
    }
}
