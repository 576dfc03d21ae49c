use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{future, SinkExt, StreamExt};
use gloo_net::websocket::{futures::WebSocket, Message as WsMessage, WebSocketError};
use harvey_engine::{ChannelError, ChannelTransport, Connection, InboundFrame};
use harvey_types::{ClientPrompt, ServerReply};

/// Chat channel over the browser WebSocket
pub struct BrowserSocket {
    url: String,
}

impl BrowserSocket {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

fn decode_frame(frame: Result<WsMessage, WebSocketError>) -> Option<InboundFrame> {
    match frame {
        Ok(WsMessage::Text(text)) => {
            log::debug!("Received: {}", text);
            Some(ServerReply::from_json(&text).map_err(ChannelError::from))
        }
        Ok(WsMessage::Bytes(_)) => {
            log::warn!("Received unexpected binary message");
            None
        }
        Err(e) => Some(Err(ChannelError::Closed(format!("{:?}", e)))),
    }
}

#[async_trait(?Send)]
impl ChannelTransport for BrowserSocket {
    async fn open(&self) -> Result<Connection, ChannelError> {
        log::info!("Connecting to WebSocket: {}", self.url);
        let ws = WebSocket::open(&self.url)
            .map_err(|e| ChannelError::Connect(format!("{:?}", e)))?;
        let (mut sink, stream) = ws.split();

        let (outbound, mut prompts) = mpsc::unbounded::<ClientPrompt>();
        wasm_bindgen_futures::spawn_local(async move {
            while let Some(prompt) = prompts.next().await {
                let json = match prompt.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        log::error!("Dropping prompt: {}", e);
                        continue;
                    }
                };
                log::debug!("Sending: {}", json);
                if let Err(e) = sink.send(WsMessage::Text(json)).await {
                    log::error!("Failed to send: {:?}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let inbound = stream
            .filter_map(|frame| future::ready(decode_frame(frame)))
            .boxed_local();
        Ok(Connection { outbound, inbound })
    }
}
