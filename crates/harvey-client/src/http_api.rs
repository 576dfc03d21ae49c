use async_trait::async_trait;
use harvey_engine::{ApiError, ChatApi, UploadRequest};
use harvey_types::{
    Attachment, Conversation, ConversationId, ConversationList, ErrorBody, MessagePage,
    UploadResponse,
};
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::{ClientConfig, CONVERSATIONS_PATH, UPLOAD_PATH};

/// Multipart field the upload endpoint reads the file from
const UPLOAD_FIELD: &str = "resume";

/// REST side of the chat server over reqwest
pub struct HttpChatApi {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpChatApi {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.config.csrf_token {
            builder = builder.header("X-CSRFToken", token);
        }
        if let Some(cookie) = &self.config.session_cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder
    }
}

fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}

/// Send a request, turning non-2xx responses into `ApiError::Status`
async fn execute(builder: RequestBuilder) -> Result<Response, ApiError> {
    let response = builder.send().await.map_err(transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message().map(str::to_string))
        .unwrap_or_default();
    log::debug!("Server answered {}: {}", status, body);
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await.map_err(transport)?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait(?Send)]
impl ChatApi for HttpChatApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let url = self.config.api_url(CONVERSATIONS_PATH);
        log::debug!("GET {}", url);
        let response = execute(self.request(Method::GET, url)).await?;
        let list: ConversationList = decode(response).await?;
        Ok(list.conversations)
    }

    async fn fetch_page(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        offset: usize,
    ) -> Result<MessagePage, ApiError> {
        let url = self.config.messages_url(conversation_id.as_str());
        log::debug!("GET {} (limit {}, offset {})", url, limit, offset);
        let builder = self
            .request(Method::GET, url)
            .query(&[("limit", limit), ("offset", offset)]);
        let response = execute(builder).await?;
        decode(response).await
    }

    async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<(), ApiError> {
        let url = self.config.conversation_url(conversation_id.as_str());
        log::debug!("DELETE {}", url);
        execute(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn upload_attachment(&self, upload: UploadRequest) -> Result<Attachment, ApiError> {
        let url = self.config.api_url(UPLOAD_PATH);
        let file_name = upload.file_name.clone();
        log::debug!("POST {} ({}, {} bytes)", url, file_name, upload.bytes.len());

        let part = Part::bytes(upload.bytes).file_name(upload.file_name);
        let form = Form::new().part(UPLOAD_FIELD, part);
        let response = self
            .request(Method::POST, url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        // The endpoint reports rejections as `{"error": ...}`, with or without an error status
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        match serde_json::from_str::<UploadResponse>(&text) {
            Ok(body) => body.into_attachment(&file_name).map_err(ApiError::Server),
            Err(e) if status.is_success() => Err(ApiError::Decode(e.to_string())),
            Err(_) => Err(ApiError::Status {
                status: status.as_u16(),
                message: String::new(),
            }),
        }
    }
}
