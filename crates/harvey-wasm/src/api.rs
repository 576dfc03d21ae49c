use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder, Response};
use harvey_engine::{ApiError, ChatApi, UploadRequest};
use harvey_types::{
    Attachment, Conversation, ConversationId, ConversationList, ErrorBody, MessagePage,
    UploadResponse,
};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsValue;
use web_sys::{Blob, FormData};

pub const CONVERSATIONS_PATH: &str = "/api/conversations/";
pub const UPLOAD_PATH: &str = "/upload_resume/";
const UPLOAD_FIELD: &str = "resume";

/// REST side of the chat server through the browser's fetch.
///
/// Requests are same-origin, so the session cookie rides along on its own.
pub struct FetchApi {
    csrf_token: Option<String>,
}

impl FetchApi {
    pub fn new(csrf_token: Option<String>) -> Self {
        Self {
            csrf_token: csrf_token.filter(|t| !t.is_empty()),
        }
    }

    fn with_csrf(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.csrf_token {
            Some(token) => builder.header("X-CSRFToken", token),
            None => builder,
        }
    }
}

fn transport(e: gloo_net::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}

fn js_error(e: JsValue) -> ApiError {
    ApiError::Transport(format!("{:?}", e))
}

async fn check(response: Response) -> Result<Response, ApiError> {
    if response.ok() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message().map(str::to_string))
        .unwrap_or_default();
    Err(ApiError::Status { status, message })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await.map_err(transport)?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

fn form_for(upload: &UploadRequest) -> Result<FormData, JsValue> {
    let bytes = js_sys::Uint8Array::from(upload.bytes.as_slice());
    let blob = Blob::new_with_u8_array_sequence(&js_sys::Array::of1(&bytes))?;
    let form = FormData::new()?;
    form.append_with_blob_and_filename(UPLOAD_FIELD, &blob, &upload.file_name)?;
    Ok(form)
}

#[async_trait(?Send)]
impl ChatApi for FetchApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let response = Request::get(CONVERSATIONS_PATH)
            .send()
            .await
            .map_err(transport)?;
        let list: ConversationList = decode(check(response).await?).await?;
        Ok(list.conversations)
    }

    async fn fetch_page(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        offset: usize,
    ) -> Result<MessagePage, ApiError> {
        let url = format!("{}{}/messages/", CONVERSATIONS_PATH, conversation_id);
        let limit = limit.to_string();
        let offset = offset.to_string();
        let response = Request::get(&url)
            .query([("limit", limit.as_str()), ("offset", offset.as_str())])
            .send()
            .await
            .map_err(transport)?;
        decode(check(response).await?).await
    }

    async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<(), ApiError> {
        let url = format!("{}{}/", CONVERSATIONS_PATH, conversation_id);
        let response = self
            .with_csrf(Request::delete(&url))
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(())
    }

    async fn upload_attachment(&self, upload: UploadRequest) -> Result<Attachment, ApiError> {
        let form = form_for(&upload).map_err(js_error)?;
        let response = self
            .with_csrf(Request::post(UPLOAD_PATH))
            .body(form)
            .map_err(transport)?
            .send()
            .await
            .map_err(transport)?;

        let ok = response.ok();
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        match serde_json::from_str::<UploadResponse>(&text) {
            Ok(body) => body.into_attachment(&upload.file_name).map_err(ApiError::Server),
            Err(e) if ok => Err(ApiError::Decode(e.to_string())),
            Err(_) => Err(ApiError::Status {
                status,
                message: String::new(),
            }),
        }
    }
}
