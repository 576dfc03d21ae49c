use harvey::{ClientConfig, HttpChatApi};
use harvey_engine::{ApiError, ChatApi, UploadRequest};
use harvey_types::{Attachment, ConversationId, Sender};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::*;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn api_for(server: &MockServer) -> HttpChatApi {
    let config = ClientConfig::new(&server.uri(), "/ws/chat/", 20)
        .unwrap()
        .with_csrf_token(Some("csrf-test".to_string()))
        .with_session_cookie(Some("sessionid=abc".to_string()));
    HttpChatApi::new(config)
}

#[tokio::test]
async fn test_list_conversations_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/"))
        .and(header("X-CSRFToken", "csrf-test"))
        .and(header("cookie", "sessionid=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [
                {"id": 12, "title": "Leave balance"},
                {"id": "c-7", "title": ""}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let conversations = api_for(&server).await.list_conversations().await.unwrap();

    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0].id, ConversationId::new("12"));
    assert_eq!(conversations[0].title, "Leave balance");
    assert_eq!(conversations[1].initials(), "NC");
}

#[tokio::test]
async fn test_fetch_page_passes_limit_and_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/12/messages/"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"sender": "user", "text": "How many days?", "timestamp": "2024-01-01T09:00:00Z"},
                {"sender": "ai", "text": "You have 12 days left.", "timestamp": "2024-01-01T09:00:05Z"}
            ],
            "has_more": true
        })))
        .mount(&server)
        .await;

    let page = api_for(&server)
        .await
        .fetch_page(&ConversationId::new("12"), 20, 40)
        .await
        .unwrap();

    assert!(page.has_more);
    assert_eq!(page.messages.len(), 2);
    assert_eq!(page.messages[0].sender, Sender::User);
    assert_eq!(page.messages[1].sender, Sender::Assistant);
    assert_eq!(page.messages[1].text, "You have 12 days left.");
}

#[tokio::test]
async fn test_fetch_page_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/12/messages/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = api_for(&server)
        .await
        .fetch_page(&ConversationId::new("12"), 20, 0)
        .await;

    assert!(matches!(result, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn test_delete_conversation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/conversations/12/"))
        .and(header("X-CSRFToken", "csrf-test"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    api_for(&server)
        .await
        .delete_conversation(&ConversationId::new("12"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_error_keeps_server_text() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/conversations/99/"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "Conversation not found"})),
        )
        .mount(&server)
        .await;

    let err = api_for(&server)
        .await
        .delete_conversation(&ConversationId::new("99"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::Status {
            status: 404,
            message: "Conversation not found".to_string()
        }
    );
    assert_eq!(err.user_message(), "Conversation not found");
}

#[tokio::test]
async fn test_upload_stages_attachment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload_resume/"))
        .and(header("X-CSRFToken", "csrf-test"))
        .and(body_string_contains("name=\"resume\""))
        .and(body_string_contains("filename=\"cv.pdf\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_path": "/media/resumes/cv_1a2b.pdf",
            "filename": "cv.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let attachment = api_for(&server)
        .await
        .upload_attachment(UploadRequest::new("cv.pdf", b"%PDF-1.4".to_vec()))
        .await
        .unwrap();

    assert_eq!(attachment, Attachment::new("cv.pdf", "/media/resumes/cv_1a2b.pdf"));
}

#[tokio::test]
async fn test_upload_rejection_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload_resume/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Only PDF files are allowed."})),
        )
        .mount(&server)
        .await;

    let err = api_for(&server)
        .await
        .upload_attachment(UploadRequest::new("notes.txt", b"hi".to_vec()))
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Server("Only PDF files are allowed.".to_string()));
}

#[tokio::test]
async fn test_server_error_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = api_for(&server).await.list_conversations().await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Status {
            status: 500,
            message: String::new()
        }
    );
}
