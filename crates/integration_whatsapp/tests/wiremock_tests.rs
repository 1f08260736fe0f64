//! Integration tests for the WhatsApp engine client using WireMock

use std::time::Duration;

use application::ports::WhatsAppEnginePort;
use integration_whatsapp::{WhatsAppClient, WhatsAppClientConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base_url: String) -> WhatsAppClient {
    WhatsAppClient::new(WhatsAppClientConfig { base_url, timeout: Duration::from_secs(5) }).unwrap()
}

#[tokio::test]
async fn send_text_returns_the_engine_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sendText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "sent",
            "message_id": "wa-123",
            "timestamp_ms": 1_700_000_000_000i64,
        })))
        .mount(&server)
        .await;

    let client = client(server.uri());
    let result = client.send_text("personal", "1234567890@c.us", "hi").await.unwrap();
    assert_eq!(result.message_id, "wa-123");
    assert!(result.is_sent());
}

#[tokio::test]
async fn engine_rejection_maps_to_engine_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sendText"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad chat id"))
        .mount(&server)
        .await;

    let client = client(server.uri());
    let result = client.send_text("personal", "not-a-chat-id", "hi").await;
    assert!(matches!(result, Err(application::BridgeError::Engine(_))));
}

#[tokio::test]
async fn server_error_is_classified_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sendText"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(server.uri());
    let result = client.send_text("personal", "1234567890@c.us", "hi").await;
    assert!(matches!(result, Err(application::BridgeError::Retryable(_))));
}

#[tokio::test]
async fn session_status_round_trips() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions/personal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "WORKING" })))
        .mount(&server)
        .await;

    let client = client(server.uri());
    let status = client.get_session_status("personal").await.unwrap();
    assert!(status.is_working());
}
