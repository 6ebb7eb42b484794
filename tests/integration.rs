#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use messenger_relay::{
    base::{
        config::{Config, ConfigInner},
        prompts::FALLBACK_MESSAGE,
        types::{GenerationError, SendError},
    },
    runtime::Runtime,
    service::{
        llm::{GenericLlmClient, LlmClient},
        messenger::{GenericMessengerClient, MessengerClient},
        reply::ReplyGenerator,
    },
};
use mockall::mock;
use serde_json::{Value, json};
use tower::ServiceExt;

// Mocks.

mock! {
    pub Llm {}

    #[async_trait]
    impl GenericLlmClient for Llm {
        async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, GenerationError>;
    }
}

mock! {
    pub Messenger {}

    #[async_trait]
    impl GenericMessengerClient for Messenger {
        async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), SendError>;
    }
}

/// An LLM that must never be called.
fn silent_llm() -> MockLlm {
    let mut mock = MockLlm::new();
    mock.expect_complete().never();
    mock
}

/// A messenger that must never be called.
fn silent_messenger() -> MockMessenger {
    let mut mock = MockMessenger::new();
    mock.expect_send_text().never();
    mock
}

/// Helper function to build a runtime around the given fakes.
fn runtime(llm: MockLlm, messenger: MockMessenger) -> Runtime {
    let config = Config::from(ConfigInner {
        verify_token: "SECRET".to_string(),
        page_access_token: "page-token".to_string(),
        knowledge_path: "tests/does-not-exist.txt".into(),
        ..Default::default()
    });

    let replies = ReplyGenerator::new(&config, LlmClient::new(Arc::new(llm)));
    let messenger = MessengerClient::new(Arc::new(messenger));

    Runtime { config, replies, messenger }
}

async fn get(runtime: &Runtime, uri: &str) -> (StatusCode, String) {
    let response = runtime.router().oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn post(runtime: &Runtime, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::post("/webhook").header("content-type", "application/json").body(body.into()).unwrap();
    let response = runtime.router().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, serde_json::from_slice(&body).unwrap())
}

// Verification.

#[tokio::test]
async fn verification_echoes_challenge() {
    let runtime = runtime(silent_llm(), silent_messenger());

    let (status, body) = get(&runtime, "/webhook?hub.mode=subscribe&hub.verify_token=SECRET&hub.challenge=1234").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1234");
}

#[tokio::test]
async fn verification_rejects_mismatches() {
    let runtime = runtime(silent_llm(), silent_messenger());

    for uri in [
        "/webhook?hub.mode=subscribe&hub.verify_token=WRONG&hub.challenge=1234",
        "/webhook?hub.mode=unsubscribe&hub.verify_token=SECRET&hub.challenge=1234",
        "/webhook?hub.verify_token=SECRET&hub.challenge=1234",
        "/webhook?hub.mode=subscribe&hub.challenge=1234",
        "/webhook",
    ] {
        let (status, body) = get(&runtime, uri).await;

        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert!(!body.contains("1234"), "{uri}");
    }
}

// Event reception.

#[tokio::test]
async fn text_message_is_answered_once() {
    let mut llm = MockLlm::new();
    llm.expect_complete().withf(|_, user| user == "hello").times(1).returning(|_, _| Ok("hi there".to_string()));

    let mut messenger = MockMessenger::new();
    messenger.expect_send_text().withf(|recipient, text| recipient == "U1" && text == "hi there").times(1).returning(|_, _| Ok(()));

    let runtime = runtime(llm, messenger);

    let (status, body) = post(&runtime, r#"{"object":"page","entry":[{"messaging":[{"sender":{"id":"U1"},"message":{"text":"hello"}}]}]}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn opt_in_element_does_not_block_text_message() {
    let mut llm = MockLlm::new();
    llm.expect_complete().times(1).returning(|_, _| Ok("welcome".to_string()));

    let mut messenger = MockMessenger::new();
    messenger.expect_send_text().withf(|recipient, text| recipient == "U1" && text == "welcome").times(1).returning(|_, _| Ok(()));

    let runtime = runtime(llm, messenger);

    let (status, _) = post(
        &runtime,
        r#"{"object":"page","entry":[{"messaging":[{"sender":{"user_ref":"abc"},"optin":{"ref":"checkbox"}},{"sender":{"id":"U1"},"message":{"mid":"m1","text":"hello"}}]}]}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn delivery_receipt_is_acknowledged_without_reply() {
    let runtime = runtime(silent_llm(), silent_messenger());

    let (status, _) = post(&runtime, r#"{"object":"page","entry":[{"messaging":[{"sender":{"id":"U1"},"delivery":{"mids":["m1"],"watermark":1}}]}]}"#).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn non_page_object_is_acknowledged_without_reply() {
    let runtime = runtime(silent_llm(), silent_messenger());

    let (status, body) = post(&runtime, r#"{"object":"instagram","entry":[{"messaging":[{"sender":{"id":"U1"},"message":{"text":"hello"}}]}]}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn malformed_body_is_acknowledged() {
    let runtime = runtime(silent_llm(), silent_messenger());

    let (status, _) = post(&runtime, "not json").await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn generation_failure_sends_fallback() {
    let mut llm = MockLlm::new();
    llm.expect_complete().times(1).returning(|_, _| Err(GenerationError::Request("timed out".to_string())));

    let mut messenger = MockMessenger::new();
    messenger.expect_send_text().withf(|recipient, text| recipient == "U1" && text == FALLBACK_MESSAGE).times(1).returning(|_, _| Ok(()));

    let runtime = runtime(llm, messenger);

    let (status, _) = post(&runtime, r#"{"object":"page","entry":[{"messaging":[{"sender":{"id":"U1"},"message":{"text":"hello"}}]}]}"#).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn send_failure_is_still_acknowledged() {
    let mut llm = MockLlm::new();
    llm.expect_complete().returning(|_, _| Ok("hi".to_string()));

    let mut messenger = MockMessenger::new();
    messenger.expect_send_text().times(2).returning(|_, _| Err(SendError::Status { status: 500, body: "oops".to_string() }));

    let runtime = runtime(llm, messenger);

    let (status, _) = post(
        &runtime,
        r#"{"object":"page","entry":[{"messaging":[{"sender":{"id":"U1"},"message":{"text":"a"}}]},{"messaging":[{"sender":{"id":"U2"},"message":{"text":"b"}}]}]}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

// Liveness.

#[tokio::test]
async fn liveness_reports_alive() {
    let runtime = runtime(silent_llm(), silent_messenger());

    let (status, body) = get(&runtime, "/").await;
    let body: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}
