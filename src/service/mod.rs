//! Service integrations for external APIs and resources.
//!
//! This module contains the pieces the webhook pipeline calls into:
//! - The knowledge document loader
//! - LLM services (OpenAI, Gemini)
//! - The reply generator that ties the two together
//! - The Messenger send client (Graph API)
//!
//! Each external service defines both a generic trait and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod knowledge;
pub mod llm;
pub mod messenger;
pub mod reply;

/// Serve `router` on an ephemeral local port and return its base URL.
#[cfg(test)]
pub(crate) async fn spawn_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}
