//! Messenger send client (Graph API).

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::base::{
    config::Config,
    types::{OutboundMessage, Res, SendError},
};

// Traits.

/// Generic outbound messaging trait that clients must implement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenericMessengerClient {
    /// Send a text message to a user.
    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), SendError>;
}

// Structs.

/// Messenger client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct MessengerClient {
    inner: Arc<dyn GenericMessengerClient + Send + Sync + 'static>,
}

impl Deref for MessengerClient {
    type Target = dyn GenericMessengerClient + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl MessengerClient {
    /// Wrap an arbitrary implementation (used for fakes in tests).
    pub fn new(inner: Arc<dyn GenericMessengerClient + Send + Sync + 'static>) -> Self {
        Self { inner }
    }

    /// Creates a Graph API messenger client.
    pub fn graph(config: &Config) -> Res<Self> {
        let client = GraphMessengerClient::new(config)?;
        Ok(Self { inner: Arc::new(client) })
    }

    /// Best-effort send: failures are logged and dropped.
    #[instrument(skip(self, text))]
    pub async fn send(&self, recipient_id: &str, text: &str) {
        match self.send_text(recipient_id, text).await {
            Ok(()) => info!("Reply delivered."),
            Err(err) => warn!(kind = err.kind(), "Reply dropped: {}", err),
        }
    }
}

// Specific implementations.

/// Graph API `me/messages` client.
#[derive(Clone)]
pub struct GraphMessengerClient {
    http: reqwest::Client,
    access_token: String,
    endpoint: String,
}

impl GraphMessengerClient {
    pub fn new(config: &Config) -> Res<Self> {
        let http = reqwest::Client::builder().timeout(config.request_timeout()).build()?;
        let endpoint = format!("{}/{}/me/messages", config.graph_api_base_url.trim_end_matches('/'), config.graph_api_version);

        Ok(Self {
            http,
            access_token: config.page_access_token.clone(),
            endpoint,
        })
    }
}

#[async_trait]
impl GenericMessengerClient for GraphMessengerClient {
    async fn send_text(&self, recipient_id: &str, text: &str) -> Result<(), SendError> {
        if self.access_token.is_empty() {
            return Err(SendError::MissingAccessToken);
        }

        debug!("Posting reply to {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("access_token", &self.access_token)])
            .json(&OutboundMessage::response(recipient_id, text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Status { status: status.as_u16(), body });
        }

        Ok(())
    }
}
