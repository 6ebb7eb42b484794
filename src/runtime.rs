//! Runtime services, shared state, and the HTTP server.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction::{health::handle_health, verification::handle_verification, webhook::handle_webhook},
    service::{llm::LlmClient, messenger::MessengerClient, reply::ReplyGenerator},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the reply generator, and the messenger client.
/// It is designed to be trivially cloneable, allowing it to be used as axum state
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The reply generator instance.
    pub replies: ReplyGenerator,
    /// The messenger client instance.
    pub messenger: MessengerClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Res<Self> {
        // Initialize the LLM client.
        let llm = LlmClient::from_config(&config)?;

        // Initialize the reply generator.
        let replies = ReplyGenerator::new(&config, llm);

        // Initialize the messenger client.
        let messenger = MessengerClient::graph(&config)?;

        Ok(Self { config, replies, messenger })
    }

    /// Routes for the webhook, verification, and liveness endpoints.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handle_health))
            .route("/webhook", get(handle_verification).post(handle_webhook))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Serve until Ctrl-C.
    pub async fn start(&self) -> Void {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("Listening on {} ...", listener.local_addr()?);

        axum::serve(listener, self.router()).with_graceful_shutdown(shutdown_signal()).await?;

        info!("Server stopped.");

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
}
