//! Library root for `messenger-relay`.
//!
//! Messenger-relay is an LLM-powered assistant for a Facebook page designed to:
//! - Complete the Messenger Platform webhook verification handshake
//! - Receive message events and pick out the users' text messages
//! - Answer each one from a static knowledge document via an LLM
//! - Deliver the answer back through the Graph API send endpoint
//!
//! Every request is handled statelessly. External calls are best-effort: a
//! failed completion becomes a fixed fallback reply and a failed send is
//! logged and dropped, so the platform always gets its acknowledgment.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::{info, warn};

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the messenger-relay runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the reply generator and messenger client
/// - Serves the webhook until shutdown
pub async fn start(config: Config) -> Void {
    info!("Starting messenger-relay ...");

    // Start the crypto provider.
    if crypto::ring::default_provider().install_default().is_err() {
        warn!("A crypto provider was already installed.");
    }

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
