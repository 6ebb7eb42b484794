//! Webhook verification handshake (`GET /webhook`).

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::runtime::Runtime;

/// Query parameters the platform sends when subscribing the endpoint.
///
/// All fields are optional so that a missing parameter is rejected by us
/// with a 403 instead of by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Returns the challenge to echo back if the request proves ownership.
///
/// Numeric challenges are echoed as integers (so `01234` comes back as
/// `1234`); anything else is echoed verbatim.
pub fn verify_subscription(query: &VerifyQuery, verify_token: &str) -> Option<String> {
    if verify_token.is_empty() {
        return None;
    }

    match (query.mode.as_deref(), query.verify_token.as_deref(), query.challenge.as_ref()) {
        (Some("subscribe"), Some(token), Some(challenge)) if token == verify_token => Some(echo_challenge(challenge)),
        _ => None,
    }
}

fn echo_challenge(challenge: &str) -> String {
    match challenge.parse::<u64>() {
        Ok(number) => number.to_string(),
        Err(_) => challenge.to_string(),
    }
}

#[instrument(skip_all)]
pub async fn handle_verification(State(runtime): State<Runtime>, Query(query): Query<VerifyQuery>) -> Response {
    match verify_subscription(&query, &runtime.config.verify_token) {
        Some(challenge) => {
            info!("Webhook verified.");
            ([(header::CONTENT_TYPE, "text/plain")], challenge).into_response()
        }
        None => {
            warn!(mode = ?query.mode, "Webhook verification rejected.");
            (StatusCode::FORBIDDEN, "Verification failed").into_response()
        }
    }
}
