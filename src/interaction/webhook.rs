//! Event reception (`POST /webhook`).
//!
//! The platform retries any delivery that is not acknowledged with a 2xx, so
//! every request is answered with 200 no matter what happens downstream.

use axum::{Json, body::Bytes, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::{
    base::types::IncomingEvent,
    runtime::Runtime,
    service::{messenger::MessengerClient, reply::ReplyGenerator},
};

/*
A typical text message delivery:

{
    "object": "page",
    "entry": [{
        "id": "971281182990192",
        "time": 1491150178150,
        "messaging": [{
            "sender": { "id": "1249910941788598" },
            "recipient": { "id": "971281182990192" },
            "timestamp": 1491150178096,
            "message": { "mid": "mid.$cAANzYAfQpeBhYL9PMFbL3oG935WY", "text": "ho" }
        }]
    }]
}

Delivery and read receipts carry `delivery` / `read` instead of `message`.
*/

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default, deserialize_with = "lenient_messaging")]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagingEvent {
    pub sender: Option<Participant>,
    pub message: Option<MessageBody>,
}

/// Plugin opt-ins identify the user by `user_ref` instead of `id`.
#[derive(Debug, Default, Deserialize)]
pub struct Participant {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    pub mid: Option<String>,
    pub text: Option<String>,
    /// Set on copies of the page's own outbound messages.
    #[serde(default)]
    pub is_echo: bool,
}

/// Parse each messaging element on its own so one odd element does not sink the batch.
fn lenient_messaging<'de, D>(deserializer: D) -> Result<Vec<MessagingEvent>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let elements = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();

    let events = elements
        .into_iter()
        .filter_map(|element| match serde_json::from_value::<MessagingEvent>(element) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!("Skipping unreadable messaging element: {}", err);
                None
            }
        })
        .collect();

    Ok(events)
}

impl WebhookPayload {
    pub fn is_page(&self) -> bool {
        self.object == "page"
    }
}

impl MessagingEvent {
    /// The user's text message, if this element is one we should answer.
    pub fn incoming(&self) -> Option<IncomingEvent> {
        let message = self.message.as_ref()?;

        if message.is_echo {
            return None;
        }

        let text = message.text.as_deref().filter(|t| !t.trim().is_empty())?;
        let sender_id = self.sender.as_ref()?.id.as_ref()?;

        Some(IncomingEvent {
            sender_id: sender_id.clone(),
            message_id: message.mid.clone(),
            text: text.to_string(),
        })
    }
}

/// Collect every answerable message in delivery order.
pub fn extract_events(payload: &WebhookPayload) -> Vec<IncomingEvent> {
    payload.entry.iter().flat_map(|entry| entry.messaging.iter()).filter_map(MessagingEvent::incoming).collect()
}

/// Answer every text message in the payload. Non-page payloads are ignored.
#[instrument(skip_all)]
pub async fn process_payload(payload: &WebhookPayload, replies: &ReplyGenerator, messenger: &MessengerClient) -> usize {
    if !payload.is_page() {
        warn!(object = %payload.object, "Ignoring webhook for non-page object.");
        return 0;
    }

    let events = extract_events(payload);
    let skipped = payload.entry.iter().map(|e| e.messaging.len()).sum::<usize>() - events.len();

    if skipped > 0 {
        debug!("Skipping {} messaging element(s) without user text.", skipped);
    }

    for event in &events {
        info!(sender = %event.sender_id, mid = event.message_id.as_deref().unwrap_or("-"), "Answering message.");

        let reply = replies.generate(&event.text).await;
        messenger.send(&event.sender_id, &reply).await;
    }

    events.len()
}

#[instrument(skip_all)]
pub async fn handle_webhook(State(runtime): State<Runtime>, body: Bytes) -> Json<Value> {
    match serde_json::from_slice::<WebhookPayload>(&body) {
        Ok(payload) => {
            let answered = process_payload(&payload, &runtime.replies, &runtime.messenger).await;
            debug!("Answered {} message(s).", answered);
        }
        Err(err) => warn!("Ignoring unparseable webhook body: {}", err),
    }

    Json(json!({ "status": "ok" }))
}
