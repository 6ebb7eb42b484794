//! Liveness check (`GET /`).

use axum::Json;
use serde_json::{Value, json};

pub async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "alive", "message": "Bot is running!" }))
}
