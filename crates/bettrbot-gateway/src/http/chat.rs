//! Coaching chat endpoint: POST /chat/
//!
//! Request:  `{"user_id": "u-1", "text": "hello"}`
//! Response: `{"response": "...", "is_escalated": false}`
//! Error:    `{"detail": "..."}` with status 400
//!
//! Provider failures are not errors here: the coach answers with a fixed
//! fallback reply and the endpoint still returns 200.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use bettrbot_agent::ChatReply;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct IncomingMessage {
    /// Kept untyped so a non-string id is reported as an invalid id.
    #[serde(default)]
    pub user_id: serde_json::Value,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChatError {
    pub detail: String,
}

type Rejection = (StatusCode, Json<ChatError>);

fn bad_request(detail: impl Into<String>) -> Rejection {
    (
        StatusCode::BAD_REQUEST,
        Json(ChatError {
            detail: detail.into(),
        }),
    )
}

/// A message that passed validation.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidMessage {
    pub user_id: String,
    pub text: String,
}

/// Reject a missing, non-string or empty `user_id` and blank `text`.
/// `text` comes back trimmed.
pub fn validate(message: IncomingMessage) -> Result<ValidMessage, Rejection> {
    let user_id = match message.user_id {
        serde_json::Value::String(id) if !id.is_empty() => id,
        _ => return Err(bad_request("Invalid user ID")),
    };
    let text = message.text.trim();
    if text.is_empty() {
        return Err(bad_request("Message cannot be empty"));
    }
    Ok(ValidMessage {
        user_id,
        text: text.to_string(),
    })
}

/// POST /chat/: one coaching turn for one user.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IncomingMessage>, JsonRejection>,
) -> Result<Json<ChatReply>, Rejection> {
    let Json(message) = payload.map_err(|e| {
        debug!(error = %e, "rejected chat body");
        bad_request(e.body_text())
    })?;
    let message = validate(message)?;

    info!(user_id = %message.user_id, "chat message received");
    let reply = state.coach.handle(&message.user_id, &message.text).await;
    Ok(Json(reply))
}
